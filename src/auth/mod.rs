use std::sync::Arc;

use crate::integration::{self, idp};
use crate::{user, validation};

pub mod model;
pub mod service;
pub mod session;

type Result<T> = std::result::Result<T, Error>;
pub type Service = Arc<dyn service::AuthService + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no user is signed in")]
    NotSignedIn,

    #[error(transparent)]
    _Validation(#[from] validation::Error),
    #[error(transparent)]
    _Idp(#[from] idp::Error),
    #[error(transparent)]
    _User(#[from] user::Error),
    #[error(transparent)]
    _Integration(#[from] integration::Error),
}

impl Error {
    /// Text shown to the user on the sign-in and sign-up screens.
    pub fn message(&self) -> String {
        match self {
            Self::_Validation(e) => e.message(),
            Self::_Idp(e) => match e {
                idp::Error::EmailInUse => "This email is already registered",
                idp::Error::InvalidEmail => "Invalid email address",
                idp::Error::WeakPassword => "Password is too weak. Use at least 6 characters",
                idp::Error::UserNotFound => "No account found with this email",
                idp::Error::WrongPassword => "Incorrect password",
                idp::Error::InvalidCredentials => "Invalid email or password",
                idp::Error::TooManyRequests => "Too many attempts. Please try again later",
                idp::Error::Unavailable(_) => "Network error. Please check your connection",
            }
            .into(),
            Self::NotSignedIn => "Please sign in first".into(),
            Self::_User(_) | Self::_Integration(_) => "Something went wrong. Please try again".into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_map_network_failure() {
        let err = Error::from(idp::Error::Unavailable("timeout".into()));

        assert_eq!(err.message(), "Network error. Please check your connection");
    }

    #[test]
    fn should_map_rate_limit_and_bad_credentials() {
        assert_eq!(
            Error::from(idp::Error::TooManyRequests).message(),
            "Too many attempts. Please try again later"
        );
        assert_eq!(
            Error::from(idp::Error::InvalidCredentials).message(),
            "Invalid email or password"
        );
    }
}
