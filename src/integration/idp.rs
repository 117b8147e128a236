//! Hosted authentication provider (email/password accounts).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use email_address::EmailAddress;
use log::debug;

use crate::auth::model::{AuthUser, ProfileUpdate};
use crate::user;

pub type Provider = Arc<dyn AuthProvider + Send + Sync>;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("email already in use")]
    EmailInUse,
    #[error("invalid email")]
    InvalidEmail,
    #[error("weak password")]
    WeakPassword,
    #[error("user not found")]
    UserNotFound,
    #[error("wrong password")]
    WrongPassword,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("too many requests")]
    TooManyRequests,
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AuthProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, Error>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, Error>;

    async fn sign_out(&self) -> Result<(), Error>;

    async fn update_profile(
        &self,
        uid: &user::Id,
        update: &ProfileUpdate,
    ) -> Result<AuthUser, Error>;
}

struct Account {
    user: AuthUser,
    password: String,
}

/// Local account table with the provider's validation rules.
#[derive(Default)]
pub struct MemoryAuthProvider {
    accounts: Mutex<HashMap<String, Account>>,
}

impl MemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Account>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, Error> {
        if !EmailAddress::is_valid(email) {
            return Err(Error::InvalidEmail);
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(Error::WeakPassword);
        }

        let key = email.to_lowercase();
        let mut accounts = self.lock();
        if accounts.contains_key(&key) {
            return Err(Error::EmailInUse);
        }

        let user = AuthUser::new(
            user::Id::random(),
            Some(email.to_string()),
            None,
            None,
        );
        accounts.insert(
            key,
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        debug!("registered account {}", user.uid);

        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, Error> {
        if !EmailAddress::is_valid(email) {
            return Err(Error::InvalidEmail);
        }

        let accounts = self.lock();
        let account = accounts
            .get(&email.to_lowercase())
            .ok_or(Error::UserNotFound)?;

        if account.password != password {
            return Err(Error::WrongPassword);
        }

        Ok(account.user.clone())
    }

    async fn sign_out(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn update_profile(
        &self,
        uid: &user::Id,
        update: &ProfileUpdate,
    ) -> Result<AuthUser, Error> {
        let mut accounts = self.lock();
        let account = accounts
            .values_mut()
            .find(|a| &a.user.uid == uid)
            .ok_or(Error::UserNotFound)?;

        if let Some(name) = &update.display_name {
            account.user.display_name = Some(name.clone());
        }
        if let Some(photo) = &update.photo_url {
            account.user.photo_url = Some(photo.clone());
        }

        Ok(account.user.clone())
    }
}
