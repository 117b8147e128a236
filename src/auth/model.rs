use crate::user;

/// Account as the authentication provider knows it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: user::Id,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl AuthUser {
    pub fn new(
        uid: user::Id,
        email: Option<String>,
        display_name: Option<String>,
        photo_url: Option<String>,
    ) -> Self {
        Self {
            uid,
            email,
            display_name,
            photo_url,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl ProfileUpdate {
    pub fn display_name(name: impl Into<String>) -> Self {
        Self {
            display_name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn photo_url(url: impl Into<String>) -> Self {
        Self {
            photo_url: Some(url.into()),
            ..Default::default()
        }
    }
}
