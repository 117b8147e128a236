use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::model::AuthUser;

use super::Id;

pub const UNKNOWN_USER: &str = "Unknown User";

/// Non-blank display name, then non-empty email, then [`UNKNOWN_USER`].
pub fn display_name(display_name: Option<&str>, email: Option<&str>) -> String {
    non_blank(display_name)
        .or_else(|| non_empty(email))
        .unwrap_or(UNKNOWN_USER)
        .to_string()
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub public_profile: bool,
    #[serde(default)]
    pub followers: Vec<Id>,
    #[serde(default)]
    pub following: Vec<Id>,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub following_count: i64,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn display_name(&self) -> String {
        display_name(self.display_name.as_deref(), self.email.as_deref())
    }

    pub fn is_following(&self, other: &Id) -> bool {
        self.following.contains(other)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserStats {
    pub followers: Vec<Id>,
    pub following: Vec<Id>,
    pub followers_count: i64,
    pub following_count: i64,
}

impl From<User> for UserStats {
    fn from(u: User) -> Self {
        Self {
            followers: u.followers,
            following: u.following,
            followers_count: u.followers_count,
            following_count: u.following_count,
        }
    }
}

/// Entry of the "start a new chat" user picker.
#[derive(Clone, Debug, PartialEq)]
pub struct UserSummary {
    pub id: Id,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

impl From<User> for UserSummary {
    fn from(u: User) -> Self {
        Self {
            display_name: non_blank(u.display_name.as_deref()).map(String::from),
            id: u.id,
            email: u.email,
            photo_url: u.photo_url,
        }
    }
}

/// Any name-bearing fields a user document may carry, whatever wrote it.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct NameFields {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl NameFields {
    /// Non-blank display name, then user name, then name, then email.
    pub fn resolve_name(&self) -> Option<String> {
        non_blank(self.display_name.as_deref())
            .or_else(|| non_empty(self.user_name.as_deref()))
            .or_else(|| non_empty(self.name.as_deref()))
            .or_else(|| non_empty(self.email.as_deref()))
            .map(String::from)
    }
}

/// Display identity of a participant, as known by whoever opens the chat.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Profile {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

impl From<&User> for Profile {
    fn from(u: &User) -> Self {
        Self {
            display_name: u.display_name.clone(),
            email: u.email.clone(),
            photo_url: u.photo_url.clone(),
        }
    }
}

impl From<&AuthUser> for Profile {
    fn from(u: &AuthUser) -> Self {
        Self {
            display_name: u.display_name.clone(),
            email: u.email.clone(),
            photo_url: u.photo_url.clone(),
        }
    }
}

/// Fields written when an account first gets its user document.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser<'a> {
    display_name: &'a str,
    email: &'a str,
}

impl<'a> NewUser<'a> {
    pub fn new(display_name: &'a str, email: &'a str) -> Self {
        Self {
            display_name,
            email,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields<'a> {
    bio: &'a str,
    public_profile: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    updated_at: DateTime<Utc>,
}

impl<'a> ProfileFields<'a> {
    pub fn new(bio: &'a str, public_profile: bool) -> Self {
        Self {
            bio,
            public_profile,
            updated_at: Utc::now(),
        }
    }
}
