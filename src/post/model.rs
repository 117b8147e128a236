use std::fmt::Display;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

use crate::user;

use super::Id;

const COMMENT_SUFFIX_LEN: usize = 7;
const COMMENT_SUFFIX_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Client generated: creation millis plus a random suffix.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct CommentId(String);

impl CommentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate(at: DateTime<Utc>) -> Self {
        let mut rng = rand::rng();
        let suffix: String = (0..COMMENT_SUFFIX_LEN)
            .map(|_| {
                let i = rng.random_range(0..COMMENT_SUFFIX_CHARS.len());
                char::from(COMMENT_SUFFIX_CHARS[i])
            })
            .collect();
        Self(format!("{}-{}", at.timestamp_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CommentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub user_id: user::Id,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_avatar: Option<String>,
    pub text: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(c: NewComment, at: DateTime<Utc>) -> Self {
        Self {
            id: CommentId::generate(at),
            user_id: c.user_id,
            user_name: c.user_name,
            user_avatar: c.user_avatar,
            text: c.text,
            created_at: at,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewComment {
    pub user_id: user::Id,
    pub user_name: String,
    pub user_avatar: Option<String>,
    pub text: String,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id,
    pub user_id: user::Id,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_avatar: Option<String>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub caption: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes: Vec<user::Id>,
    #[serde(default, deserialize_with = "comments_or_count")]
    pub comments: Vec<Comment>,
}

impl Post {
    pub fn is_liked_by(&self, id: &user::Id) -> bool {
        self.likes.contains(id)
    }
}

/// Early posts were written with a bare comment count instead of a list.
fn comments_or_count<'de, D>(deserializer: D) -> Result<Vec<Comment>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Comments {
        List(Vec<Comment>),
        Count(u64),
    }

    match Comments::deserialize(deserializer)? {
        Comments::List(list) => Ok(list),
        Comments::Count(_) => Ok(vec![]),
    }
}

/// Newest first; equal timestamps fall back to the id.
pub fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub user_id: user::Id,
    pub user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_avatar: Option<String>,
    pub image_url: String,
    pub caption: String,
}

/// Author edits: caption and image only.
#[derive(Clone, Debug, Default)]
pub struct PostUpdate {
    pub caption: Option<String>,
    pub image_url: Option<String>,
}

impl PostUpdate {
    pub fn is_empty(&self) -> bool {
        self.caption.is_none() && self.image_url.is_none()
    }
}
