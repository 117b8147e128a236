use std::fmt::Display;
use std::sync::Arc;

use repository::PostRepository;
use serde::{Deserialize, Serialize};
use service::PostService;

use crate::{integration, user, validation};

pub mod model;
pub mod repository;
pub mod service;

type Result<T> = std::result::Result<T, Error>;
pub type Repository = Arc<dyn PostRepository + Send + Sync>;
pub type Service = Arc<dyn PostService + Send + Sync>;

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("post not found: {0}")]
    NotFound(Id),
    #[error("{0} is not the author of the post")]
    NotAuthor(user::Id),

    #[error(transparent)]
    _Validation(#[from] validation::Error),
    #[error(transparent)]
    _Integration(#[from] integration::Error),
}
