use std::fmt::Display;
use std::sync::Arc;

use repository::RoomRepository;
use serde::{Deserialize, Serialize};
use service::RoomService;

use crate::{integration, user};

pub mod model;
pub mod repository;
pub mod service;

type Result<T> = std::result::Result<T, Error>;
pub type Repository = Arc<dyn RoomRepository + Send + Sync>;
pub type Service = Arc<dyn RoomService + Send + Sync>;

#[derive(Clone, Debug, Hash, PartialEq, Eq, Deserialize, Serialize)]
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
    #[error("chat room not found: {0}")]
    NotFound(Id),
    #[error("a chat room needs two different participants, got {0} twice")]
    SameParticipants(user::Id),

    #[error(transparent)]
    _Integration(#[from] integration::Error),
}
