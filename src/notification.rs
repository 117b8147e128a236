use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use log::{debug, info};

pub type Service = Arc<dyn NotificationService + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("notifications are not permitted")]
    NotPermitted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

#[async_trait]
pub trait NotificationService {
    async fn schedule(&self, title: &str, body: &str) -> Result<()>;

    async fn register_push_token(&self, token: &str) -> Result<()>;
}

/// Local notifications only: everything scheduled is logged and kept.
#[derive(Default)]
pub struct LogNotificationService {
    scheduled: Mutex<Vec<Notification>>,
    push_token: Mutex<Option<String>>,
}

impl LogNotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled(&self) -> Vec<Notification> {
        self.scheduled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn push_token(&self) -> Option<String> {
        self.push_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl NotificationService for LogNotificationService {
    async fn schedule(&self, title: &str, body: &str) -> Result<()> {
        info!("notification: {title} | {body}");
        self.scheduled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Notification {
                title: title.into(),
                body: body.into(),
            });
        Ok(())
    }

    async fn register_push_token(&self, token: &str) -> Result<()> {
        debug!("push token registered: {token}");
        *self
            .push_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(token.into());
        Ok(())
    }
}
