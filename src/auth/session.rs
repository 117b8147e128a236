//! Signed-in identity shared by every screen of the app.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;
use tokio::sync::mpsc;

use crate::event::{Gate, Subscription};

use super::model::AuthUser;

pub type Observer = Box<dyn Fn(Option<AuthUser>) + Send + 'static>;

#[derive(Default)]
struct State {
    current: Option<AuthUser>,
    observers: Vec<mpsc::UnboundedSender<Option<AuthUser>>>,
}

#[derive(Clone, Default)]
pub struct Session {
    state: Arc<Mutex<State>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<AuthUser> {
        self.lock().current.clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.lock().current.is_some()
    }

    pub(crate) fn set(&self, user: Option<AuthUser>) {
        let mut state = self.lock();
        state.current = user.clone();
        state.observers.retain(|tx| tx.send(user.clone()).is_ok());
    }

    /// Fires right away with the current identity, then on every change.
    pub fn subscribe(&self, on_change: Observer) -> Subscription {
        let (tx, mut rx) = mpsc::unbounded_channel();
        {
            let mut state = self.lock();
            let _ = tx.send(state.current.clone());
            state.observers.push(tx);
        }

        let gate = Gate::new();
        let guard = gate.clone();
        let task = tokio::spawn(async move {
            while let Some(user) = rx.recv().await {
                if !guard.pass(|| on_change(user)) {
                    break;
                }
            }
            debug!("session observer stopped");
        });

        Subscription::new(gate, task, None)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::user;

    fn jora() -> AuthUser {
        AuthUser::new(user::Id::from("jora"), Some("jora@x.com".into()), None, None)
    }

    #[tokio::test]
    async fn should_fire_immediately_then_on_change() {
        let session = Session::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = session.subscribe(Box::new(move |u: Option<AuthUser>| {
            let _ = tx.send(u);
        }));

        session.set(Some(jora()));
        session.set(None);

        assert_eq!(rx.recv().await, Some(None));
        assert_eq!(rx.recv().await, Some(Some(jora())));
        assert_eq!(rx.recv().await, Some(None));
    }

    #[tokio::test]
    async fn should_report_current_identity() {
        let session = Session::new();
        assert!(!session.is_signed_in());

        session.set(Some(jora()));

        assert_eq!(session.current(), Some(jora()));
    }

    #[tokio::test]
    async fn should_stop_after_dispose() {
        let session = Session::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = session.subscribe(Box::new(move |u: Option<AuthUser>| {
            let _ = tx.send(u);
        }));
        assert_eq!(rx.recv().await, Some(None));

        sub.dispose();
        session.set(Some(jora()));

        let next = timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(matches!(next, Ok(None)));
    }
}
