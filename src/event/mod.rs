//! Live subscriptions.
//!
//! Every `subscribe_*` operation hands back a [`Subscription`]. Disposing it
//! (explicitly or by dropping it) detaches the standing query from the store
//! and stops delivery, including deliveries whose enrichment lookups were
//! still in flight.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;

use crate::integration::store::{Detach, Document, Listener, Snapshot};

mod registry;

pub use registry::Registry;

/// Receives the full, already ordered list on every change.
pub type Callback<T> = Box<dyn Fn(Vec<T>) + Send + 'static>;

/// Open while a subscription may deliver. The check and the callback run
/// under one lock, so closing waits for a callback already running and no
/// callback starts after `close` returns.
#[derive(Clone)]
pub(crate) struct Gate(Arc<Mutex<bool>>);

impl Gate {
    pub(crate) fn new() -> Self {
        Self(Arc::new(Mutex::new(true)))
    }

    pub(crate) fn is_open(&self) -> bool {
        *self.lock()
    }

    /// Runs `f` if the gate is still open. Returns whether it ran.
    pub(crate) fn pass(&self, f: impl FnOnce()) -> bool {
        let open = self.lock();
        if *open {
            f();
        }
        *open
    }

    /// Returns whether the gate was open before.
    fn close(&self) -> bool {
        std::mem::replace(&mut *self.lock(), false)
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a live delivery. Must not be disposed from inside its own
/// callback.
#[must_use = "dropping a subscription disposes it"]
pub struct Subscription {
    gate: Gate,
    task: Option<JoinHandle<()>>,
    detach: Option<Detach>,
}

impl Subscription {
    pub(crate) fn new(gate: Gate, task: JoinHandle<()>, detach: Option<Detach>) -> Self {
        Self {
            gate,
            task: Some(task),
            detach,
        }
    }

    pub fn is_active(&self) -> bool {
        self.gate.is_open()
    }

    pub fn dispose(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if !self.gate.close() {
            return;
        }

        if let Some(detach) = self.detach.take() {
            detach.run();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Runs `transform` on every snapshot the listener receives and hands the
/// result to `on_update`, unless the subscription was disposed meanwhile.
pub(crate) fn deliver<T, F, Fut, C>(listener: Listener, transform: F, on_update: C) -> Subscription
where
    T: Send + 'static,
    F: Fn(Snapshot) -> Fut + Send + 'static,
    Fut: Future<Output = Vec<T>> + Send + 'static,
    C: Fn(Vec<T>) + Send + 'static,
{
    let (mut snapshots, detach) = listener.into_parts();
    let gate = Gate::new();
    let guard = gate.clone();

    let task = tokio::spawn(async move {
        while let Some(snapshot) = snapshots.recv().await {
            let items = transform(snapshot).await;

            if !guard.pass(|| on_update(items)) {
                debug!("subscription disposed, dropping stale delivery");
                break;
            }
        }
    });

    Subscription::new(gate, task, Some(detach))
}

/// Decodes every document of a live snapshot. Documents that do not decode
/// are logged and left out of the delivery.
pub(crate) fn decode_snapshot<T: DeserializeOwned>(snapshot: &[Document]) -> Vec<T> {
    snapshot
        .iter()
        .filter_map(|doc| match doc.decode::<T>() {
            Ok(item) => Some(item),
            Err(e) => {
                error!("skipping undecodable document: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use serde_json::json;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use super::*;
    use crate::integration::memory::MemoryStore;
    use crate::integration::store::{DocumentStore, Query};

    fn counter(store: &MemoryStore) -> (Subscription, mpsc::UnboundedReceiver<usize>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = store.listen(Query::new("posts")).unwrap();
        let sub = deliver(
            listener,
            |snapshot| async move { vec![snapshot.len()] },
            move |counts| {
                let _ = tx.send(counts[0]);
            },
        );
        (sub, rx)
    }

    async fn add_post(store: &MemoryStore) {
        let data = json!({ "caption": "hi" }).as_object().cloned().unwrap();
        store.create("posts", data).await.unwrap();
    }

    #[tokio::test]
    async fn should_deliver_initial_and_changed_snapshots() {
        let store = MemoryStore::new();
        let (_sub, mut rx) = counter(&store);

        assert_eq!(rx.recv().await, Some(0));
        add_post(&store).await;
        assert_eq!(rx.recv().await, Some(1));
    }

    #[tokio::test]
    async fn should_stop_delivery_after_dispose() {
        let store = MemoryStore::new();
        let (sub, mut rx) = counter(&store);
        assert_eq!(rx.recv().await, Some(0));

        sub.dispose();
        add_post(&store).await;

        assert_eq!(store.listener_count(), 0);
        let next = timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(matches!(next, Ok(None)));
    }

    #[test]
    fn should_not_pass_closed_gate() {
        let gate = Gate::new();
        let mut runs = 0;

        assert!(gate.pass(|| runs += 1));
        assert!(gate.close());
        assert!(!gate.pass(|| runs += 1));
        assert!(!gate.close());
        assert_eq!(runs, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn should_wait_for_running_callback_on_dispose() {
        let store = MemoryStore::new();
        let (entered_tx, mut entered_rx) = mpsc::unbounded_channel();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let listener = store.listen(Query::new("posts")).unwrap();
        let sub = deliver(
            listener,
            |snapshot| async move { vec![snapshot.len()] },
            move |_| {
                let _ = entered_tx.send(());
                std::thread::sleep(Duration::from_millis(50));
                flag.store(true, Ordering::SeqCst);
            },
        );
        entered_rx.recv().await.unwrap();

        sub.dispose();

        assert!(finished.load(Ordering::SeqCst));
        add_post(&store).await;
        let next = timeout(Duration::from_millis(100), entered_rx.recv()).await;
        assert!(matches!(next, Ok(None)));
    }

    #[tokio::test]
    async fn should_dispose_on_drop() {
        let store = MemoryStore::new();
        {
            let (_sub, _rx) = counter(&store);
            assert_eq!(store.listener_count(), 1);
        }
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn should_skip_undecodable_documents() {
        #[derive(serde::Deserialize)]
        struct Caption {
            caption: String,
        }

        let good = Document::new("posts", "1", json!({ "caption": "a" }).as_object().cloned().unwrap());
        let bad = Document::new("posts", "2", json!({ "caption": 7 }).as_object().cloned().unwrap());

        let decoded: Vec<Caption> = decode_snapshot(&[good, bad]);

        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].caption, "a");
    }
}
