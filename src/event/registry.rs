use std::collections::HashMap;

use log::debug;

use super::Subscription;

/// Subscriptions owned by one screen, keyed by what they observe.
///
/// A key holds at most one subscription: registering again disposes the
/// previous one first. Dropping the registry disposes everything it holds.
#[derive(Default)]
pub struct Registry {
    subscriptions: HashMap<String, Subscription>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: impl Into<String>, subscription: Subscription) {
        let key = key.into();
        if let Some(previous) = self.subscriptions.insert(key.clone(), subscription) {
            debug!("replacing subscription '{key}'");
            previous.dispose();
        }
    }

    pub fn dispose(&mut self, key: &str) -> bool {
        match self.subscriptions.remove(key) {
            Some(s) => {
                s.dispose();
                true
            }
            None => false,
        }
    }

    pub fn dispose_all(&mut self) {
        for (_, s) in self.subscriptions.drain() {
            s.dispose();
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.subscriptions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

#[cfg(test)]
mod test {
    use crate::event::deliver;
    use crate::integration::memory::MemoryStore;
    use crate::integration::store::{DocumentStore, Query};

    use super::*;

    fn noop(store: &MemoryStore, collection: &str) -> Subscription {
        let listener = store.listen(Query::new(collection)).unwrap();
        deliver(listener, |s| async move { s }, |_| {})
    }

    #[tokio::test]
    async fn should_replace_subscription_under_same_key() {
        let store = MemoryStore::new();
        let mut registry = Registry::new();

        registry.register("messages", noop(&store, "messages"));
        registry.register("messages", noop(&store, "messages"));

        assert_eq!(registry.len(), 1);
        assert_eq!(store.listener_count(), 1);
    }

    #[tokio::test]
    async fn should_dispose_all_on_teardown() {
        let store = MemoryStore::new();
        let mut registry = Registry::new();
        registry.register("messages", noop(&store, "messages"));
        registry.register("rooms", noop(&store, "chatRooms"));

        assert!(registry.dispose("rooms"));
        assert!(!registry.dispose("rooms"));
        assert_eq!(store.listener_count(), 1);

        registry.dispose_all();
        assert!(registry.is_empty());
        assert_eq!(store.listener_count(), 0);
    }
}
