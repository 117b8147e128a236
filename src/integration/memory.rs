//! In-process document store honouring the hosted database contract.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use log::{debug, trace};
use serde_json::Value;
use tokio::sync::mpsc;

use super::Error;
use super::store::{
    Detach, Direction, Document, DocumentStore, FieldUpdate, Fields, Listener, Query, SetMode,
    Snapshot, compare_values, is_server_timestamp,
};

type Collection = BTreeMap<String, Fields>;

struct Registration {
    query: Query,
    tx: mpsc::UnboundedSender<Snapshot>,
    last: Option<Snapshot>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Collection>,
    listeners: HashMap<u64, Registration>,
    next_listener: u64,
    indexes: HashSet<(String, Vec<String>)>,
    clock: i64,
}

impl Inner {
    /// Strictly increasing epoch millis.
    fn now(&mut self) -> i64 {
        let wall = chrono::Utc::now().timestamp_millis();
        self.clock = wall.max(self.clock + 1);
        self.clock
    }

    fn check_index(&self, q: &Query) -> super::Result<()> {
        match q.composite_index() {
            Some(fields) if !self.indexes.contains(&(q.collection().to_string(), fields.clone())) => {
                Err(Error::IndexRequired(q.collection().to_string(), fields))
            }
            _ => Ok(()),
        }
    }

    fn resolve_timestamps(&mut self, data: &mut Fields) {
        let stamped: Vec<String> = data
            .iter()
            .filter(|(_, v)| is_server_timestamp(v))
            .map(|(k, _)| k.clone())
            .collect();

        if stamped.is_empty() {
            return;
        }

        let now = self.now();
        for k in stamped {
            data.insert(k, Value::from(now));
        }
    }

    fn notify(&mut self, collection: &str) {
        let Inner {
            collections,
            listeners,
            ..
        } = self;

        let mut closed = vec![];
        for (id, reg) in listeners
            .iter_mut()
            .filter(|(_, r)| r.query.collection() == collection)
        {
            let snapshot = evaluate(collections, &reg.query);
            if reg.last.as_ref() == Some(&snapshot) {
                continue;
            }

            if reg.tx.send(snapshot.clone()).is_err() {
                closed.push(*id);
                continue;
            }
            reg.last = Some(snapshot);
        }

        for id in closed {
            debug!("dropping listener {id} with closed receiver");
            listeners.remove(&id);
        }
    }
}

fn evaluate(collections: &HashMap<String, Collection>, q: &Query) -> Snapshot {
    let Some(col) = collections.get(q.collection()) else {
        return vec![];
    };

    let mut docs: Vec<Document> = col
        .iter()
        .filter(|(_, data)| q.filters().iter().all(|f| f.matches(data)))
        .filter(|(_, data)| q.ordering().is_none_or(|(field, _)| data.contains_key(field)))
        .map(|(id, data)| Document::new(q.collection(), id.clone(), data.clone()))
        .collect();

    if let Some((field, direction)) = q.ordering() {
        docs.sort_by(|a, b| {
            let ord = match (a.get(field), b.get(field)) {
                (Some(x), Some(y)) => compare_values(x, y),
                _ => std::cmp::Ordering::Equal,
            };
            match direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        });
    }

    if let Some(limit) = q.max_results() {
        docs.truncate(limit);
    }

    docs
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a composite index so queries combining these fields are served.
    pub fn with_index(self, collection: &str, fields: &[&str]) -> Self {
        self.lock().indexes.insert((
            collection.to_string(),
            fields.iter().map(|f| f.to_string()).collect(),
        ));
        self
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> super::Result<Option<Document>> {
        let inner = self.lock();
        let doc = inner
            .collections
            .get(collection)
            .and_then(|c| c.get(id))
            .map(|data| Document::new(collection, id, data.clone()));
        Ok(doc)
    }

    async fn query(&self, query: &Query) -> super::Result<Vec<Document>> {
        let inner = self.lock();
        inner.check_index(query)?;
        Ok(evaluate(&inner.collections, query))
    }

    async fn create(&self, collection: &str, mut data: Fields) -> super::Result<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();

        let mut inner = self.lock();
        inner.resolve_timestamps(&mut data);
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), data);
        inner.notify(collection);

        trace!("created {collection}/{id}");
        Ok(id)
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        mut data: Fields,
        mode: SetMode,
    ) -> super::Result<()> {
        let mut inner = self.lock();
        inner.resolve_timestamps(&mut data);

        let col = inner.collections.entry(collection.to_string()).or_default();
        match (mode, col.get_mut(id)) {
            (SetMode::Merge, Some(existing)) => existing.extend(data),
            _ => {
                col.insert(id.to_string(), data);
            }
        }
        inner.notify(collection);

        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<(String, FieldUpdate)>,
    ) -> super::Result<()> {
        let mut inner = self.lock();
        let now = inner.now();

        let Some(current) = inner.collections.get(collection).and_then(|c| c.get(id)) else {
            return Err(Error::NotFound(collection.into(), id.into()));
        };

        let mut next = current.clone();
        for (field, update) in updates {
            let value = update.apply(next.remove(&field), now);
            next.insert(field, value);
        }

        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), next);
        inner.notify(collection);

        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> super::Result<()> {
        let mut inner = self.lock();
        let removed = inner
            .collections
            .get_mut(collection)
            .and_then(|c| c.remove(id))
            .is_some();

        if removed {
            inner.notify(collection);
        }

        Ok(())
    }

    fn listen(&self, query: Query) -> super::Result<Listener> {
        let mut inner = self.lock();
        inner.check_index(&query)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let snapshot = evaluate(&inner.collections, &query);
        // the receiver is alive until this function returns
        let _ = tx.send(snapshot.clone());

        let id = inner.next_listener;
        inner.next_listener += 1;
        inner.listeners.insert(
            id,
            Registration {
                query,
                tx,
                last: Some(snapshot),
            },
        );
        debug!("registered listener {id}");

        let registry = Arc::downgrade(&self.inner);
        let detach = Detach::new(move || {
            if let Some(inner) = registry.upgrade() {
                let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
                if inner.listeners.remove(&id).is_some() {
                    debug!("detached listener {id}");
                }
            }
        });

        Ok(Listener::new(rx, detach))
    }
}
