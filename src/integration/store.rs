//! Contract of the hosted document database.
//!
//! Documents are schemaless JSON objects grouped in collections. Every service
//! in this crate goes through [`DocumentStore`], so the hosted SDK and the
//! in-process [`super::memory::MemoryStore`] are interchangeable.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;

use super::Error;

pub type Fields = Map<String, Value>;
pub type Snapshot = Vec<Document>;
pub type Store = Arc<dyn DocumentStore + Send + Sync>;

const SERVER_TIMESTAMP_KEY: &str = "$serverTimestamp";

/// Placeholder resolved to the store clock when the document is written.
pub fn server_timestamp() -> Value {
    json!({ SERVER_TIMESTAMP_KEY: true })
}

pub fn is_server_timestamp(v: &Value) -> bool {
    v.get(SERVER_TIMESTAMP_KEY)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

pub fn to_fields<T: Serialize>(value: &T) -> super::Result<Fields> {
    match serde_json::to_value(value).map_err(Error::Encode)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(Error::FieldType("<root>".into(), "object")),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    collection: String,
    id: String,
    data: Fields,
}

impl Document {
    pub fn new(collection: impl Into<String>, id: impl Into<String>, data: Fields) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            data,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn data(&self) -> &Fields {
        &self.data
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Decodes the document into a typed record. The document id is exposed to
    /// the record under `id` unless the document carries that field itself.
    pub fn decode<T: DeserializeOwned>(&self) -> super::Result<T> {
        let mut data = self.data.clone();
        data.entry("id")
            .or_insert_with(|| Value::String(self.id.clone()));

        serde_json::from_value(Value::Object(data)).map_err(|source| Error::Decode {
            collection: self.collection.clone(),
            id: self.id.clone(),
            source,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    ArrayContains(String, Value),
}

impl Filter {
    pub fn field(&self) -> &str {
        match self {
            Self::Eq(f, _) | Self::ArrayContains(f, _) => f,
        }
    }

    pub fn matches(&self, data: &Fields) -> bool {
        match self {
            Self::Eq(f, v) => data.get(f) == Some(v),
            Self::ArrayContains(f, v) => data
                .get(f)
                .and_then(Value::as_array)
                .is_some_and(|arr| arr.contains(v)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    collection: String,
    filters: Vec<Filter>,
    order_by: Option<(String, Direction)>,
    limit: Option<usize>,
}

impl Query {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: vec![],
            order_by: None,
            limit: None,
        }
    }

    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.into(), value.into()));
        self
    }

    pub fn array_contains(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters
            .push(Filter::ArrayContains(field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn ordering(&self) -> Option<(&str, Direction)> {
        self.order_by.as_ref().map(|(f, d)| (f.as_str(), *d))
    }

    pub fn max_results(&self) -> Option<usize> {
        self.limit
    }

    /// Fields of the composite index this query needs, if any: a filter
    /// combined with an ordering on another field cannot be served by
    /// single-field indexes.
    pub fn composite_index(&self) -> Option<Vec<String>> {
        let (order_field, _) = self.order_by.as_ref()?;
        let mut fields: Vec<String> = self
            .filters
            .iter()
            .map(|f| f.field().to_string())
            .filter(|f| f != order_field)
            .collect();

        if fields.is_empty() {
            return None;
        }

        fields.push(order_field.clone());
        Some(fields)
    }
}

/// Compares two field values the way the store orders them. Values of
/// different kinds compare equal.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetMode {
    Overwrite,
    Merge,
}

/// Single-field atomic mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldUpdate {
    Set(Value),
    ArrayUnion(Vec<Value>),
    ArrayRemove(Vec<Value>),
    Increment(i64),
    ServerTimestamp,
}

impl FieldUpdate {
    /// Applies the update to the current value of a field. A field holding
    /// the wrong type is replaced: unions and removals start from an empty
    /// array, increments from zero.
    pub fn apply(self, current: Option<Value>, now: i64) -> Value {
        match self {
            Self::Set(v) if is_server_timestamp(&v) => Value::from(now),
            Self::Set(v) => v,
            Self::ServerTimestamp => Value::from(now),
            Self::Increment(by) => {
                let base = current.as_ref().and_then(Value::as_i64).unwrap_or_default();
                Value::from(base + by)
            }
            Self::ArrayUnion(values) => {
                let mut arr = as_array(current);
                for v in values {
                    if !arr.contains(&v) {
                        arr.push(v);
                    }
                }
                Value::Array(arr)
            }
            Self::ArrayRemove(values) => {
                let mut arr = as_array(current);
                arr.retain(|v| !values.contains(v));
                Value::Array(arr)
            }
        }
    }
}

fn as_array(current: Option<Value>) -> Vec<Value> {
    match current {
        Some(Value::Array(arr)) => arr,
        _ => vec![],
    }
}

/// Unregisters a listener from the store when run or dropped.
pub struct Detach(Option<Box<dyn FnOnce() + Send + Sync>>);

impl Detach {
    pub fn new(f: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    pub fn run(mut self) {
        if let Some(f) = self.0.take() {
            f()
        }
    }
}

impl Drop for Detach {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f()
        }
    }
}

/// Standing query registered with the store. Receives the full result set
/// every time it changes.
pub struct Listener {
    snapshots: mpsc::UnboundedReceiver<Snapshot>,
    detach: Detach,
}

impl Listener {
    pub fn new(snapshots: mpsc::UnboundedReceiver<Snapshot>, detach: Detach) -> Self {
        Self { snapshots, detach }
    }

    pub fn into_parts(self) -> (mpsc::UnboundedReceiver<Snapshot>, Detach) {
        (self.snapshots, self.detach)
    }
}

#[async_trait]
pub trait DocumentStore {
    async fn get(&self, collection: &str, id: &str) -> super::Result<Option<Document>>;

    async fn query(&self, query: &Query) -> super::Result<Vec<Document>>;

    async fn create(&self, collection: &str, data: Fields) -> super::Result<String>;

    async fn set(&self, collection: &str, id: &str, data: Fields, mode: SetMode)
    -> super::Result<()>;

    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<(String, FieldUpdate)>,
    ) -> super::Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> super::Result<()>;

    fn listen(&self, query: Query) -> super::Result<Listener>;
}

#[cfg(test)]
mod test {
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    struct Named {
        id: String,
        name: String,
        #[serde(default)]
        tags: Vec<String>,
    }

    #[test]
    fn should_decode_with_document_id() {
        let mut data = Fields::new();
        data.insert("name".into(), json!("jora"));
        let doc = Document::new("users", "u1", data);

        let named: Named = doc.decode().unwrap();

        assert_eq!(named.id, "u1");
        assert_eq!(named.name, "jora");
        assert!(named.tags.is_empty());
    }

    #[test]
    fn should_surface_decode_error() {
        let mut data = Fields::new();
        data.insert("name".into(), json!(42));
        let doc = Document::new("users", "u1", data);

        let err = doc.decode::<Named>().err().unwrap();

        assert!(matches!(err, Error::Decode { ref id, .. } if id == "u1"));
    }

    #[test]
    fn should_require_composite_index_for_filter_with_foreign_order() {
        let q = Query::new("posts")
            .filter_eq("userId", "u1")
            .order_by("createdAt", Direction::Desc);

        assert_eq!(
            q.composite_index(),
            Some(vec!["userId".to_string(), "createdAt".to_string()])
        );
    }

    #[test]
    fn should_not_require_composite_index_for_single_field() {
        let ordered = Query::new("posts")
            .order_by("createdAt", Direction::Desc)
            .limit(50);
        let filtered = Query::new("messages").filter_eq("chatRoomId", "r1");

        assert_eq!(ordered.composite_index(), None);
        assert_eq!(filtered.composite_index(), None);
    }

    #[test]
    fn should_union_without_duplicates() {
        let current = Some(json!(["a"]));

        let v = FieldUpdate::ArrayUnion(vec![json!("a"), json!("b")]).apply(current, 0);

        assert_eq!(v, json!(["a", "b"]));
    }

    #[test]
    fn should_replace_non_array_on_union() {
        let v = FieldUpdate::ArrayUnion(vec![json!({"text": "hi"})]).apply(Some(json!(0)), 0);

        assert_eq!(v, json!([{"text": "hi"}]));
    }

    #[test]
    fn should_empty_non_array_on_remove() {
        let v = FieldUpdate::ArrayRemove(vec![json!("a")]).apply(Some(json!("a")), 0);

        assert_eq!(v, json!([]));
    }

    #[test]
    fn should_increment_missing_counter_from_zero() {
        let v = FieldUpdate::Increment(-1).apply(None, 0);

        assert_eq!(v, json!(-1));
    }

    #[test]
    fn should_overwrite_text_on_increment() {
        let v = FieldUpdate::Increment(1).apply(Some(json!("x")), 0);

        assert_eq!(v, json!(1));
    }

    #[test]
    fn should_resolve_server_timestamp() {
        let v = FieldUpdate::Set(server_timestamp()).apply(None, 1234);

        assert_eq!(v, json!(1234));
    }
}
