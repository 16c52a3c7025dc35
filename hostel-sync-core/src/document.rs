//! Untyped documents, paths and write payloads.
//!
//! Everything the store hands out is an untyped map of JSON values. Typed
//! records are produced from these maps at the feed boundary (see
//! [`crate::decode`]) and never travel past it.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Raw document contents.
pub type Fields = serde_json::Map<String, Value>;

/// Errors produced while parsing document or collection paths.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Invalid path segment '{0}'")]
    InvalidSegment(String),

    #[error("Path '{path}' does not name a {expected}")]
    WrongDepth { path: String, expected: &'static str },
}

fn validate_segments(path: &str) -> Result<usize, PathError> {
    let mut count = 0;
    for segment in path.split('/') {
        if segment.is_empty()
            || segment.contains('\\')
            || segment.contains("..")
            || segment.starts_with('.')
        {
            return Err(PathError::InvalidSegment(segment.to_string()));
        }
        count += 1;
    }
    Ok(count)
}

/// Path to a collection: `bus_routes`, `conversations/stu-1/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Result<Self, PathError> {
        let path = path.into();
        let depth = validate_segments(&path)?;
        if depth % 2 == 0 {
            return Err(PathError::WrongDepth {
                path,
                expected: "collection",
            });
        }
        Ok(Self(path))
    }

    /// Path from a constant known to be well formed.
    pub(crate) fn known(path: impl Into<String>) -> Self {
        let path = path.into();
        debug_assert!(Self::new(path.clone()).is_ok(), "bad collection path {}", path);
        Self(path)
    }

    /// Path of a document inside this collection.
    pub fn doc(&self, id: &str) -> Result<DocPath, PathError> {
        DocPath::new(format!("{}/{}", self.0, id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CollectionPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CollectionPath> for String {
    fn from(path: CollectionPath) -> Self {
        path.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path to a single document: `settings/laundry`, `mess_menu/monday`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocPath(String);

impl DocPath {
    pub fn new(path: impl Into<String>) -> Result<Self, PathError> {
        let path = path.into();
        let depth = validate_segments(&path)?;
        if depth % 2 != 0 {
            return Err(PathError::WrongDepth {
                path,
                expected: "document",
            });
        }
        Ok(Self(path))
    }

    pub(crate) fn known(path: impl Into<String>) -> Self {
        let path = path.into();
        debug_assert!(Self::new(path.clone()).is_ok(), "bad document path {}", path);
        Self(path)
    }

    /// Document id (last segment).
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Collection the document belongs to.
    pub fn collection(&self) -> CollectionPath {
        let end = self.0.rfind('/').unwrap_or(0);
        CollectionPath(self.0[..end].to_string())
    }

    /// Nested collection under this document.
    pub fn child(&self, collection: &str) -> Result<CollectionPath, PathError> {
        CollectionPath::new(format!("{}/{}", self.0, collection))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DocPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DocPath> for String {
    fn from(path: DocPath) -> Self {
        path.0
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub path: DocPath,
    pub fields: Fields,
}

impl Document {
    pub fn new(path: DocPath, fields: Fields) -> Self {
        Self { path, fields }
    }

    pub fn id(&self) -> &str {
        self.path.id()
    }
}

/// A single field in a write payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldWrite {
    Value(Value),
    /// Replaced by the store's clock when the write is applied.
    ServerTimestamp,
}

/// Fields to merge into a document.
///
/// Fields that are not present are left untouched by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WritePayload(BTreeMap<String, FieldWrite>);

impl WritePayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), FieldWrite::Value(value.into()));
        self
    }

    pub fn server_timestamp(mut self, field: impl Into<String>) -> Self {
        self.0.insert(field.into(), FieldWrite::ServerTimestamp);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, write: FieldWrite) {
        self.0.insert(field.into(), write);
    }

    pub fn get(&self, field: &str) -> Option<&FieldWrite> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolves server timestamps against `now` (stored as RFC 3339, UTC).
    pub fn resolve(self, now: DateTime<Utc>) -> Fields {
        let stamp = Value::String(now.to_rfc3339());
        self.0
            .into_iter()
            .map(|(field, write)| match write {
                FieldWrite::Value(value) => (field, value),
                FieldWrite::ServerTimestamp => (field, stamp.clone()),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub equals: Value,
}

/// A collection query: equality filters, one ordering, optional limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub collection: CollectionPath,
    #[serde(default)]
    pub filters: Vec<FieldFilter>,
    #[serde(default)]
    pub order_by: Option<OrderBy>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(collection: CollectionPath) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, equals: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            equals: equals.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a document directly inside the queried collection passes the filters.
    pub fn matches(&self, doc: &Document) -> bool {
        doc.path.collection() == self.collection
            && self
                .filters
                .iter()
                .all(|f| doc.fields.get(&f.field).unwrap_or(&Value::Null) == &f.equals)
    }

    /// Filters, sorts and truncates candidate documents.
    ///
    /// Ties in the ordering field fall back to the document id so results are
    /// stable across stores.
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut out: Vec<Document> = docs.into_iter().filter(|d| self.matches(d)).collect();

        match &self.order_by {
            Some(order) => out.sort_by(|a, b| {
                let ordering = compare_values(
                    a.fields.get(&order.field).unwrap_or(&Value::Null),
                    b.fields.get(&order.field).unwrap_or(&Value::Null),
                )
                .then_with(|| a.id().cmp(b.id()));
                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            }),
            None => out.sort_by(|a, b| a.id().cmp(b.id())),
        }

        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        out
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values used for query ordering.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&y.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// What a listener is attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListenTarget {
    Document { path: DocPath },
    Query { query: Query },
}

impl ListenTarget {
    /// Collection whose changes can affect this target.
    pub fn collection(&self) -> CollectionPath {
        match self {
            ListenTarget::Document { path } => path.collection(),
            ListenTarget::Query { query } => query.collection.clone(),
        }
    }

    /// Whether a write to `changed` can alter what this target sees.
    pub fn is_affected_by(&self, changed: &DocPath) -> bool {
        match self {
            ListenTarget::Document { path } => path == changed,
            ListenTarget::Query { query } => changed.collection() == query.collection,
        }
    }
}

impl fmt::Display for ListenTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenTarget::Document { path } => write!(f, "{}", path),
            ListenTarget::Query { query } => write!(f, "{} (query)", query.collection),
        }
    }
}

/// Full current value of a listen target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Snapshot {
    Document { document: Option<Document> },
    Documents { documents: Vec<Document> },
}
