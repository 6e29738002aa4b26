//! Documents and result pages.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prefix of every store-managed field (identity, timestamps, permissions,
/// collection and database linkage).
pub const METADATA_PREFIX: char = '$';

/// Store-managed document identifier field.
pub const ID_FIELD: &str = "$id";

/// A document as returned by the store: user fields plus `$`-prefixed
/// metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Wrap a JSON object.
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Document identifier, if present.
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    /// Value of a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Set a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Remove a field.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// User fields only, with every store-managed field stripped so the
    /// document can be created elsewhere under a fresh identity.
    pub fn user_fields(&self) -> Map<String, Value> {
        self.0
            .iter()
            .filter(|(key, _)| !is_metadata_field(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Whether a field is managed by the store.
pub fn is_metadata_field(field: &str) -> bool {
    field.starts_with(METADATA_PREFIX)
}

/// One page of a document listing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentPage {
    /// Total number of documents in the collection at the time of the call.
    pub total: u64,
    /// Documents of this page.
    pub documents: Vec<Document>,
}
