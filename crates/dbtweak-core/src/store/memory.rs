//! In-process [`DocumentStore`].
//!
//! Behaves like the remote store where it matters to the migration engine:
//! attribute and index changes complete only after a configurable number of
//! status polls, deleting an attribute silently drops the indexes covering it,
//! integer bounds outside the exactly-representable range are refused, and
//! string values are checked against the attribute size.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use dbtweak_proto::document::ID_FIELD;
use dbtweak_proto::{
    AttributeDescriptor, AttributeType, CollectionDescriptor, Document, DocumentPage,
    IndexDescriptor, ResourceKind, ResourceStatus,
};

use super::DocumentStore;
use crate::error::{Error, Result};

/// Largest integer bound the store accepts on creation (2^53 - 1).
pub const MAX_INTEGER_BOUND: i64 = 9_007_199_254_740_991;

const DATABASE_ID: &str = "memory";

/// What a pending resource turns into once its polls are used up.
#[derive(Debug, Clone, Copy)]
enum Settle {
    Available,
    Failed,
    Remove,
}

#[derive(Debug, Clone)]
struct Tracked<T> {
    value: T,
    pending_polls: usize,
    settle: Settle,
}

impl<T> Tracked<T> {
    fn settled(value: T) -> Self {
        Self {
            value,
            pending_polls: 0,
            settle: Settle::Available,
        }
    }
}

trait Resource: Clone {
    fn key(&self) -> &str;
    fn set_status(&mut self, status: ResourceStatus);
}

impl Resource for AttributeDescriptor {
    fn key(&self) -> &str {
        &self.key
    }

    fn set_status(&mut self, status: ResourceStatus) {
        self.status = status;
    }
}

impl Resource for IndexDescriptor {
    fn key(&self) -> &str {
        &self.key
    }

    fn set_status(&mut self, status: ResourceStatus) {
        self.status = status;
    }
}

/// Advance a resource by one status poll. `None` once it has been removed.
fn poll<T: Resource>(items: &mut Vec<Tracked<T>>, key: &str) -> Option<T> {
    let pos = items.iter().position(|t| t.value.key() == key)?;

    if items[pos].pending_polls > 0 {
        items[pos].pending_polls -= 1;
        return Some(items[pos].value.clone());
    }

    match items[pos].settle {
        Settle::Remove => {
            items.remove(pos);
            None
        }
        Settle::Available => {
            items[pos].value.set_status(ResourceStatus::Available);
            Some(items[pos].value.clone())
        }
        Settle::Failed => {
            items[pos].value.set_status(ResourceStatus::Failed);
            Some(items[pos].value.clone())
        }
    }
}

#[derive(Debug)]
struct MemoryCollection {
    descriptor: CollectionDescriptor,
    attributes: Vec<Tracked<AttributeDescriptor>>,
    indexes: Vec<Tracked<IndexDescriptor>>,
    documents: Vec<Document>,
}

impl MemoryCollection {
    fn new(descriptor: CollectionDescriptor) -> Self {
        Self {
            descriptor,
            attributes: Vec::new(),
            indexes: Vec::new(),
            documents: Vec::new(),
        }
    }

    fn live_attribute(&self, key: &str) -> Option<&AttributeDescriptor> {
        self.attributes
            .iter()
            .map(|t| &t.value)
            .find(|a| a.key == key && a.status != ResourceStatus::Deleting)
    }

    fn add_attribute(&mut self, attribute: AttributeDescriptor, pending_polls: usize, settle: Settle) {
        let initial = attribute.default.clone().unwrap_or(Value::Null);
        for document in &mut self.documents {
            document.insert(attribute.key.clone(), initial.clone());
        }
        self.attributes.push(Tracked {
            value: attribute,
            pending_polls,
            settle,
        });
    }

    /// Check a set of user fields against the schema.
    fn validate_fields(&self, fields: &Map<String, Value>) -> Result<()> {
        for (key, value) in fields {
            let attribute = self
                .live_attribute(key)
                .filter(|a| a.status.is_available())
                .ok_or_else(|| Error::Store {
                    code: 400,
                    message: format!("Invalid document structure: Unknown attribute: \"{}\"", key),
                })?;

            if let AttributeType::String { size } = attribute.attribute_type {
                let too_long = |v: &Value| {
                    v.as_str()
                        .map(|s| s.chars().count() as u64 > size)
                        .unwrap_or(false)
                };
                let violates = match value {
                    Value::Array(items) => items.iter().any(too_long),
                    other => too_long(other),
                };
                if violates {
                    return Err(Error::Store {
                        code: 400,
                        message: format!(
                            "Invalid document structure: Attribute \"{}\" has invalid format. \
                             Value must be a valid string and no longer than {} chars",
                            key, size
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    collections: BTreeMap<String, MemoryCollection>,
    creation_polls: usize,
    deletion_polls: usize,
    failing: HashSet<String>,
    next_document: u64,
    clock: u64,
    document_writes: u64,
}

impl MemoryState {
    fn collection(&self, id: &str) -> Result<&MemoryCollection> {
        self.collections
            .get(id)
            .ok_or_else(|| Error::not_found(ResourceKind::Collection, id))
    }

    fn collection_mut(&mut self, id: &str) -> Result<&mut MemoryCollection> {
        self.collections
            .get_mut(id)
            .ok_or_else(|| Error::not_found(ResourceKind::Collection, id))
    }

    fn settle_for(&self, key: &str) -> Settle {
        if self.failing.contains(key) {
            Settle::Failed
        } else {
            Settle::Available
        }
    }

    fn tick(&mut self) -> String {
        self.clock += 1;
        format!("{:020}", self.clock)
    }
}

/// A [`DocumentStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store where every change completes on its first poll.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of polls answering `processing` before a created attribute or
    /// index settles.
    pub fn with_creation_polls(self, polls: usize) -> Self {
        self.state.lock().creation_polls = polls;
        self
    }

    /// Number of polls answering `deleting` before a deleted attribute or
    /// index disappears.
    pub fn with_deletion_polls(self, polls: usize) -> Self {
        self.state.lock().deletion_polls = polls;
        self
    }

    /// Make every future creation of an attribute or index with this key end
    /// in the `failed` state.
    pub fn fail_creation_of(&self, key: impl Into<String>) {
        self.state.lock().failing.insert(key.into());
    }

    /// Add a collection.
    pub fn add_collection(&self, descriptor: CollectionDescriptor) {
        let mut state = self.state.lock();
        state
            .collections
            .insert(descriptor.id.clone(), MemoryCollection::new(descriptor));
    }

    /// Add an attribute that is immediately available, bypassing creation
    /// checks.
    pub fn add_attribute(&self, collection: &str, attribute: AttributeDescriptor) -> Result<()> {
        let mut state = self.state.lock();
        let coll = state.collection_mut(collection)?;
        let attribute = attribute.with_status(ResourceStatus::Available);
        coll.add_attribute(attribute, 0, Settle::Available);
        Ok(())
    }

    /// Add an index that is immediately available.
    pub fn add_index(&self, collection: &str, index: IndexDescriptor) -> Result<()> {
        let mut state = self.state.lock();
        let coll = state.collection_mut(collection)?;
        coll.indexes
            .push(Tracked::settled(index.with_status(ResourceStatus::Available)));
        Ok(())
    }

    /// Insert a document given as a JSON object; returns its identifier.
    pub fn insert_document(&self, collection: &str, fields: Value) -> Result<String> {
        let Value::Object(fields) = fields else {
            return Err(Error::InvalidArgument(
                "document must be a JSON object".to_string(),
            ));
        };
        self.state.lock().create_document(collection, None, fields)
    }

    /// Drop a field from a stored document, leaving it sparse.
    pub fn remove_field(&self, collection: &str, document_id: &str, field: &str) -> Result<()> {
        let mut state = self.state.lock();
        let document = state
            .collection_mut(collection)?
            .documents
            .iter_mut()
            .find(|d| d.id() == Some(document_id))
            .ok_or_else(|| Error::not_found(ResourceKind::Document, document_id))?;
        document.remove(field);
        Ok(())
    }

    /// Snapshot of a collection's settings.
    pub fn collection(&self, id: &str) -> Option<CollectionDescriptor> {
        let state = self.state.lock();
        state.collections.get(id).map(|c| c.descriptor.clone())
    }

    /// Snapshot of one attribute, without advancing its status.
    pub fn attribute(&self, collection: &str, key: &str) -> Option<AttributeDescriptor> {
        let state = self.state.lock();
        state
            .collections
            .get(collection)?
            .attributes
            .iter()
            .find(|t| t.value.key == key)
            .map(|t| t.value.clone())
    }

    /// Attribute keys in schema order.
    pub fn attribute_keys(&self, collection: &str) -> Vec<String> {
        let state = self.state.lock();
        state
            .collections
            .get(collection)
            .map(|c| c.attributes.iter().map(|t| t.value.key.clone()).collect())
            .unwrap_or_default()
    }

    /// Snapshot of one index, without advancing its status.
    pub fn index(&self, collection: &str, key: &str) -> Option<IndexDescriptor> {
        let state = self.state.lock();
        state
            .collections
            .get(collection)?
            .indexes
            .iter()
            .find(|t| t.value.key == key)
            .map(|t| t.value.clone())
    }

    /// Index keys in store order.
    pub fn index_keys(&self, collection: &str) -> Vec<String> {
        let state = self.state.lock();
        state
            .collections
            .get(collection)
            .map(|c| c.indexes.iter().map(|t| t.value.key.clone()).collect())
            .unwrap_or_default()
    }

    /// All documents of a collection.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        let state = self.state.lock();
        state
            .collections
            .get(collection)
            .map(|c| c.documents.clone())
            .unwrap_or_default()
    }

    /// Number of document writes (creates and updates) served so far.
    pub fn document_writes(&self) -> u64 {
        self.state.lock().document_writes
    }
}

impl MemoryState {
    fn create_document(
        &mut self,
        collection: &str,
        document_id: Option<&str>,
        data: Map<String, Value>,
    ) -> Result<String> {
        self.next_document += 1;
        let id = match document_id {
            Some(id) => id.to_string(),
            None => format!("{:020x}", self.next_document),
        };
        let now = self.tick();

        let coll = self.collection_mut(collection)?;
        if coll.documents.iter().any(|d| d.id() == Some(id.as_str())) {
            return Err(Error::Store {
                code: 409,
                message: format!("Document with the requested ID \"{}\" already exists", id),
            });
        }
        coll.validate_fields(&data)?;

        let mut document = Document::default();
        for tracked in &coll.attributes {
            let attribute = &tracked.value;
            if attribute.status == ResourceStatus::Deleting {
                continue;
            }
            let value = data
                .get(&attribute.key)
                .cloned()
                .or_else(|| attribute.default.clone())
                .unwrap_or(Value::Null);
            if attribute.required && value.is_null() {
                return Err(Error::Store {
                    code: 400,
                    message: format!(
                        "Invalid document structure: Missing required attribute \"{}\"",
                        attribute.key
                    ),
                });
            }
            document.insert(attribute.key.clone(), value);
        }
        document.insert(ID_FIELD, Value::String(id.clone()));
        document.insert("$createdAt", Value::String(now.clone()));
        document.insert("$updatedAt", Value::String(now));
        document.insert("$permissions", Value::Array(Vec::new()));
        document.insert("$collectionId", Value::String(collection.to_string()));
        document.insert("$databaseId", Value::String(DATABASE_ID.to_string()));
        coll.documents.push(document);

        self.document_writes += 1;
        Ok(id)
    }
}

fn check_integer_bound(key: &str, bound: Option<i64>) -> Result<()> {
    match bound {
        Some(value) if value.unsigned_abs() > MAX_INTEGER_BOUND as u64 => Err(Error::Store {
            code: 400,
            message: format!(
                "Invalid bound for attribute \"{}\": Value must be a valid range between \
                 -{} and {}",
                key, MAX_INTEGER_BOUND, MAX_INTEGER_BOUND
            ),
        }),
        _ => Ok(()),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_attributes(&self, collection: &str) -> Result<Vec<AttributeDescriptor>> {
        let state = self.state.lock();
        let coll = state.collection(collection)?;
        Ok(coll.attributes.iter().map(|t| t.value.clone()).collect())
    }

    async fn get_attribute(&self, collection: &str, key: &str) -> Result<AttributeDescriptor> {
        let mut state = self.state.lock();
        let coll = state.collection_mut(collection)?;
        poll(&mut coll.attributes, key).ok_or_else(|| Error::not_found(ResourceKind::Attribute, key))
    }

    async fn create_attribute(
        &self,
        collection: &str,
        attribute: &AttributeDescriptor,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let pending = state.creation_polls;
        let settle = state.settle_for(&attribute.key);
        let coll = state.collection_mut(collection)?;

        if coll.attributes.iter().any(|t| t.value.key == attribute.key) {
            return Err(Error::Store {
                code: 409,
                message: format!(
                    "Attribute with the requested key \"{}\" already exists",
                    attribute.key
                ),
            });
        }
        if attribute.required && attribute.default.is_some() {
            return Err(Error::Store {
                code: 400,
                message: "Cannot set default value for required attribute".to_string(),
            });
        }

        let attribute_type = match &attribute.attribute_type {
            AttributeType::Unsupported { type_name } => {
                return Err(Error::Store {
                    code: 400,
                    message: format!("Unsupported attribute type \"{}\"", type_name),
                })
            }
            AttributeType::String { size: 0 } => {
                return Err(Error::Store {
                    code: 400,
                    message: "Attribute size must be at least 1".to_string(),
                })
            }
            AttributeType::Enum { elements } if elements.is_empty() => {
                return Err(Error::Store {
                    code: 400,
                    message: "Enum attribute requires at least one element".to_string(),
                })
            }
            AttributeType::Integer { min, max } => {
                check_integer_bound(&attribute.key, *min)?;
                check_integer_bound(&attribute.key, *max)?;
                // Unset bounds are reported back as the extreme sentinels.
                AttributeType::Integer {
                    min: Some(min.unwrap_or(i64::MIN)),
                    max: Some(max.unwrap_or(i64::MAX)),
                }
            }
            other => other.clone(),
        };

        let created = AttributeDescriptor {
            attribute_type,
            status: ResourceStatus::Processing,
            ..attribute.clone()
        };
        coll.add_attribute(created, pending, settle);
        Ok(())
    }

    async fn delete_attribute(&self, collection: &str, key: &str) -> Result<()> {
        let mut state = self.state.lock();
        let pending = state.deletion_polls;
        let coll = state.collection_mut(collection)?;

        let tracked = coll
            .attributes
            .iter_mut()
            .find(|t| t.value.key == key && t.value.status != ResourceStatus::Deleting)
            .ok_or_else(|| Error::not_found(ResourceKind::Attribute, key))?;
        tracked.value.status = ResourceStatus::Deleting;
        tracked.pending_polls = pending;
        tracked.settle = Settle::Remove;

        for document in &mut coll.documents {
            document.remove(key);
        }
        coll.indexes.retain(|t| !t.value.references(key));
        Ok(())
    }

    async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexDescriptor>> {
        let state = self.state.lock();
        let coll = state.collection(collection)?;
        Ok(coll.indexes.iter().map(|t| t.value.clone()).collect())
    }

    async fn get_index(&self, collection: &str, key: &str) -> Result<IndexDescriptor> {
        let mut state = self.state.lock();
        let coll = state.collection_mut(collection)?;
        poll(&mut coll.indexes, key).ok_or_else(|| Error::not_found(ResourceKind::Index, key))
    }

    async fn create_index(&self, collection: &str, index: &IndexDescriptor) -> Result<()> {
        let mut state = self.state.lock();
        let pending = state.creation_polls;
        let settle = state.settle_for(&index.key);
        let coll = state.collection_mut(collection)?;

        if coll.indexes.iter().any(|t| t.value.key == index.key) {
            return Err(Error::Store {
                code: 409,
                message: format!("Index with the requested key \"{}\" already exists", index.key),
            });
        }
        if index.attributes.is_empty() {
            return Err(Error::Store {
                code: 400,
                message: "Index requires at least one attribute".to_string(),
            });
        }
        for attribute in &index.attributes {
            let available = coll
                .live_attribute(attribute)
                .map(|a| a.status.is_available())
                .unwrap_or(false);
            if !available {
                return Err(Error::Store {
                    code: 400,
                    message: format!("Attribute \"{}\" is not available for indexing", attribute),
                });
            }
        }

        coll.indexes.push(Tracked {
            value: index.clone().with_status(ResourceStatus::Processing),
            pending_polls: pending,
            settle,
        });
        Ok(())
    }

    async fn delete_index(&self, collection: &str, key: &str) -> Result<()> {
        let mut state = self.state.lock();
        let pending = state.deletion_polls;
        let coll = state.collection_mut(collection)?;

        let tracked = coll
            .indexes
            .iter_mut()
            .find(|t| t.value.key == key && t.value.status != ResourceStatus::Deleting)
            .ok_or_else(|| Error::not_found(ResourceKind::Index, key))?;
        tracked.value.status = ResourceStatus::Deleting;
        tracked.pending_polls = pending;
        tracked.settle = Settle::Remove;
        Ok(())
    }

    async fn list_documents(
        &self,
        collection: &str,
        limit: usize,
        offset: u64,
    ) -> Result<DocumentPage> {
        let state = self.state.lock();
        let coll = state.collection(collection)?;
        let documents = coll
            .documents
            .iter()
            .skip(offset as usize)
            .take(limit)
            .cloned()
            .collect();
        Ok(DocumentPage {
            total: coll.documents.len() as u64,
            documents,
        })
    }

    async fn update_document(
        &self,
        collection: &str,
        document_id: &str,
        patch: Map<String, Value>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let now = state.tick();
        let coll = state.collection_mut(collection)?;
        coll.validate_fields(&patch)?;

        let document = coll
            .documents
            .iter_mut()
            .find(|d| d.id() == Some(document_id))
            .ok_or_else(|| Error::not_found(ResourceKind::Document, document_id))?;
        for (key, value) in patch {
            document.insert(key, value);
        }
        document.insert("$updatedAt", Value::String(now));

        state.document_writes += 1;
        Ok(())
    }

    async fn create_document(
        &self,
        collection: &str,
        document_id: Option<&str>,
        data: Map<String, Value>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.create_document(collection, document_id, data)?;
        Ok(())
    }

    async fn get_collection(&self, collection: &str) -> Result<CollectionDescriptor> {
        let state = self.state.lock();
        Ok(state.collection(collection)?.descriptor.clone())
    }

    async fn create_collection(&self, collection: &CollectionDescriptor) -> Result<()> {
        let mut state = self.state.lock();
        if state.collections.contains_key(&collection.id) {
            return Err(Error::Store {
                code: 409,
                message: format!(
                    "Collection with the requested ID \"{}\" already exists",
                    collection.id
                ),
            });
        }
        state.collections.insert(
            collection.id.clone(),
            MemoryCollection::new(collection.clone()),
        );
        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        let mut state = self.state.lock();
        state
            .collections
            .remove(collection)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(ResourceKind::Collection, collection))
    }
}
