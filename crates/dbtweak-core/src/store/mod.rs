//! The remote store interface the migration engine is written against.
//!
//! Every call may suspend. Attribute and index creation/deletion only
//! *request* the change; completion is observed by polling
//! [`DocumentStore::get_attribute`] / [`DocumentStore::get_index`]. Once a
//! deleted resource is fully gone, those calls fail with
//! [`Error::NotFound`](crate::Error::NotFound).

pub mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};

use dbtweak_proto::{
    AttributeDescriptor, CollectionDescriptor, DocumentPage, IndexDescriptor,
};

use crate::error::Result;

pub use memory::MemoryStore;

/// Primitive operations of a schema-bearing document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List the attributes of a collection in schema order.
    async fn list_attributes(&self, collection: &str) -> Result<Vec<AttributeDescriptor>>;

    /// Read one attribute, including its current status.
    async fn get_attribute(&self, collection: &str, key: &str) -> Result<AttributeDescriptor>;

    /// Request creation of an attribute. The store dispatches on the
    /// descriptor's type; the descriptor's status is ignored.
    async fn create_attribute(&self, collection: &str, attribute: &AttributeDescriptor)
        -> Result<()>;

    /// Request deletion of an attribute.
    async fn delete_attribute(&self, collection: &str, key: &str) -> Result<()>;

    /// List the indexes of a collection in store order.
    async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexDescriptor>>;

    /// Read one index, including its current status.
    async fn get_index(&self, collection: &str, key: &str) -> Result<IndexDescriptor>;

    /// Request creation of an index.
    async fn create_index(&self, collection: &str, index: &IndexDescriptor) -> Result<()>;

    /// Request deletion of an index.
    async fn delete_index(&self, collection: &str, key: &str) -> Result<()>;

    /// Fetch one page of documents.
    async fn list_documents(
        &self,
        collection: &str,
        limit: usize,
        offset: u64,
    ) -> Result<DocumentPage>;

    /// Write the given fields of one document.
    async fn update_document(
        &self,
        collection: &str,
        document_id: &str,
        patch: Map<String, Value>,
    ) -> Result<()>;

    /// Create a document. `None` lets the store assign the identifier.
    async fn create_document(
        &self,
        collection: &str,
        document_id: Option<&str>,
        data: Map<String, Value>,
    ) -> Result<()>;

    /// Read collection-level settings.
    async fn get_collection(&self, collection: &str) -> Result<CollectionDescriptor>;

    /// Create an empty collection.
    async fn create_collection(&self, collection: &CollectionDescriptor) -> Result<()>;

    /// Delete a collection with everything in it.
    async fn delete_collection(&self, collection: &str) -> Result<()>;
}
