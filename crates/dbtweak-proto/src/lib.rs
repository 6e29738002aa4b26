//! dbtweak data model.
//!
//! This crate defines the descriptors exchanged between the store client and
//! the migration engine. Every descriptor is an in-memory snapshot of what the
//! remote store reported; none of them is authoritative.
//!
//! # Modules
//!
//! - [`attribute`] - Attribute descriptors and their typed constraints
//! - [`index`] - Index descriptors, index types and sort orders
//! - [`document`] - Documents, store-managed metadata and result pages
//! - [`collection`] - Collection descriptors
//! - [`status`] - Asynchronous resource status and resource kinds

pub mod attribute;
pub mod collection;
pub mod document;
pub mod index;
pub mod status;

// Re-export commonly used types at crate root
pub use attribute::{AttributeDescriptor, AttributeType};
pub use collection::CollectionDescriptor;
pub use document::{Document, DocumentPage};
pub use index::{IndexDescriptor, IndexType, SortOrder};
pub use status::{ResourceKind, ResourceStatus};
