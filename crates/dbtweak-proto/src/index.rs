//! Index descriptors.

use serde::{Deserialize, Serialize};

use crate::status::ResourceStatus;

/// Kind of index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    Key,
    Unique,
    Fulltext,
}

impl std::fmt::Display for IndexType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexType::Key => write!(f, "key"),
            IndexType::Unique => write!(f, "unique"),
            IndexType::Fulltext => write!(f, "fulltext"),
        }
    }
}

/// Sort order of one indexed attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "ASC"),
            SortOrder::Desc => write!(f, "DESC"),
        }
    }
}

/// An index on a collection.
///
/// The order of `attributes` is significant and `orders[i]` applies to
/// `attributes[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Index key (name).
    pub key: String,
    /// Index type.
    #[serde(rename = "type")]
    pub index_type: IndexType,
    /// Creation/deletion status.
    pub status: ResourceStatus,
    /// Covered attributes, in index order.
    pub attributes: Vec<String>,
    /// Per-attribute sort orders.
    pub orders: Vec<SortOrder>,
}

impl IndexDescriptor {
    /// Create an available index with ascending order on every attribute.
    pub fn new(key: impl Into<String>, index_type: IndexType, attributes: Vec<String>) -> Self {
        let orders = vec![SortOrder::Asc; attributes.len()];
        Self {
            key: key.into(),
            index_type,
            status: ResourceStatus::Available,
            attributes,
            orders,
        }
    }

    /// Set the per-attribute sort orders.
    pub fn with_orders(mut self, orders: Vec<SortOrder>) -> Self {
        self.orders = orders;
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether this index covers the given attribute.
    pub fn references(&self, attribute: &str) -> bool {
        self.attributes.iter().any(|a| a == attribute)
    }

    /// Copy of this index with every occurrence of `from` replaced by `to`,
    /// keeping attribute positions and sort orders.
    pub fn with_renamed_attribute(&self, from: &str, to: &str) -> Self {
        let attributes = self
            .attributes
            .iter()
            .map(|a| if a == from { to.to_string() } else { a.clone() })
            .collect();

        Self {
            attributes,
            ..self.clone()
        }
    }
}
