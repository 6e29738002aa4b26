//! Asynchronous resource status.

use serde::{Deserialize, Serialize};

/// Status the store reports for an attribute or index.
///
/// Creation and deletion complete asynchronously; callers poll until a
/// terminal state is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    /// Creation requested, not yet usable.
    Processing,
    /// Ready for use.
    Available,
    /// Deletion requested, not yet removed.
    Deleting,
    /// The store gave up processing the resource.
    Stuck,
    /// Creation failed.
    Failed,
    /// Any status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl ResourceStatus {
    /// Whether the resource can be used.
    pub fn is_available(&self) -> bool {
        matches!(self, ResourceStatus::Available)
    }

    /// Whether the store will never make this resource available.
    pub fn is_failure(&self) -> bool {
        matches!(self, ResourceStatus::Failed | ResourceStatus::Stuck)
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Processing => write!(f, "processing"),
            ResourceStatus::Available => write!(f, "available"),
            ResourceStatus::Deleting => write!(f, "deleting"),
            ResourceStatus::Stuck => write!(f, "stuck"),
            ResourceStatus::Failed => write!(f, "failed"),
            ResourceStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Kind of a named store resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Attribute,
    Index,
    Collection,
    Document,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Attribute => write!(f, "attribute"),
            ResourceKind::Index => write!(f, "index"),
            ResourceKind::Collection => write!(f, "collection"),
            ResourceKind::Document => write!(f, "document"),
        }
    }
}
