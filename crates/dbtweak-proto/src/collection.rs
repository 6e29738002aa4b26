//! Collection descriptors.

use serde::{Deserialize, Serialize};

/// Collection-level settings that a clone must reproduce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    /// Collection identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether per-document permissions are enforced.
    pub document_security: bool,
    /// Whether the collection is enabled.
    pub enabled: bool,
    /// Collection-level permission strings, copied verbatim.
    pub permissions: Vec<String>,
}

impl CollectionDescriptor {
    /// Create an enabled collection without permissions or document security.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            document_security: false,
            enabled: true,
            permissions: Vec::new(),
        }
    }

    /// Set the document security flag.
    pub fn with_document_security(mut self, document_security: bool) -> Self {
        self.document_security = document_security;
        self
    }

    /// Set the collection permissions.
    pub fn with_permissions(mut self, permissions: Vec<String>) -> Self {
        self.permissions = permissions;
        self
    }

    /// Settings for a copy of this collection under a new identifier.
    pub fn cloned_as(&self, id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            ..self.clone()
        }
    }
}
