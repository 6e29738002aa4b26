//! Attribute descriptors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::status::ResourceStatus;

/// Declared type of an attribute.
///
/// Each variant carries exactly the constraints that are meaningful for its
/// kind and string sub-format, so a descriptor can never hold a size on an
/// integer or bounds on an email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AttributeType {
    /// Plain string with a maximum length.
    String {
        /// Maximum length in characters.
        size: u64,
    },
    /// String validated as an email address.
    Email,
    /// String restricted to a set of values.
    Enum {
        /// Allowed values, in declaration order.
        elements: Vec<String>,
    },
    /// String validated as an IP address.
    Ip,
    /// String validated as a URL.
    Url,
    /// 64-bit integer with optional bounds.
    Integer {
        min: Option<i64>,
        max: Option<i64>,
    },
    /// Floating point number with optional bounds.
    Float {
        min: Option<f64>,
        max: Option<f64>,
    },
    Boolean,
    Datetime,
    /// A type the migration engine does not know how to reproduce
    /// (relationships, geometry, ...).
    Unsupported {
        /// Type name as reported by the store.
        type_name: String,
    },
}

impl AttributeType {
    /// Short label combining kind and sub-format, e.g. `string/email`.
    pub fn label(&self) -> String {
        match self {
            AttributeType::String { .. } => "string".to_string(),
            AttributeType::Email => "string/email".to_string(),
            AttributeType::Enum { .. } => "string/enum".to_string(),
            AttributeType::Ip => "string/ip".to_string(),
            AttributeType::Url => "string/url".to_string(),
            AttributeType::Integer { .. } => "integer".to_string(),
            AttributeType::Float { .. } => "double".to_string(),
            AttributeType::Boolean => "boolean".to_string(),
            AttributeType::Datetime => "datetime".to_string(),
            AttributeType::Unsupported { type_name } => type_name.clone(),
        }
    }

    /// Human-readable summary of the constraints, empty when there are none.
    pub fn constraints(&self) -> String {
        fn bound<T: std::fmt::Display>(value: &Option<T>) -> String {
            value
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string())
        }

        match self {
            AttributeType::String { size } => format!("size={}", size),
            AttributeType::Enum { elements } => format!("elements=[{}]", elements.join(", ")),
            AttributeType::Integer { min, max } => format!("min={} max={}", bound(min), bound(max)),
            AttributeType::Float { min, max } => format!("min={} max={}", bound(min), bound(max)),
            _ => String::new(),
        }
    }

    /// Whether this is a plain string, the only kind a size applies to.
    pub fn is_sized_string(&self) -> bool {
        matches!(self, AttributeType::String { .. })
    }
}

/// A field of a collection's schema, as last read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    /// Attribute key (field name).
    pub key: String,
    /// Declared type and its constraints.
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    /// Creation/deletion status.
    pub status: ResourceStatus,
    /// Whether documents must provide a value.
    pub required: bool,
    /// Whether the attribute holds a list of values.
    pub array: bool,
    /// Default value applied when a document omits the field.
    pub default: Option<Value>,
}

impl AttributeDescriptor {
    /// Create an optional, scalar, available attribute.
    pub fn new(key: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            key: key.into(),
            attribute_type,
            status: ResourceStatus::Available,
            required: false,
            array: false,
            default: None,
        }
    }

    /// Shorthand for a plain string attribute.
    pub fn string(key: impl Into<String>, size: u64) -> Self {
        Self::new(key, AttributeType::String { size })
    }

    /// Shorthand for an integer attribute.
    pub fn integer(key: impl Into<String>, min: Option<i64>, max: Option<i64>) -> Self {
        Self::new(key, AttributeType::Integer { min, max })
    }

    /// Mark as required.
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Mark as an array attribute.
    pub fn with_array(mut self, array: bool) -> Self {
        self.array = array;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    /// Maximum length, for plain string attributes.
    pub fn size(&self) -> Option<u64> {
        match self.attribute_type {
            AttributeType::String { size } => Some(size),
            _ => None,
        }
    }
}
