//! JSON shapes of the databases API and their conversion to descriptors.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use dbtweak_proto::{
    AttributeDescriptor, AttributeType, CollectionDescriptor, Document, DocumentPage,
    IndexDescriptor, IndexType, ResourceStatus, SortOrder,
};

use crate::error::Error;

/// Identifier asking the API to generate a document ID.
pub const UNIQUE_ID: &str = "unique()";

/// An attribute as returned by the API. Every type shares this flat shape;
/// the fields that apply depend on `type` and `format`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAttribute {
    pub key: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub status: Option<ResourceStatus>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub array: bool,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub elements: Option<Vec<String>>,
    #[serde(default)]
    pub min: Option<Value>,
    #[serde(default)]
    pub max: Option<Value>,
    #[serde(default)]
    pub default: Option<Value>,
}

fn integer_bound(value: &Option<Value>) -> Option<i64> {
    let value = value.as_ref()?;
    // Extreme bounds may come back as floats; `as` saturates.
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

fn float_bound(value: &Option<Value>) -> Option<f64> {
    value.as_ref().and_then(Value::as_f64)
}

impl RawAttribute {
    /// Typed descriptor. Types the engine cannot reproduce become
    /// [`AttributeType::Unsupported`].
    pub fn into_descriptor(self) -> AttributeDescriptor {
        let format = self.format.as_deref().filter(|f| !f.is_empty());
        let attribute_type = match (self.type_name.as_str(), format) {
            ("string", None) => AttributeType::String {
                size: self.size.unwrap_or_default(),
            },
            ("string", Some("email")) => AttributeType::Email,
            ("string", Some("enum")) => AttributeType::Enum {
                elements: self.elements.clone().unwrap_or_default(),
            },
            ("string", Some("ip")) => AttributeType::Ip,
            ("string", Some("url")) => AttributeType::Url,
            ("string", Some(other)) => AttributeType::Unsupported {
                type_name: format!("string/{}", other),
            },
            ("integer", _) => AttributeType::Integer {
                min: integer_bound(&self.min),
                max: integer_bound(&self.max),
            },
            ("double", _) | ("float", _) => AttributeType::Float {
                min: float_bound(&self.min),
                max: float_bound(&self.max),
            },
            ("boolean", _) => AttributeType::Boolean,
            ("datetime", _) => AttributeType::Datetime,
            (other, _) => AttributeType::Unsupported {
                type_name: other.to_string(),
            },
        };

        AttributeDescriptor {
            key: self.key,
            attribute_type,
            status: self.status.unwrap_or(ResourceStatus::Available),
            required: self.required,
            array: self.array,
            default: self.default,
        }
    }
}

/// An index as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawIndex {
    pub key: String,
    #[serde(rename = "type")]
    pub index_type: IndexType,
    #[serde(default)]
    pub status: Option<ResourceStatus>,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub orders: Option<Vec<Option<SortOrder>>>,
}

impl RawIndex {
    /// Descriptor with one sort order per attribute. Missing orders are
    /// ascending.
    pub fn into_descriptor(self) -> IndexDescriptor {
        let mut orders: Vec<SortOrder> = self
            .orders
            .unwrap_or_default()
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();
        orders.resize(self.attributes.len(), SortOrder::Asc);

        IndexDescriptor {
            key: self.key,
            index_type: self.index_type,
            status: self.status.unwrap_or(ResourceStatus::Available),
            attributes: self.attributes,
            orders,
        }
    }
}

/// A collection as returned by the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCollection {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub document_security: bool,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(rename = "$permissions", default)]
    pub permissions: Vec<String>,
}

fn enabled_by_default() -> bool {
    true
}

impl RawCollection {
    pub fn into_descriptor(self) -> CollectionDescriptor {
        CollectionDescriptor {
            id: self.id,
            name: self.name,
            document_security: self.document_security,
            enabled: self.enabled,
            permissions: self.permissions,
        }
    }
}

/// Schema listings are paged like documents; `total` counts every entry.
#[derive(Debug, Deserialize)]
pub struct AttributeList {
    #[serde(default)]
    pub total: u64,
    pub attributes: Vec<RawAttribute>,
}

impl AttributeList {
    pub fn into_parts(self) -> (u64, Vec<RawAttribute>) {
        (self.total, self.attributes)
    }
}

#[derive(Debug, Deserialize)]
pub struct IndexList {
    #[serde(default)]
    pub total: u64,
    pub indexes: Vec<RawIndex>,
}

impl IndexList {
    pub fn into_parts(self) -> (u64, Vec<RawIndex>) {
        (self.total, self.indexes)
    }
}

#[derive(Debug, Deserialize)]
pub struct DocumentList {
    pub total: u64,
    pub documents: Vec<Map<String, Value>>,
}

impl DocumentList {
    pub fn into_page(self) -> DocumentPage {
        DocumentPage {
            total: self.total,
            documents: self.documents.into_iter().map(Document::from_map).collect(),
        }
    }
}

/// Error body returned on non-success statuses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Creation endpoint suffix for an attribute type.
pub fn attribute_endpoint(attribute: &AttributeDescriptor) -> Result<&'static str, Error> {
    let endpoint = match &attribute.attribute_type {
        AttributeType::String { .. } => "string",
        AttributeType::Email => "email",
        AttributeType::Enum { .. } => "enum",
        AttributeType::Ip => "ip",
        AttributeType::Url => "url",
        AttributeType::Integer { .. } => "integer",
        AttributeType::Float { .. } => "float",
        AttributeType::Boolean => "boolean",
        AttributeType::Datetime => "datetime",
        AttributeType::Unsupported { type_name } => {
            return Err(Error::Config(format!(
                "cannot create attribute \"{}\" of type {}",
                attribute.key, type_name
            )))
        }
    };
    Ok(endpoint)
}

/// Body of an attribute creation request.
pub fn attribute_body(attribute: &AttributeDescriptor) -> Value {
    // Required attributes cannot carry a default.
    let default = match &attribute.default {
        Some(value) if !attribute.required => value.clone(),
        _ => Value::Null,
    };
    let mut body = json!({
        "key": attribute.key,
        "required": attribute.required,
        "array": attribute.array,
        "default": default,
    });

    let extra = match &attribute.attribute_type {
        AttributeType::String { size } => json!({ "size": size }),
        AttributeType::Enum { elements } => json!({ "elements": elements }),
        AttributeType::Integer { min, max } => json!({ "min": min, "max": max }),
        AttributeType::Float { min, max } => json!({ "min": min, "max": max }),
        _ => Value::Null,
    };
    if let (Value::Object(body), Value::Object(extra)) = (&mut body, extra) {
        body.extend(extra);
    }
    body
}

/// Body of an index creation request.
pub fn index_body(index: &IndexDescriptor) -> Value {
    json!({
        "key": index.key,
        "type": index.index_type,
        "attributes": index.attributes,
        "orders": index.orders,
    })
}

/// Body of a collection creation request.
pub fn collection_body(collection: &CollectionDescriptor) -> Value {
    json!({
        "collectionId": collection.id,
        "name": collection.name,
        "permissions": collection.permissions,
        "documentSecurity": collection.document_security,
        "enabled": collection.enabled,
    })
}

/// Body of a document creation request.
pub fn document_create_body(document_id: Option<&str>, data: Map<String, Value>) -> Value {
    json!({
        "documentId": document_id.unwrap_or(UNIQUE_ID),
        "data": data,
    })
}

/// Body of a document update request.
pub fn document_update_body(patch: Map<String, Value>) -> Value {
    json!({ "data": patch })
}

/// Offset of the next page of a listing, or `None` once `collected` entries
/// cover `total` or the last page came back empty.
pub fn next_page_offset(collected: usize, page_len: usize, total: u64) -> Option<u64> {
    let collected = collected as u64;
    if page_len == 0 || collected >= total {
        None
    } else {
        Some(collected)
    }
}

/// Query strings selecting one page of a listing.
pub fn page_queries(limit: usize, offset: u64) -> Vec<(&'static str, String)> {
    vec![
        ("queries[]", json!({ "method": "limit", "values": [limit] }).to_string()),
        ("queries[]", json!({ "method": "offset", "values": [offset] }).to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn attribute(value: Value) -> AttributeDescriptor {
        serde_json::from_value::<RawAttribute>(value)
            .unwrap()
            .into_descriptor()
    }

    #[test]
    fn test_parse_string_attribute() {
        let attr = attribute(json!({
            "key": "name",
            "type": "string",
            "status": "available",
            "error": "",
            "required": true,
            "array": false,
            "size": 50,
            "default": null
        }));
        assert_eq!(attr, AttributeDescriptor::string("name", 50).with_required(true));
    }

    #[test]
    fn test_parse_formatted_strings() {
        let email = attribute(json!({"key": "mail", "type": "string", "format": "email", "size": 254}));
        assert_eq!(email.attribute_type, AttributeType::Email);

        let role = attribute(json!({
            "key": "role",
            "type": "string",
            "format": "enum",
            "elements": ["admin", "user"],
            "default": "user"
        }));
        assert_eq!(
            role.attribute_type,
            AttributeType::Enum {
                elements: vec!["admin".into(), "user".into()]
            }
        );
        assert_eq!(role.default, Some(json!("user")));

        let ip = attribute(json!({"key": "ip", "type": "string", "format": "ip"}));
        assert_eq!(ip.attribute_type, AttributeType::Ip);
    }

    #[test]
    fn test_parse_integer_with_sentinels() {
        let attr = attribute(json!({
            "key": "age",
            "type": "integer",
            "status": "processing",
            "min": i64::MIN,
            "max": 9.223372036854776e18
        }));
        assert_eq!(
            attr.attribute_type,
            AttributeType::Integer {
                min: Some(i64::MIN),
                max: Some(i64::MAX)
            }
        );
        assert_eq!(attr.status, ResourceStatus::Processing);
    }

    #[test]
    fn test_parse_double_and_unknown_types() {
        let score = attribute(json!({"key": "score", "type": "double", "min": 0.5, "max": null}));
        assert_eq!(
            score.attribute_type,
            AttributeType::Float {
                min: Some(0.5),
                max: None
            }
        );

        let author = attribute(json!({"key": "author", "type": "relationship", "status": "available"}));
        assert_eq!(
            author.attribute_type,
            AttributeType::Unsupported {
                type_name: "relationship".into()
            }
        );
    }

    #[test]
    fn test_parse_unknown_status() {
        let attr = attribute(json!({"key": "x", "type": "boolean", "status": "migrating"}));
        assert_eq!(attr.status, ResourceStatus::Unknown);
    }

    #[test]
    fn test_parse_index_with_null_orders() {
        let index: RawIndex = serde_json::from_value(json!({
            "key": "idx_people",
            "type": "unique",
            "status": "available",
            "attributes": ["surname", "name", "age"],
            "orders": ["DESC", null]
        }))
        .unwrap();
        let index = index.into_descriptor();
        assert_eq!(index.index_type, IndexType::Unique);
        assert_eq!(
            index.orders,
            vec![SortOrder::Desc, SortOrder::Asc, SortOrder::Asc]
        );
    }

    #[test]
    fn test_parse_collection() {
        let raw: RawCollection = serde_json::from_value(json!({
            "$id": "users",
            "name": "Users",
            "documentSecurity": true,
            "enabled": false,
            "$permissions": ["read(\"any\")"]
        }))
        .unwrap();
        let collection = raw.into_descriptor();
        assert_eq!(collection.id, "users");
        assert_eq!(collection.name, "Users");
        assert!(collection.document_security);
        assert!(!collection.enabled);
        assert_eq!(collection.permissions, vec!["read(\"any\")"]);
    }

    #[test]
    fn test_attribute_bodies() {
        let string = AttributeDescriptor::string("name", 100).with_default("anon");
        assert_eq!(attribute_endpoint(&string).unwrap(), "string");
        assert_eq!(
            attribute_body(&string),
            json!({"key": "name", "required": false, "array": false, "default": "anon", "size": 100})
        );

        let integer = AttributeDescriptor::integer("age", None, Some(150)).with_required(true);
        assert_eq!(
            attribute_body(&integer),
            json!({"key": "age", "required": true, "array": false, "default": null, "min": null, "max": 150})
        );
        assert_eq!(attribute_endpoint(&integer).unwrap(), "integer");

        let float = AttributeDescriptor::new("score", AttributeType::Float { min: None, max: None });
        assert_eq!(attribute_endpoint(&float).unwrap(), "float");
    }

    #[test]
    fn test_unsupported_attribute_has_no_endpoint() {
        let attr = AttributeDescriptor::new(
            "author",
            AttributeType::Unsupported {
                type_name: "relationship".into(),
            },
        );
        assert!(attribute_endpoint(&attr).is_err());
    }

    #[test]
    fn test_index_and_collection_bodies() {
        let index = IndexDescriptor::new("idx", IndexType::Fulltext, vec!["bio".into()])
            .with_orders(vec![SortOrder::Desc]);
        assert_eq!(
            index_body(&index),
            json!({"key": "idx", "type": "fulltext", "attributes": ["bio"], "orders": ["DESC"]})
        );

        let collection = CollectionDescriptor::new("archive").with_document_security(true);
        assert_eq!(
            collection_body(&collection),
            json!({
                "collectionId": "archive",
                "name": "archive",
                "permissions": [],
                "documentSecurity": true,
                "enabled": true
            })
        );
    }

    #[test]
    fn test_document_bodies_and_queries() {
        let mut data = Map::new();
        data.insert("name".into(), json!("Ada"));
        assert_eq!(
            document_create_body(None, data.clone()),
            json!({"documentId": "unique()", "data": {"name": "Ada"}})
        );
        assert_eq!(document_update_body(data), json!({"data": {"name": "Ada"}}));

        let queries = page_queries(100, 200);
        assert_eq!(queries[0].0, "queries[]");
        assert_eq!(queries[0].1, r#"{"method":"limit","values":[100]}"#);
        assert_eq!(queries[1].1, r#"{"method":"offset","values":[200]}"#);
    }

    #[test]
    fn test_parse_lists_with_total() {
        let list: AttributeList = serde_json::from_value(json!({
            "total": 30,
            "attributes": [{"key": "a1", "type": "boolean"}]
        }))
        .unwrap();
        let (total, attributes) = list.into_parts();
        assert_eq!(total, 30);
        assert_eq!(attributes.len(), 1);

        let list: IndexList = serde_json::from_value(json!({"indexes": []})).unwrap();
        assert_eq!(list.into_parts().0, 0);
    }

    #[test]
    fn test_next_page_offset() {
        // 30 attributes served 25 at a time.
        assert_eq!(next_page_offset(25, 25, 30), Some(25));
        assert_eq!(next_page_offset(30, 5, 30), None);
        // A short or empty page never loops.
        assert_eq!(next_page_offset(25, 0, 30), None);
        assert_eq!(next_page_offset(0, 0, 0), None);
        assert_eq!(next_page_offset(10, 10, 0), None);
    }
}
