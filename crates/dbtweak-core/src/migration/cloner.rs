//! Attribute cloning: reproduce a definition under a new key, then copy the
//! values across.

use dbtweak_proto::{AttributeDescriptor, AttributeType, ResourceKind, ResourceStatus};
use serde_json::Map;
use tracing::{debug, info};

use super::cursor::DocumentCursor;
use super::wait::Waiter;
use crate::config::MigrationConfig;
use crate::error::{Error, Result};
use crate::store::DocumentStore;

/// Build the definition of a copy of `source` named `key`.
///
/// `size` replaces the maximum length of a plain string attribute. Integer
/// bounds whose magnitude exceeds `bound_limit` are dropped: the store
/// reports "no bound" as extreme sentinels it then refuses on creation.
pub fn derive_definition(
    source: &AttributeDescriptor,
    key: &str,
    size: Option<u64>,
    bound_limit: i64,
) -> Result<AttributeDescriptor> {
    let attribute_type = match (&source.attribute_type, size) {
        (AttributeType::Unsupported { type_name }, _) => {
            return Err(Error::UnsupportedAttribute {
                name: source.key.clone(),
                type_name: type_name.clone(),
            })
        }
        (AttributeType::String { .. }, Some(size)) => AttributeType::String { size },
        (other, Some(_)) => {
            return Err(Error::InvalidArgument(format!(
                "cannot resize attribute \"{}\" of type {}",
                source.key,
                other.label()
            )))
        }
        (AttributeType::Integer { min, max }, None) => AttributeType::Integer {
            min: min.filter(|m| *m >= -bound_limit),
            max: max.filter(|m| *m <= bound_limit),
        },
        (other, None) => other.clone(),
    };

    Ok(AttributeDescriptor {
        key: key.to_string(),
        attribute_type,
        status: ResourceStatus::Processing,
        required: source.required,
        array: source.array,
        default: source.default.clone(),
    })
}

/// Creates attribute copies and fills them from the source values.
pub struct AttributeCloner<'a, S: ?Sized> {
    store: &'a S,
    config: &'a MigrationConfig,
}

impl<'a, S: DocumentStore + ?Sized> AttributeCloner<'a, S> {
    pub fn new(store: &'a S, config: &'a MigrationConfig) -> Self {
        Self { store, config }
    }

    /// Clone `source_key` of `source_collection` as `target_key` of
    /// `target_collection`, waiting until the new attribute is available.
    ///
    /// Values are copied only when both collections are the same; a copy to
    /// another collection carries the definition alone. Returns the number of
    /// documents written.
    pub async fn clone_attribute(
        &self,
        source_collection: &str,
        source_key: &str,
        target_collection: &str,
        target_key: &str,
        size: Option<u64>,
    ) -> Result<u64> {
        let source = self
            .store
            .get_attribute(source_collection, source_key)
            .await
            .map_err(|e| e.with_reason(format!("Unknown attribute \"{}\"", source_key)))?;

        let definition =
            derive_definition(&source, target_key, size, self.config.integer_bound_limit)?;
        debug!(
            collection = target_collection,
            attribute = target_key,
            kind = %definition.attribute_type.label(),
            "creating attribute"
        );
        self.store
            .create_attribute(target_collection, &definition)
            .await?;
        Waiter::new(self.store, self.config)
            .wait_until_available(target_collection, ResourceKind::Attribute, target_key)
            .await?;

        if source_collection != target_collection {
            return Ok(0);
        }
        self.copy_values(source_collection, source_key, target_key)
            .await
    }

    /// Write `document[from]` into `document[to]` for every document that
    /// has the field. Documents without it keep the store's default.
    async fn copy_values(&self, collection: &str, from: &str, to: &str) -> Result<u64> {
        let mut cursor = DocumentCursor::open(self.store, collection, self.config.chunk_size).await?;
        let total = cursor.total();
        let mut written = 0u64;

        while let Some(batch) = cursor.next_batch().await? {
            for document in batch {
                let (Some(id), Some(value)) = (document.id(), document.get(from)) else {
                    continue;
                };
                let mut patch = Map::new();
                patch.insert(to.to_string(), value.clone());
                self.store.update_document(collection, id, patch).await?;
                written += 1;
            }
            debug!(collection, attribute = to, written, total, "copied batch");
        }

        info!(collection, from, to, documents = written, "copied attribute values");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use dbtweak_proto::CollectionDescriptor;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::time::Duration;

    const LIMIT: i64 = 999_999_999_999_999;

    #[test]
    fn test_derive_string_with_new_size() {
        let source = AttributeDescriptor::string("name", 50)
            .with_required(true)
            .with_array(true);
        let copy = derive_definition(&source, "tmp___", Some(100), LIMIT).unwrap();

        assert_eq!(copy.key, "tmp___");
        assert_eq!(copy.attribute_type, AttributeType::String { size: 100 });
        assert!(copy.required);
        assert!(copy.array);
        assert_eq!(copy.status, ResourceStatus::Processing);
    }

    #[test]
    fn test_derive_clamps_sentinel_bounds() {
        let source = AttributeDescriptor::integer("age", Some(i64::MIN), Some(i64::MAX));
        let copy = derive_definition(&source, "age2", None, LIMIT).unwrap();
        assert_eq!(
            copy.attribute_type,
            AttributeType::Integer {
                min: None,
                max: None
            }
        );

        let source = AttributeDescriptor::integer("age", Some(0), Some(150));
        let copy = derive_definition(&source, "age2", None, LIMIT).unwrap();
        assert_eq!(
            copy.attribute_type,
            AttributeType::Integer {
                min: Some(0),
                max: Some(150)
            }
        );
    }

    #[test]
    fn test_derive_keeps_bound_at_limit() {
        let source = AttributeDescriptor::integer("n", Some(-LIMIT), Some(LIMIT + 1));
        let copy = derive_definition(&source, "m", None, LIMIT).unwrap();
        assert_eq!(
            copy.attribute_type,
            AttributeType::Integer {
                min: Some(-LIMIT),
                max: None
            }
        );
    }

    #[test]
    fn test_derive_keeps_enum_and_default() {
        let source = AttributeDescriptor::new(
            "role",
            AttributeType::Enum {
                elements: vec!["admin".into(), "user".into()],
            },
        )
        .with_default("user");
        let copy = derive_definition(&source, "role2", None, LIMIT).unwrap();
        assert_eq!(copy.attribute_type, source.attribute_type);
        assert_eq!(copy.default, Some(json!("user")));
    }

    #[test]
    fn test_derive_reproduces_every_kind() {
        let kinds = vec![
            AttributeType::String { size: 255 },
            AttributeType::Email,
            AttributeType::Enum {
                elements: vec!["draft".into(), "live".into()],
            },
            AttributeType::Ip,
            AttributeType::Url,
            AttributeType::Integer {
                min: Some(-10),
                max: Some(10),
            },
            AttributeType::Integer {
                min: None,
                max: None,
            },
            AttributeType::Float {
                min: Some(-f64::MAX),
                max: Some(1.5),
            },
            AttributeType::Float {
                min: None,
                max: None,
            },
            AttributeType::Boolean,
            AttributeType::Datetime,
        ];

        for attribute_type in kinds {
            for (required, array, default) in [
                (true, false, None),
                (false, true, None),
                (false, false, Some(json!(null))),
            ] {
                let mut source = AttributeDescriptor::new("field", attribute_type.clone())
                    .with_required(required)
                    .with_array(array);
                source.default = default.clone();

                let copy = derive_definition(&source, "copy", None, LIMIT).unwrap();
                assert_eq!(copy.key, "copy");
                assert_eq!(copy.attribute_type, attribute_type);
                assert_eq!(copy.required, required);
                assert_eq!(copy.array, array);
                assert_eq!(copy.default, default);
                assert_eq!(copy.status, ResourceStatus::Processing);
            }
        }
    }

    #[test]
    fn test_derive_rejects_unsupported_and_bad_resize() {
        let relation = AttributeDescriptor::new(
            "author",
            AttributeType::Unsupported {
                type_name: "relationship".into(),
            },
        );
        assert!(matches!(
            derive_definition(&relation, "x", None, LIMIT),
            Err(Error::UnsupportedAttribute { .. })
        ));

        let email = AttributeDescriptor::new("email", AttributeType::Email);
        assert!(matches!(
            derive_definition(&email, "x", Some(10), LIMIT),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_clone_copies_values() {
        let store = MemoryStore::new().with_creation_polls(2);
        store.add_collection(CollectionDescriptor::new("users"));
        store
            .add_attribute("users", AttributeDescriptor::string("name", 20))
            .unwrap();
        store.insert_document("users", json!({ "name": "Ada" })).unwrap();
        let sparse = store.insert_document("users", json!({})).unwrap();
        store.remove_field("users", &sparse, "name").unwrap();
        let writes_before = store.document_writes();

        let config = MigrationConfig::default()
            .with_poll_interval(Duration::from_millis(1))
            .with_chunk_size(1);
        let written = AttributeCloner::new(&store, &config)
            .clone_attribute("users", "name", "users", "alias", None)
            .await
            .unwrap();

        assert_eq!(written, 1);
        assert_eq!(store.document_writes() - writes_before, 1);
        let documents = store.documents("users");
        assert_eq!(documents[0].get("alias"), Some(&json!("Ada")));
        assert_eq!(documents[1].get("alias"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_clone_unknown_source_has_reason() {
        let store = MemoryStore::new();
        store.add_collection(CollectionDescriptor::new("users"));
        let config = MigrationConfig::default();

        let err = AttributeCloner::new(&store, &config)
            .clone_attribute("users", "ghost", "users", "copy", None)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "attribute \"ghost\" not found: Unknown attribute \"ghost\""
        );
    }
}
