//! Migration plans and execution reports.
//!
//! A plan is the ordered list of primitive steps implementing one recipe. It
//! is built from a fresh read of the store, can be shown without being run,
//! and carries no rollback information.

use dbtweak_proto::{CollectionDescriptor, IndexDescriptor};
use serde::Serialize;

/// User-facing recipe a plan implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Recipe {
    DeleteAttribute,
    CloneAttribute,
    ResizeAttribute,
    RenameAttribute,
    ReorderAttributes,
    CloneCollection,
    DeleteCollection,
}

impl std::fmt::Display for Recipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recipe::DeleteAttribute => write!(f, "delete-attribute"),
            Recipe::CloneAttribute => write!(f, "clone-attribute"),
            Recipe::ResizeAttribute => write!(f, "resize-attribute"),
            Recipe::RenameAttribute => write!(f, "rename-attribute"),
            Recipe::ReorderAttributes => write!(f, "reorder-attributes"),
            Recipe::CloneCollection => write!(f, "clone-collection"),
            Recipe::DeleteCollection => write!(f, "delete-collection"),
        }
    }
}

/// Attribute substitution applied while rebuilding indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeRename {
    pub from: String,
    pub to: String,
}

/// One primitive step. Steps address the plan's collection unless they name
/// a target collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum MigrationStep {
    /// Create `to` from the definition of `from` and copy the values.
    CloneAttribute {
        from: String,
        to: String,
        size: Option<u64>,
    },
    /// Poll until the attribute is available.
    WaitForAttribute { attribute: String },
    /// Delete the attribute and poll until it is gone.
    DeleteAttribute { attribute: String },
    /// Drop and recreate indexes captured before the recipe started.
    RebuildIndexes {
        indexes: Vec<IndexDescriptor>,
        rename: Option<AttributeRename>,
    },
    /// Create an empty collection.
    CreateCollection { collection: CollectionDescriptor },
    /// Reproduce an attribute definition in another collection, without
    /// values.
    CopyAttributeDefinition { attribute: String, target: String },
    /// Create an index in another collection.
    CreateIndex {
        index: IndexDescriptor,
        target: String,
    },
    /// Create a copy of every document in another collection under a fresh
    /// identity.
    CopyDocuments { target: String },
    /// Delete a whole collection without waiting.
    DeleteCollection { collection: String },
}

impl std::fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationStep::CloneAttribute { from, to, size } => {
                write!(f, "clone attribute \"{}\" into \"{}\"", from, to)?;
                if let Some(size) = size {
                    write!(f, " with size {}", size)?;
                }
                Ok(())
            }
            MigrationStep::WaitForAttribute { attribute } => {
                write!(f, "wait until attribute \"{}\" is available", attribute)
            }
            MigrationStep::DeleteAttribute { attribute } => {
                write!(f, "delete attribute \"{}\" and wait until it is gone", attribute)
            }
            MigrationStep::RebuildIndexes { indexes, rename } => {
                let keys: Vec<&str> = indexes.iter().map(|i| i.key.as_str()).collect();
                write!(f, "rebuild indexes [{}]", keys.join(", "))?;
                match rename {
                    Some(rename) if rename.from != rename.to => write!(
                        f,
                        " replacing \"{}\" with \"{}\"",
                        rename.from, rename.to
                    ),
                    _ => Ok(()),
                }
            }
            MigrationStep::CreateCollection { collection } => write!(
                f,
                "create collection \"{}\" (document security {})",
                collection.id,
                if collection.document_security { "on" } else { "off" }
            ),
            MigrationStep::CopyAttributeDefinition { attribute, target } => write!(
                f,
                "copy definition of attribute \"{}\" to collection \"{}\"",
                attribute, target
            ),
            MigrationStep::CreateIndex { index, target } => write!(
                f,
                "create {} index \"{}\" on [{}] in collection \"{}\"",
                index.index_type,
                index.key,
                index.attributes.join(", "),
                target
            ),
            MigrationStep::CopyDocuments { target } => {
                write!(f, "copy every document into collection \"{}\"", target)
            }
            MigrationStep::DeleteCollection { collection } => {
                write!(f, "delete collection \"{}\"", collection)
            }
        }
    }
}

/// The steps of one recipe against one collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationPlan {
    pub recipe: Recipe,
    pub collection: String,
    pub steps: Vec<MigrationStep>,
    /// Indexes on a cloned source; shown to the caller, never recreated.
    pub unreplayed_indexes: Vec<IndexDescriptor>,
    /// Observations made while planning.
    pub notes: Vec<String>,
}

impl MigrationPlan {
    fn new(recipe: Recipe, collection: &str, steps: Vec<MigrationStep>) -> Self {
        Self {
            recipe,
            collection: collection.to_string(),
            steps,
            unreplayed_indexes: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Attach planning notes.
    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn delete_attribute(collection: &str, name: &str) -> Self {
        Self::new(
            Recipe::DeleteAttribute,
            collection,
            vec![MigrationStep::DeleteAttribute {
                attribute: name.to_string(),
            }],
        )
    }

    /// Clone within one collection. Indexes on the source are reported only.
    pub fn clone_attribute(
        collection: &str,
        from: &str,
        to: &str,
        size: Option<u64>,
        source_indexes: Vec<IndexDescriptor>,
    ) -> Self {
        let mut plan = Self::new(
            Recipe::CloneAttribute,
            collection,
            vec![MigrationStep::CloneAttribute {
                from: from.to_string(),
                to: to.to_string(),
                size,
            }],
        );
        plan.unreplayed_indexes = source_indexes;
        plan
    }

    /// Clone to the temporary attribute with the new size, drop the original,
    /// clone back, drop the temporary attribute. Indexes are not rebuilt.
    pub fn resize_attribute(collection: &str, name: &str, size: u64, temp: &str) -> Self {
        Self::new(
            Recipe::ResizeAttribute,
            collection,
            vec![
                MigrationStep::CloneAttribute {
                    from: name.to_string(),
                    to: temp.to_string(),
                    size: Some(size),
                },
                MigrationStep::DeleteAttribute {
                    attribute: name.to_string(),
                },
                MigrationStep::CloneAttribute {
                    from: temp.to_string(),
                    to: name.to_string(),
                    size: None,
                },
                MigrationStep::DeleteAttribute {
                    attribute: temp.to_string(),
                },
            ],
        )
    }

    /// Rename through the temporary attribute, then rebuild the indexes that
    /// covered the old name.
    pub fn rename_attribute(
        collection: &str,
        old: &str,
        new: &str,
        temp: &str,
        indexes: Vec<IndexDescriptor>,
    ) -> Self {
        Self::new(
            Recipe::RenameAttribute,
            collection,
            rename_steps(old, new, temp, indexes),
        )
    }

    /// A self-rename for every attribute, in the given order. Each entry
    /// carries the indexes covering that attribute.
    pub fn reorder_attributes(
        collection: &str,
        sequence: Vec<(String, Vec<IndexDescriptor>)>,
        temp: &str,
    ) -> Self {
        let steps = sequence
            .into_iter()
            .flat_map(|(name, indexes)| rename_steps(&name, &name, temp, indexes))
            .collect();
        Self::new(Recipe::ReorderAttributes, collection, steps)
    }

    /// Create the target, reproduce every attribute and index, optionally
    /// copy the documents.
    pub fn clone_collection(
        source: &CollectionDescriptor,
        target: &str,
        attributes: &[String],
        indexes: &[IndexDescriptor],
        with_data: bool,
    ) -> Self {
        let mut steps = vec![MigrationStep::CreateCollection {
            collection: source.cloned_as(target),
        }];
        steps.extend(attributes.iter().map(|attribute| {
            MigrationStep::CopyAttributeDefinition {
                attribute: attribute.clone(),
                target: target.to_string(),
            }
        }));
        steps.extend(indexes.iter().map(|index| MigrationStep::CreateIndex {
            index: index.clone(),
            target: target.to_string(),
        }));
        if with_data {
            steps.push(MigrationStep::CopyDocuments {
                target: target.to_string(),
            });
        }
        Self::new(Recipe::CloneCollection, &source.id, steps)
    }

    pub fn delete_collection(collection: &str) -> Self {
        Self::new(
            Recipe::DeleteCollection,
            collection,
            vec![MigrationStep::DeleteCollection {
                collection: collection.to_string(),
            }],
        )
    }
}

fn rename_steps(
    old: &str,
    new: &str,
    temp: &str,
    indexes: Vec<IndexDescriptor>,
) -> Vec<MigrationStep> {
    let mut steps = vec![
        MigrationStep::CloneAttribute {
            from: old.to_string(),
            to: temp.to_string(),
            size: None,
        },
        MigrationStep::WaitForAttribute {
            attribute: temp.to_string(),
        },
        MigrationStep::DeleteAttribute {
            attribute: old.to_string(),
        },
        MigrationStep::CloneAttribute {
            from: temp.to_string(),
            to: new.to_string(),
            size: None,
        },
        MigrationStep::WaitForAttribute {
            attribute: new.to_string(),
        },
        MigrationStep::DeleteAttribute {
            attribute: temp.to_string(),
        },
    ];
    if !indexes.is_empty() {
        steps.push(MigrationStep::RebuildIndexes {
            indexes,
            rename: Some(AttributeRename {
                from: old.to_string(),
                to: new.to_string(),
            }),
        });
    }
    steps
}

/// Outcome of running (or dry-running) a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationReport {
    pub recipe: Recipe,
    pub collection: String,
    /// True when nothing was executed.
    pub dry_run: bool,
    /// Rendered plan steps.
    pub steps: Vec<String>,
    pub steps_executed: usize,
    pub total_steps: usize,
    pub documents_updated: u64,
    pub documents_created: u64,
    pub indexes_rebuilt: usize,
    pub unreplayed_indexes: Vec<IndexDescriptor>,
    pub notes: Vec<String>,
}

impl MigrationReport {
    /// Empty report for a plan, before any step has run.
    pub fn planned(plan: &MigrationPlan, dry_run: bool) -> Self {
        Self {
            recipe: plan.recipe,
            collection: plan.collection.clone(),
            dry_run,
            steps: plan.steps.iter().map(ToString::to_string).collect(),
            steps_executed: 0,
            total_steps: plan.steps.len(),
            documents_updated: 0,
            documents_created: 0,
            indexes_rebuilt: 0,
            unreplayed_indexes: plan.unreplayed_indexes.clone(),
            notes: plan.notes.clone(),
        }
    }

    /// Whether every step ran.
    pub fn is_complete(&self) -> bool {
        !self.dry_run && self.steps_executed == self.total_steps
    }
}
