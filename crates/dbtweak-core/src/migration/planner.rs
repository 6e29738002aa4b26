//! Recipe planning and execution.
//!
//! Every recipe is planned from a fresh read of the store, checked before
//! anything destructive happens, and then executed step by step. A failing
//! step aborts the recipe; completed steps are not undone.

use std::cmp::Ordering;

use dbtweak_proto::{AttributeDescriptor, IndexDescriptor, ResourceKind};
use tracing::{debug, error, info};

use super::cloner::{derive_definition, AttributeCloner};
use super::cursor::DocumentCursor;
use super::index::IndexRegistry;
use super::plan::{MigrationPlan, MigrationReport, MigrationStep};
use super::wait::Waiter;
use crate::config::MigrationConfig;
use crate::error::{Error, Result};
use crate::store::DocumentStore;

/// Sort key placing requested attributes first, in requested order, and the
/// others after them in their original order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ReorderKey {
    unrequested: bool,
    requested_position: usize,
    original_position: usize,
}

impl ReorderKey {
    fn new(name: &str, original_position: usize, requested: &[String]) -> Self {
        match requested.iter().position(|r| r == name) {
            Some(position) => Self {
                unrequested: false,
                requested_position: position,
                original_position,
            },
            None => Self {
                unrequested: true,
                requested_position: 0,
                original_position,
            },
        }
    }
}

/// Total order used by the reorder recipe.
fn compare_for_reorder(a: &ReorderKey, b: &ReorderKey) -> Ordering {
    a.cmp(b)
}

/// Order in which `current` attributes are recreated so that `requested`
/// ones come first.
pub fn reorder_sequence(current: &[String], requested: &[String]) -> Vec<String> {
    let mut keyed: Vec<(ReorderKey, &String)> = current
        .iter()
        .enumerate()
        .map(|(position, name)| (ReorderKey::new(name, position, requested), name))
        .collect();
    keyed.sort_by(|a, b| compare_for_reorder(&a.0, &b.0));
    keyed.into_iter().map(|(_, name)| name.clone()).collect()
}

/// Composes the store primitives into recipes against one collection.
pub struct MigrationPlanner<'a, S: ?Sized> {
    store: &'a S,
    collection: String,
    config: MigrationConfig,
}

impl<'a, S: DocumentStore + ?Sized> MigrationPlanner<'a, S> {
    /// Create a planner. The configuration is validated once here.
    pub fn new(
        store: &'a S,
        collection: impl Into<String>,
        config: MigrationConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            collection: collection.into(),
            config,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Current attributes, in schema order.
    pub async fn attributes(&self) -> Result<Vec<AttributeDescriptor>> {
        self.store.list_attributes(&self.collection).await
    }

    /// Current indexes, in store order.
    pub async fn indexes(&self) -> Result<Vec<IndexDescriptor>> {
        self.store.list_indexes(&self.collection).await
    }

    // ---- recipes ------------------------------------------------------

    pub async fn delete_attribute(&self, name: &str) -> Result<MigrationReport> {
        let plan = self.plan_delete_attribute(name).await?;
        self.run(&plan).await
    }

    /// Clone within the collection. Indexes on the source are listed in the
    /// report but not recreated for the clone.
    pub async fn clone_attribute(
        &self,
        from: &str,
        to: &str,
        size: Option<u64>,
    ) -> Result<MigrationReport> {
        let plan = self.plan_clone_attribute(from, to, size).await?;
        self.run(&plan).await
    }

    /// Change the maximum length of a string attribute. Indexes covering it
    /// are lost.
    pub async fn resize_attribute(&self, name: &str, size: u64) -> Result<MigrationReport> {
        let plan = self.plan_resize_attribute(name, size).await?;
        self.run(&plan).await
    }

    pub async fn rename_attribute(&self, old: &str, new: &str) -> Result<MigrationReport> {
        let plan = self.plan_rename_attribute(old, new).await?;
        self.run(&plan).await
    }

    pub async fn reorder_attributes(&self, requested: &[String]) -> Result<MigrationReport> {
        let plan = self.plan_reorder_attributes(requested).await?;
        self.run(&plan).await
    }

    pub async fn clone_collection(
        &self,
        target: &str,
        with_data: bool,
    ) -> Result<MigrationReport> {
        let plan = self.plan_clone_collection(target, with_data).await?;
        self.run(&plan).await
    }

    pub async fn delete_collection(&self) -> Result<MigrationReport> {
        let plan = self.plan_delete_collection().await?;
        self.run(&plan).await
    }

    // ---- planning -----------------------------------------------------

    pub async fn plan_delete_attribute(&self, name: &str) -> Result<MigrationPlan> {
        let attributes = self.attributes().await?;
        find_attribute(&attributes, name)?;
        Ok(MigrationPlan::delete_attribute(&self.collection, name))
    }

    pub async fn plan_clone_attribute(
        &self,
        from: &str,
        to: &str,
        size: Option<u64>,
    ) -> Result<MigrationPlan> {
        let attributes = self.attributes().await?;
        let source = find_attribute(&attributes, from)?;
        check_size(size)?;
        derive_definition(source, to, size, self.config.integer_bound_limit)?;
        if attributes.iter().any(|a| a.key == to) {
            return Err(Error::InvalidArgument(format!(
                "attribute \"{}\" already exists",
                to
            )));
        }

        let source_indexes = IndexRegistry::new(self.store, &self.config)
            .find_referencing(&self.collection, from)
            .await?;
        Ok(MigrationPlan::clone_attribute(
            &self.collection,
            from,
            to,
            size,
            source_indexes,
        ))
    }

    pub async fn plan_resize_attribute(&self, name: &str, size: u64) -> Result<MigrationPlan> {
        let attributes = self.attributes().await?;
        self.check_temp_free(&attributes, &[name])?;
        let source = find_attribute(&attributes, name)?;
        check_size(Some(size))?;
        if !source.attribute_type.is_sized_string() {
            return Err(Error::InvalidArgument(format!(
                "cannot resize attribute \"{}\" of type {}: size only applies to strings",
                name,
                source.attribute_type.label()
            )));
        }

        Ok(MigrationPlan::resize_attribute(
            &self.collection,
            name,
            size,
            &self.config.temp_attribute,
        ))
    }

    pub async fn plan_rename_attribute(&self, old: &str, new: &str) -> Result<MigrationPlan> {
        let attributes = self.attributes().await?;
        self.check_temp_free(&attributes, &[old, new])?;
        let source = find_attribute(&attributes, old)?;
        derive_definition(source, new, None, self.config.integer_bound_limit)?;
        if old != new && attributes.iter().any(|a| a.key == new) {
            return Err(Error::InvalidArgument(format!(
                "attribute \"{}\" already exists",
                new
            )));
        }

        let indexes = IndexRegistry::new(self.store, &self.config)
            .find_referencing(&self.collection, old)
            .await?;
        Ok(MigrationPlan::rename_attribute(
            &self.collection,
            old,
            new,
            &self.config.temp_attribute,
            indexes,
        ))
    }

    pub async fn plan_reorder_attributes(&self, requested: &[String]) -> Result<MigrationPlan> {
        if requested.is_empty() {
            return Err(Error::InvalidArgument(
                "reorder needs at least one attribute name".to_string(),
            ));
        }

        let attributes = self.attributes().await?;
        let requested_refs: Vec<&str> = requested.iter().map(String::as_str).collect();
        self.check_temp_free(&attributes, &requested_refs)?;
        for attribute in &attributes {
            derive_definition(
                attribute,
                &attribute.key,
                None,
                self.config.integer_bound_limit,
            )?;
        }

        let current: Vec<String> = attributes.iter().map(|a| a.key.clone()).collect();
        let notes: Vec<String> = requested
            .iter()
            .filter(|name| !current.contains(name))
            .map(|name| format!("ignoring unknown attribute \"{}\"", name))
            .collect();

        let indexes = self.indexes().await?;
        let sequence = reorder_sequence(&current, requested)
            .into_iter()
            .map(|name| {
                let covering = indexes
                    .iter()
                    .filter(|index| index.references(&name))
                    .cloned()
                    .collect();
                (name, covering)
            })
            .collect();

        Ok(MigrationPlan::reorder_attributes(
            &self.collection,
            sequence,
            &self.config.temp_attribute,
        )
        .with_notes(notes))
    }

    pub async fn plan_clone_collection(
        &self,
        target: &str,
        with_data: bool,
    ) -> Result<MigrationPlan> {
        if target == self.collection {
            return Err(Error::InvalidArgument(
                "a collection cannot be cloned onto itself".to_string(),
            ));
        }
        match self.store.get_collection(target).await {
            Ok(_) => {
                return Err(Error::InvalidArgument(format!(
                    "collection \"{}\" already exists",
                    target
                )))
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let source = self.store.get_collection(&self.collection).await?;
        let attributes = self.attributes().await?;
        for attribute in &attributes {
            derive_definition(
                attribute,
                &attribute.key,
                None,
                self.config.integer_bound_limit,
            )?;
        }
        let keys: Vec<String> = attributes.into_iter().map(|a| a.key).collect();
        let indexes = self.indexes().await?;

        Ok(MigrationPlan::clone_collection(
            &source, target, &keys, &indexes, with_data,
        ))
    }

    pub async fn plan_delete_collection(&self) -> Result<MigrationPlan> {
        self.store.get_collection(&self.collection).await?;
        Ok(MigrationPlan::delete_collection(&self.collection))
    }

    fn check_temp_free(&self, attributes: &[AttributeDescriptor], names: &[&str]) -> Result<()> {
        let temp = self.config.temp_attribute.as_str();
        if names.contains(&temp) {
            return Err(Error::InvalidArgument(format!(
                "\"{}\" is reserved as the temporary attribute name",
                temp
            )));
        }
        if attributes.iter().any(|a| a.key == temp) {
            return Err(Error::InvalidArgument(format!(
                "temporary attribute \"{}\" already exists in collection \"{}\"; \
                 a previous run may have been interrupted",
                temp, self.collection
            )));
        }
        Ok(())
    }

    // ---- execution ----------------------------------------------------

    /// Execute a plan, or only describe it in dry-run mode.
    ///
    /// On failure the step number is logged and the original error returned;
    /// the store keeps whatever state the completed steps produced.
    pub async fn run(&self, plan: &MigrationPlan) -> Result<MigrationReport> {
        let mut report = MigrationReport::planned(plan, self.config.dry_run);
        let total = plan.steps.len();

        if self.config.dry_run {
            info!(
                recipe = %plan.recipe,
                collection = %plan.collection,
                steps = total,
                "dry run, nothing executed"
            );
            return Ok(report);
        }

        info!(recipe = %plan.recipe, collection = %plan.collection, steps = total, "starting migration");
        for (idx, step) in plan.steps.iter().enumerate() {
            let number = idx + 1;
            info!(collection = %plan.collection, step = number, total, "{}", step);

            if let Err(e) = self.execute_step(&plan.collection, step, &mut report).await {
                error!(
                    recipe = %plan.recipe,
                    collection = %plan.collection,
                    step = number,
                    total,
                    error = %e,
                    "migration step failed, completed steps are not undone"
                );
                return Err(e);
            }
            report.steps_executed += 1;
        }

        info!(
            recipe = %plan.recipe,
            collection = %plan.collection,
            documents_updated = report.documents_updated,
            documents_created = report.documents_created,
            indexes_rebuilt = report.indexes_rebuilt,
            "migration complete"
        );
        Ok(report)
    }

    async fn execute_step(
        &self,
        collection: &str,
        step: &MigrationStep,
        report: &mut MigrationReport,
    ) -> Result<()> {
        let cloner = AttributeCloner::new(self.store, &self.config);
        let registry = IndexRegistry::new(self.store, &self.config);
        let waiter = Waiter::new(self.store, &self.config);

        match step {
            MigrationStep::CloneAttribute { from, to, size } => {
                report.documents_updated += cloner
                    .clone_attribute(collection, from, collection, to, *size)
                    .await?;
            }
            MigrationStep::WaitForAttribute { attribute } => {
                waiter
                    .wait_until_available(collection, ResourceKind::Attribute, attribute)
                    .await?;
            }
            MigrationStep::DeleteAttribute { attribute } => {
                self.store.delete_attribute(collection, attribute).await?;
                waiter
                    .wait_until_absent(collection, ResourceKind::Attribute, attribute)
                    .await?;
            }
            MigrationStep::RebuildIndexes { indexes, rename } => {
                let rename = rename.as_ref().map(|r| (r.from.as_str(), r.to.as_str()));
                report.indexes_rebuilt += registry.rebuild(collection, indexes, rename).await?;
            }
            MigrationStep::CreateCollection { collection: target } => {
                self.store.create_collection(target).await?;
            }
            MigrationStep::CopyAttributeDefinition { attribute, target } => {
                cloner
                    .clone_attribute(collection, attribute, target, attribute, None)
                    .await?;
            }
            MigrationStep::CreateIndex { index, target } => {
                registry.create(target, index).await?;
            }
            MigrationStep::CopyDocuments { target } => {
                report.documents_created += self.copy_documents(collection, target).await?;
            }
            MigrationStep::DeleteCollection { collection: target } => {
                self.store.delete_collection(target).await?;
            }
        }
        Ok(())
    }

    /// Recreate every document of `source` in `target`, stripped of the
    /// store-managed fields so the target assigns new identities.
    async fn copy_documents(&self, source: &str, target: &str) -> Result<u64> {
        let mut cursor = DocumentCursor::open(self.store, source, self.config.chunk_size).await?;
        let total = cursor.total();
        let mut created = 0u64;

        while let Some(batch) = cursor.next_batch().await? {
            for document in batch {
                self.store
                    .create_document(target, None, document.user_fields())
                    .await?;
                created += 1;
            }
            debug!(collection = source, destination = target, created, total, "copied document batch");
        }
        Ok(created)
    }
}

fn find_attribute<'b>(
    attributes: &'b [AttributeDescriptor],
    name: &str,
) -> Result<&'b AttributeDescriptor> {
    attributes
        .iter()
        .find(|a| a.key == name)
        .ok_or_else(|| {
            Error::not_found(ResourceKind::Attribute, name)
                .with_reason(format!("Unknown attribute \"{}\"", name))
        })
}

fn check_size(size: Option<u64>) -> Result<()> {
    match size {
        Some(0) => Err(Error::InvalidArgument(
            "size must be greater than zero".to_string(),
        )),
        _ => Ok(()),
    }
}
