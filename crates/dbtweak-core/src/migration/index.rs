//! Index capture and replay.

use dbtweak_proto::{IndexDescriptor, ResourceKind};
use tracing::{debug, info};

use super::wait::Waiter;
use crate::config::MigrationConfig;
use crate::error::Result;
use crate::store::DocumentStore;

/// Finds the indexes touching an attribute and rebuilds them.
pub struct IndexRegistry<'a, S: ?Sized> {
    store: &'a S,
    config: &'a MigrationConfig,
}

impl<'a, S: DocumentStore + ?Sized> IndexRegistry<'a, S> {
    pub fn new(store: &'a S, config: &'a MigrationConfig) -> Self {
        Self { store, config }
    }

    /// Indexes of `collection` that cover `attribute`, in store order.
    pub async fn find_referencing(
        &self,
        collection: &str,
        attribute: &str,
    ) -> Result<Vec<IndexDescriptor>> {
        let indexes = self.store.list_indexes(collection).await?;
        Ok(indexes
            .into_iter()
            .filter(|index| index.references(attribute))
            .collect())
    }

    /// Recreate previously captured indexes, renaming one attribute on the
    /// way when `rename` is given.
    ///
    /// A still-present index is deleted first; one the store already dropped
    /// is not an error. Returns the number of indexes recreated.
    pub async fn rebuild(
        &self,
        collection: &str,
        captured: &[IndexDescriptor],
        rename: Option<(&str, &str)>,
    ) -> Result<usize> {
        let waiter = Waiter::new(self.store, self.config);

        for index in captured {
            match self.store.delete_index(collection, &index.key).await {
                Ok(()) => {
                    waiter
                        .wait_until_absent(collection, ResourceKind::Index, &index.key)
                        .await?
                }
                Err(e) if e.is_not_found() => {
                    debug!(collection, index = %index.key, "index already dropped")
                }
                Err(e) => return Err(e),
            }

            let replacement = match rename {
                Some((from, to)) => index.with_renamed_attribute(from, to),
                None => index.clone(),
            };
            self.create(collection, &replacement).await?;
            info!(
                collection,
                index = %replacement.key,
                attributes = ?replacement.attributes,
                "rebuilt index"
            );
        }

        Ok(captured.len())
    }

    /// Create an index and wait until it is available.
    pub async fn create(&self, collection: &str, index: &IndexDescriptor) -> Result<()> {
        self.store.create_index(collection, index).await?;
        Waiter::new(self.store, self.config)
            .wait_until_available(collection, ResourceKind::Index, &index.key)
            .await
    }
}
