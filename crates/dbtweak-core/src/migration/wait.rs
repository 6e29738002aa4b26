//! Polling until an asynchronous schema change completes.

use std::time::Duration;

use dbtweak_proto::{ResourceKind, ResourceStatus};
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config::MigrationConfig;
use crate::error::{Error, Result};
use crate::store::DocumentStore;

/// Polls attribute and index status at a fixed interval.
pub struct Waiter<'a, S: ?Sized> {
    store: &'a S,
    poll_interval: Duration,
    deadline: Option<Duration>,
}

impl<'a, S: DocumentStore + ?Sized> Waiter<'a, S> {
    /// Create a waiter using the configured interval and deadline.
    pub fn new(store: &'a S, config: &MigrationConfig) -> Self {
        Self {
            store,
            poll_interval: config.poll_interval,
            deadline: config.wait_deadline,
        }
    }

    /// Block until the resource reports `available`.
    ///
    /// A `failed` or `stuck` status aborts with [`Error::CreationFailed`].
    /// Errors from the store, not-found included, are propagated.
    pub async fn wait_until_available(
        &self,
        collection: &str,
        kind: ResourceKind,
        name: &str,
    ) -> Result<()> {
        let started = Instant::now();
        loop {
            let status = self.status(collection, kind, name).await?;
            if status.is_failure() {
                return Err(Error::CreationFailed {
                    kind,
                    name: name.to_string(),
                });
            }
            if status.is_available() {
                debug!(%kind, resource = name, "available");
                return Ok(());
            }

            debug!(%kind, resource = name, %status, "waiting for completion");
            self.pause(started, kind, name).await?;
        }
    }

    /// Block until the store answers not-found for the resource.
    ///
    /// Any reported status, even a failure, means the deletion is still in
    /// progress. Errors other than not-found are propagated.
    pub async fn wait_until_absent(
        &self,
        collection: &str,
        kind: ResourceKind,
        name: &str,
    ) -> Result<()> {
        let started = Instant::now();
        loop {
            match self.status(collection, kind, name).await {
                Err(e) if e.is_not_found() => {
                    debug!(%kind, resource = name, "gone");
                    return Ok(());
                }
                Err(e) => return Err(e),
                Ok(status) => {
                    debug!(%kind, resource = name, %status, "waiting for deletion");
                    self.pause(started, kind, name).await?;
                }
            }
        }
    }

    async fn status(
        &self,
        collection: &str,
        kind: ResourceKind,
        name: &str,
    ) -> Result<ResourceStatus> {
        match kind {
            ResourceKind::Attribute => Ok(self.store.get_attribute(collection, name).await?.status),
            ResourceKind::Index => Ok(self.store.get_index(collection, name).await?.status),
            // Collections are usable as soon as the create call returns.
            ResourceKind::Collection | ResourceKind::Document => Err(Error::InvalidArgument(
                format!("a {} has no completion status", kind),
            )),
        }
    }

    async fn pause(&self, started: Instant, kind: ResourceKind, name: &str) -> Result<()> {
        if let Some(deadline) = self.deadline {
            let waited = started.elapsed();
            if waited >= deadline {
                return Err(Error::Timeout {
                    kind,
                    name: name.to_string(),
                    waited,
                });
            }
        }
        sleep(self.poll_interval).await;
        Ok(())
    }
}
