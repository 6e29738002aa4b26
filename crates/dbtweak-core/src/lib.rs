//! dbtweak core - schema migrations for a remote document store.
//!
//! This crate provides the migration engine: the [`DocumentStore`] interface
//! it drives, the polling, paging, cloning and index-rebuilding building
//! blocks, and the [`MigrationPlanner`] recipes composed from them.

pub mod config;
pub mod error;
pub mod migration;
pub mod store;

pub use config::MigrationConfig;
pub use error::{Error, Result};
pub use migration::{
    AttributeCloner, DocumentCursor, IndexRegistry, MigrationPlan, MigrationPlanner,
    MigrationReport, MigrationStep, Recipe, Waiter,
};
pub use store::{DocumentStore, MemoryStore};

/// Re-export data model types.
pub use dbtweak_proto as proto;
