//! Migration engine.
//!
//! The store offers no rename, resize or reorder, and it completes attribute
//! and index changes asynchronously. This module composes its primitives into
//! those recipes:
//!
//! | Recipe | Steps | Indexes |
//! |--------|-------|---------|
//! | clone | create copy, copy values | reported, not replayed |
//! | rename | clone to temp, drop, clone to new, drop temp | rebuilt on the new name |
//! | resize | clone to temp with new size, drop, clone back, drop temp | lost |
//! | reorder | self-rename of every attribute in the target order | rebuilt |
//! | clone-collection | create, copy definitions and indexes, copy documents | copied |
//!
//! No recipe is transactional. A failure leaves the store in whatever state
//! the completed steps produced.
//!
//! # Example
//!
//! ```ignore
//! use dbtweak_core::{MemoryStore, MigrationConfig, MigrationPlanner};
//!
//! let planner = MigrationPlanner::new(&store, "users", MigrationConfig::default())?;
//! let report = planner.rename_attribute("name", "fullname").await?;
//! println!("{} documents rewritten", report.documents_updated);
//! ```

pub mod cloner;
pub mod cursor;
pub mod index;
pub mod plan;
pub mod planner;
pub mod wait;

pub use cloner::{derive_definition, AttributeCloner};
pub use cursor::DocumentCursor;
pub use index::IndexRegistry;
pub use plan::{AttributeRename, MigrationPlan, MigrationReport, MigrationStep, Recipe};
pub use planner::{reorder_sequence, MigrationPlanner};
pub use wait::Waiter;
