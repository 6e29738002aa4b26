//! dbtweak client - REST transport for an Appwrite-compatible databases API.
//!
//! The [`Client`] implements [`dbtweak_core::DocumentStore`], so any recipe of
//! the migration engine can run against a live database.
//!
//! # Quick Start
//!
//! ```ignore
//! use dbtweak_client::{Client, ClientConfig};
//! use dbtweak_core::DocumentStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(ClientConfig::new("my-project", "api-key", "main"))?;
//!
//!     for attribute in client.list_attributes("users").await? {
//!         println!("{} ({})", attribute.key, attribute.attribute_type.label());
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod wire;

pub use client::Client;
pub use config::ClientConfig;
pub use error::Error;

/// Re-export data model types.
pub use dbtweak_proto as proto;
