//! Action execution.

use crate::commands::Action;
use crate::formatter::Formatter;
use dbtweak_core::{DocumentStore, MigrationPlanner};
use thiserror::Error;

/// Execution errors.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// A recipe or listing failed.
    #[error(transparent)]
    Migration(#[from] dbtweak_core::Error),

    /// The client could not be built.
    #[error(transparent)]
    Client(#[from] dbtweak_client::Error),
}

/// Execute an action and return formatted output.
pub async fn execute<S: DocumentStore + ?Sized>(
    planner: &MigrationPlanner<'_, S>,
    action: &Action,
    formatter: &dyn Formatter,
) -> Result<String, ExecuteError> {
    let output = match action {
        Action::List => formatter.format_attributes(&planner.attributes().await?),
        Action::Indexes => formatter.format_indexes(&planner.indexes().await?),
        Action::Clone {
            name,
            clone_name,
            new_size,
        } => {
            let report = planner
                .clone_attribute(name, clone_name, *new_size)
                .await?;
            formatter.format_report(&report)
        }
        Action::Resize { name, new_size } => {
            formatter.format_report(&planner.resize_attribute(name, *new_size).await?)
        }
        Action::Rename { name, new_name } => {
            formatter.format_report(&planner.rename_attribute(name, new_name).await?)
        }
        Action::Delete { name } => formatter.format_report(&planner.delete_attribute(name).await?),
        Action::Reorder { names } => {
            formatter.format_report(&planner.reorder_attributes(names).await?)
        }
        Action::CloneCollection { new_id, with_data } => {
            formatter.format_report(&planner.clone_collection(new_id, *with_data).await?)
        }
        Action::DeleteCollection => formatter.format_report(&planner.delete_collection().await?),
    };
    Ok(output)
}
