//! Actions accepted on the command line.

use clap::Subcommand;

/// One schema action on the selected collection.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// List attributes with their type, constraints and status
    List,

    /// List indexes with their attributes and sort orders
    Indexes,

    /// Copy an attribute and its values into a new attribute
    Clone {
        /// Attribute to copy
        name: String,
        /// Name of the copy
        clone_name: String,
        /// New size for a string attribute
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        new_size: Option<u64>,
    },

    /// Change the size of a string attribute, keeping its values
    Resize {
        /// Attribute to resize
        name: String,
        /// New size
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        new_size: u64,
    },

    /// Rename an attribute, keeping its values and indexes
    Rename {
        /// Attribute to rename
        name: String,
        /// New name
        new_name: String,
    },

    /// Delete an attribute and wait until it is gone
    Delete {
        /// Attribute to delete
        name: String,
    },

    /// Recreate attributes so the named ones come first, in the given order
    Reorder {
        /// Attributes to move to the front
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Copy the collection definition, and optionally its documents
    CloneCollection {
        /// Identifier of the new collection
        new_id: String,
        /// Also copy every document
        #[arg(long)]
        with_data: bool,
    },

    /// Delete the collection
    DeleteCollection,
}

impl Action {
    /// Whether the action only reads the store.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Action::List | Action::Indexes)
    }
}
