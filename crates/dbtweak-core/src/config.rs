//! Migration configuration.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default name of the temporary attribute used by rename and resize.
pub const DEFAULT_TEMP_ATTRIBUTE: &str = "tmp___";

/// Default number of documents fetched per page.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Default delay between two status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Integer bounds beyond this magnitude are reported by the store as
/// sentinels it then refuses on creation; they are replaced by "no bound".
pub const DEFAULT_INTEGER_BOUND_LIMIT: i64 = 999_999_999_999_999;

/// Settings for one migration run.
///
/// Passed explicitly into the planner so that independent runs never share
/// state.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationConfig {
    /// Temporary attribute name. Two runs on the same collection sharing this
    /// name will corrupt each other.
    pub temp_attribute: String,
    /// Documents per page when copying values.
    pub chunk_size: usize,
    /// Delay between two status polls.
    pub poll_interval: Duration,
    /// Give up waiting after this long. `None` waits forever.
    pub wait_deadline: Option<Duration>,
    /// Magnitude above which integer bounds are dropped when cloning.
    pub integer_bound_limit: i64,
    /// Plan only, do not touch the store.
    pub dry_run: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            temp_attribute: DEFAULT_TEMP_ATTRIBUTE.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            wait_deadline: None,
            integer_bound_limit: DEFAULT_INTEGER_BOUND_LIMIT,
            dry_run: false,
        }
    }
}

impl MigrationConfig {
    /// Set the temporary attribute name.
    pub fn with_temp_attribute(mut self, name: impl Into<String>) -> Self {
        self.temp_attribute = name.into();
        self
    }

    /// Set the page size used when iterating documents.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the delay between status polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Bound every wait loop.
    pub fn with_wait_deadline(mut self, deadline: Duration) -> Self {
        self.wait_deadline = Some(deadline);
        self
    }

    /// Set the integer bound limit.
    pub fn with_integer_bound_limit(mut self, limit: i64) -> Self {
        self.integer_bound_limit = limit;
        self
    }

    /// Enable or disable dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reject settings that would make a recipe loop or misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidArgument(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.temp_attribute.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "temporary attribute name must not be empty".to_string(),
            ));
        }
        if self.integer_bound_limit <= 0 {
            return Err(Error::InvalidArgument(
                "integer bound limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
