//! Client configuration.

use std::time::Duration;

use crate::error::Error;

/// Default API endpoint of a local installation.
pub const DEFAULT_ENDPOINT: &str = "http://localhost/v1";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// API endpoint, e.g. "https://cloud.example.com/v1".
    pub endpoint: String,

    /// Project identifier sent with every request.
    pub project: String,

    /// Server API key.
    pub api_key: String,

    /// Database holding the collections.
    pub database: String,

    /// Request timeout.
    pub timeout: Duration,

    /// Accept self-signed TLS certificates.
    pub self_signed: bool,
}

impl ClientConfig {
    /// Create a configuration for the default endpoint.
    pub fn new(
        project: impl Into<String>,
        api_key: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            project: project.into(),
            api_key: api_key.into(),
            database: database.into(),
            timeout: DEFAULT_TIMEOUT,
            self_signed: false,
        }
    }

    /// Set the API endpoint. A trailing slash is ignored.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Accept self-signed certificates.
    pub fn with_self_signed(mut self, self_signed: bool) -> Self {
        self.self_signed = self_signed;
        self
    }

    /// Check that every credential is present.
    pub fn validate(&self) -> Result<(), Error> {
        let missing: Vec<&str> = [
            ("endpoint", &self.endpoint),
            ("project", &self.project),
            ("API key", &self.api_key),
            ("database", &self.database),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!("missing {}", missing.join(", "))))
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("", "", "")
    }
}

// The API key stays out of logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("project", &self.project)
            .field("api_key", &"<redacted>")
            .field("database", &self.database)
            .field("timeout", &self.timeout)
            .field("self_signed", &self.self_signed)
            .finish()
    }
}
