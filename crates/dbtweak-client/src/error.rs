//! Client error types.

use dbtweak_proto::ResourceKind;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Request could not be sent or its response not read.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("api error {code}{}: {message}", .kind.as_ref().map(|k| format!(" ({})", k)).unwrap_or_default())]
    Api {
        /// HTTP status code.
        code: u16,
        /// Error type reported by the API, e.g. `attribute_not_found`.
        kind: Option<String>,
        /// Error message reported by the API.
        message: String,
    },

    /// A success response had an unexpected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Missing or invalid client settings.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Convert into an engine error, naming the resource the request was
    /// addressing so that a 404 becomes a typed not-found.
    pub fn into_store_error(self, kind: ResourceKind, name: &str) -> dbtweak_core::Error {
        match self {
            Error::Api { code: 404, .. } => dbtweak_core::Error::not_found(kind, name),
            Error::Api { code, message, .. } => dbtweak_core::Error::Store { code, message },
            Error::Http(e) => dbtweak_core::Error::Transport(e.to_string()),
            Error::Decode(e) => {
                dbtweak_core::Error::Transport(format!("invalid response: {}", e))
            }
            Error::Config(message) => dbtweak_core::Error::InvalidArgument(message),
        }
    }
}
