//! Error types for the Compute Engine provider.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by the Compute Engine provider.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum GceError {
    /// Raised when the fleet configuration is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when an HTTP request cannot be completed.
    #[error("http error: {message}")]
    Http {
        /// Message reported by the HTTP client.
        message: String,
    },
    /// Raised when the API answers with a failure status.
    #[error("{operation} failed with status {status}: {message}")]
    Api {
        /// Operation being performed.
        operation: String,
        /// HTTP status code returned by the API.
        status: u16,
        /// Response body, as returned.
        message: String,
    },
    /// Raised when a response body cannot be decoded.
    #[error("could not decode {operation} response: {message}")]
    Decode {
        /// Operation being performed.
        operation: String,
        /// Decoder error message.
        message: String,
    },
    /// Raised when an instance never becomes running with a public address.
    #[error("instance {name} did not become reachable in time")]
    Unreachable {
        /// Name of the instance being waited on.
        name: String,
    },
}

impl From<ConfigError> for GceError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}
