//! Error types for remote store operations.

use thiserror::Error;

/// The error type for remote store operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The remote endpoint returned a transport-level failure (non-2xx or
    /// connectivity error). Propagated to callers unmodified; no retries
    /// happen at this layer.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code, or 0 when the request never reached the server.
        status: u16,
        /// Error message reported by the transport or the server.
        message: String,
    },

    /// A remote payload did not have the expected shape.
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for remote store operations.
pub type Result<T> = std::result::Result<T, Error>;
