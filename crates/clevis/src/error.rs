//! Error types for the mutation engine.

use thiserror::Error;

/// Errors raised by the work item mutation engine.
///
/// Local validation errors (`InvalidArgument`, `MissingOwnerContext`) are
/// raised synchronously before any remote write occurs. Remote transport
/// failures are wrapped unmodified in `Remote`. Business-rule rejections
/// are never errors; they surface as diagnostics on a normal response.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid argument value provided by the caller.
    #[error("Invalid {field}: '{value}'. {expected}")]
    InvalidArgument {
        /// The argument name that had an invalid value.
        field: &'static str,
        /// The invalid value that was provided.
        value: String,
        /// Description of what was expected.
        expected: &'static str,
    },

    /// The owning project could not be supplied or derived.
    ///
    /// Creation requires an owner context; when it is not given explicitly
    /// it is derived from the parent's canonical URL. If both fail, the
    /// mutation aborts before submission.
    #[error("No project supplied and none could be derived from the parent work item URL")]
    MissingOwnerContext,

    /// A remote call failed. Propagated unmodified, no local retry.
    #[error("Remote error: {0}")]
    Remote(#[from] clevis_remote::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Required-fields policy document could not be read or parsed.
    #[error("Policy error: {0}")]
    Policy(String),
}

/// A specialized Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
