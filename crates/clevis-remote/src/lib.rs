//! Remote entity-store facade for the clevis work item engine.
//!
//! This crate defines the narrow surface through which the mutation engine
//! talks to a remote, patch-oriented project-management store:
//!
//! - [`RemoteStore`]: the async facade trait (lookups + patch submission)
//! - [`PatchOperation`]: the JSON-Patch-shaped wire operation
//! - [`PatchOutcome`]: the discriminated response envelope separating
//!   success, transport errors, and embedded rule-validation failures
//! - payload projections ([`WorkItem`], [`FieldMetadata`], [`Picklist`])
//!
//! Transport concerns (authentication, retries/backoff, TLS) belong to the
//! host application's `RemoteStore` implementation, not to this crate.

#![forbid(unsafe_code)]

pub mod envelope;
pub mod error;
pub mod model;
pub mod store;

pub use envelope::{PatchOutcome, RuleValidationError};
pub use error::{Error, Result};
pub use model::{
    FieldMetadata, PatchOp, PatchOperation, PatchTarget, Picklist, SubmitFlags, WorkItem,
};
pub use store::RemoteStore;

#[cfg(any(test, feature = "test-util"))]
pub use store::{CallCounts, MockRemote};
