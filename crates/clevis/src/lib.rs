//! Clevis: a work item mutation and diagnostic engine.
//!
//! Clevis turns high-level creation/update requests into ordered JSON-Patch
//! documents for a remote project-management store, resolves implicit
//! values (parent-inherited classification paths, cross-entity relations,
//! type coercion), and submits the patch. When the store rejects values
//! against server-side business rules, it reconstructs a human-readable
//! diagnostic report from field-metadata, picklist, and state-machine
//! lookups, memoized per call.
//!
//! # Architecture
//!
//! The engine talks to the remote store exclusively through the
//! [`clevis_remote::RemoteStore`] facade; transport concerns live in the
//! host application's implementation. The pipeline for one mutation:
//!
//! ```text
//! patch assembly -> parent inheritance -> relation linking
//!     -> submission -> (on embedded rule failures) diagnostics
//! ```
//!
//! The required-fields policy and the value coercer are consulted by the
//! assembly and diagnostic stages.

#![forbid(unsafe_code)]

pub mod coerce;
pub mod diagnostics;
pub mod domain;
pub mod engine;
pub mod error;
pub mod inherit;
pub mod patch;
pub mod policy;
pub mod relations;
pub mod submit;

pub use domain::{CreateWorkItemRequest, EnrichedResponse, UpdateWorkItemRequest};
pub use engine::WorkItemEngine;
pub use error::{Error, Result};
pub use policy::RequiredFieldsPolicy;
