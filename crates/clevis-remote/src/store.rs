//! The remote entity-store facade.
//!
//! This module defines the narrow trait through which the mutation engine
//! talks to the remote project-management service. Transport concerns
//! (authentication, retries, TLS) live in the host application's
//! implementation, not here.
//!
//! # Test Utilities
//!
//! A configurable [`MockRemote`] implementation is available for testing
//! code that depends on the [`RemoteStore`] trait. Enable the `test-util`
//! feature to use it from downstream crates:
//!
//! ```toml
//! [dev-dependencies]
//! clevis-remote = { version = "...", features = ["test-util"] }
//! ```

use crate::envelope::PatchOutcome;
use crate::error::Result;
use crate::model::{FieldMetadata, PatchOperation, PatchTarget, Picklist, SubmitFlags, WorkItem};
use async_trait::async_trait;

/// Narrow facade over the remote entity store.
///
/// The trait is object-safe and `Send + Sync` so the engine can hold it as
/// `Arc<dyn RemoteStore>`. Every method is one blocking-equivalent remote
/// call; implementations must not retry on their own, so the engine's
/// call-count guarantees (per-call lookup memoization) stay observable.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch a work item by id, restricted to the given field references.
    ///
    /// An empty `fields` slice requests only the identity projection
    /// (id and canonical URL).
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` when the item does not exist or the call fails.
    async fn fetch_work_item(&self, id: u64, fields: &[&str]) -> Result<WorkItem>;

    /// Fetch the field summary scoped to a work item type.
    ///
    /// Authoritative for the type's configured fields; takes precedence
    /// over [`fetch_global_field`](Self::fetch_global_field) results.
    async fn fetch_type_fields(&self, type_name: &str) -> Result<Vec<FieldMetadata>>;

    /// Fetch a single field definition from the organization-wide list.
    ///
    /// Fallback lookup for fields absent from the type-scoped summary.
    async fn fetch_global_field(&self, reference_name: &str) -> Result<FieldMetadata>;

    /// Fetch the items of a picklist by id.
    async fn fetch_picklist(&self, picklist_id: &str) -> Result<Picklist>;

    /// Fetch the valid state names for a work item type.
    async fn fetch_type_states(&self, type_name: &str) -> Result<Vec<String>>;

    /// Submit a patch document, creating or updating per `target`.
    ///
    /// `flags` become query parameters on the call. The returned outcome
    /// is already classified into success / transport error / soft failure
    /// (see [`PatchOutcome::classify`]).
    async fn submit_patch(
        &self,
        target: PatchTarget,
        ops: &[PatchOperation],
        flags: SubmitFlags,
    ) -> Result<PatchOutcome>;
}

// ========== Test Utilities ==========

#[cfg(any(test, feature = "test-util"))]
pub use mock::{CallCounts, MockRemote};

#[cfg(any(test, feature = "test-util"))]
mod mock {
    use super::{
        FieldMetadata, PatchOperation, PatchOutcome, PatchTarget, Picklist, RemoteStore, Result,
        SubmitFlags, WorkItem,
    };
    use crate::error::Error;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Number of calls made against each [`MockRemote`] method.
    ///
    /// Used by tests to assert the engine's per-call memoization: e.g. the
    /// type-scoped field summary must be fetched at most once per
    /// enrichment pass regardless of how many failures reference it.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    #[allow(missing_docs)]
    pub struct CallCounts {
        pub fetch_work_item: usize,
        pub fetch_type_fields: usize,
        pub fetch_global_field: usize,
        pub fetch_picklist: usize,
        pub fetch_type_states: usize,
        pub submit_patch: usize,
    }

    #[derive(Debug, Default)]
    struct MockInner {
        work_items: HashMap<u64, WorkItem>,
        type_fields: HashMap<String, Vec<FieldMetadata>>,
        global_fields: HashMap<String, FieldMetadata>,
        picklists: HashMap<String, Picklist>,
        type_states: HashMap<String, Vec<String>>,
        outcomes: Vec<PatchOutcome>,
        submissions: Vec<(PatchTarget, Vec<PatchOperation>, SubmitFlags)>,
        calls: CallCounts,
    }

    /// Configurable mock implementation of [`RemoteStore`].
    ///
    /// Seed it with work items, field metadata, picklists and queued
    /// submission outcomes, then assert on recorded submissions and call
    /// counts. Unseeded lookups fail with `Error::Http { status: 404 }`,
    /// matching the facade's transport error convention.
    #[derive(Debug, Default)]
    pub struct MockRemote {
        inner: Mutex<MockInner>,
    }

    impl MockRemote {
        /// Create an empty mock.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a work item, addressable by its id.
        #[must_use]
        pub fn with_work_item(self, item: WorkItem) -> Self {
            self.inner.lock().unwrap().work_items.insert(item.id, item);
            self
        }

        /// Seed the type-scoped field summary for a type name.
        #[must_use]
        pub fn with_type_fields(self, type_name: &str, fields: Vec<FieldMetadata>) -> Self {
            self.inner
                .lock()
                .unwrap()
                .type_fields
                .insert(type_name.to_string(), fields);
            self
        }

        /// Seed a global field definition.
        #[must_use]
        pub fn with_global_field(self, field: FieldMetadata) -> Self {
            self.inner
                .lock()
                .unwrap()
                .global_fields
                .insert(field.reference_name.clone(), field);
            self
        }

        /// Seed a picklist by id.
        #[must_use]
        pub fn with_picklist(self, picklist_id: &str, picklist: Picklist) -> Self {
            self.inner
                .lock()
                .unwrap()
                .picklists
                .insert(picklist_id.to_string(), picklist);
            self
        }

        /// Seed the valid states for a type name.
        #[must_use]
        pub fn with_type_states(self, type_name: &str, states: Vec<String>) -> Self {
            self.inner
                .lock()
                .unwrap()
                .type_states
                .insert(type_name.to_string(), states);
            self
        }

        /// Queue an outcome to be returned by the next `submit_patch` call.
        ///
        /// Outcomes are consumed in FIFO order; when the queue is empty,
        /// submissions succeed with an empty payload.
        #[must_use]
        pub fn with_outcome(self, outcome: PatchOutcome) -> Self {
            self.inner.lock().unwrap().outcomes.push(outcome);
            self
        }

        /// Snapshot of the per-method call counts.
        #[must_use]
        pub fn calls(&self) -> CallCounts {
            self.inner.lock().unwrap().calls
        }

        /// All recorded submissions, in call order.
        #[must_use]
        pub fn submissions(&self) -> Vec<(PatchTarget, Vec<PatchOperation>, SubmitFlags)> {
            self.inner.lock().unwrap().submissions.clone()
        }
    }

    #[async_trait]
    impl RemoteStore for MockRemote {
        async fn fetch_work_item(&self, id: u64, _fields: &[&str]) -> Result<WorkItem> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.fetch_work_item += 1;
            inner.work_items.get(&id).cloned().ok_or(Error::Http {
                status: 404,
                message: format!("work item {id} does not exist"),
            })
        }

        async fn fetch_type_fields(&self, type_name: &str) -> Result<Vec<FieldMetadata>> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.fetch_type_fields += 1;
            inner
                .type_fields
                .get(type_name)
                .cloned()
                .ok_or(Error::Http {
                    status: 404,
                    message: format!("unknown work item type '{type_name}'"),
                })
        }

        async fn fetch_global_field(&self, reference_name: &str) -> Result<FieldMetadata> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.fetch_global_field += 1;
            inner
                .global_fields
                .get(reference_name)
                .cloned()
                .ok_or(Error::Http {
                    status: 404,
                    message: format!("unknown field '{reference_name}'"),
                })
        }

        async fn fetch_picklist(&self, picklist_id: &str) -> Result<Picklist> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.fetch_picklist += 1;
            inner
                .picklists
                .get(picklist_id)
                .cloned()
                .ok_or(Error::Http {
                    status: 404,
                    message: format!("unknown picklist '{picklist_id}'"),
                })
        }

        async fn fetch_type_states(&self, type_name: &str) -> Result<Vec<String>> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.fetch_type_states += 1;
            inner
                .type_states
                .get(type_name)
                .cloned()
                .ok_or(Error::Http {
                    status: 404,
                    message: format!("no states for type '{type_name}'"),
                })
        }

        async fn submit_patch(
            &self,
            target: PatchTarget,
            ops: &[PatchOperation],
            flags: SubmitFlags,
        ) -> Result<PatchOutcome> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.submit_patch += 1;
            inner.submissions.push((target, ops.to_vec(), flags));
            if inner.outcomes.is_empty() {
                Ok(PatchOutcome::Success(serde_json::json!({})))
            } else {
                Ok(inner.outcomes.remove(0))
            }
        }
    }
}
