//! The work item mutation engine.
//!
//! Ties the pipeline together: patch assembly, parent inheritance,
//! relation linking, submission, and diagnostic enrichment. One mutation
//! request runs to completion sequentially on the calling task. Every
//! stage depends on the previous one's output, so there is no internal
//! parallelism, cancellation, or timeout handling at this layer.

use crate::diagnostics::DiagnosticEnricher;
use crate::domain::{CreateWorkItemRequest, EnrichedResponse, UpdateWorkItemRequest};
use crate::error::{Error, Result};
use crate::inherit::resolve_parent;
use crate::patch::{build_patch, ShortcutFields};
use crate::policy::RequiredFieldsPolicy;
use crate::relations::{parse_relation_specs, resolve_relations};
use crate::submit::submit;
use clevis_remote::{PatchOutcome, PatchTarget, RemoteStore};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Mutates work items in the remote store and explains rejections.
///
/// Holds the remote facade and the immutable required-fields policy; both
/// are shared across calls, while all per-call state (patch documents,
/// lookup caches, diagnostic reports) lives and dies with one request.
pub struct WorkItemEngine {
    remote: Arc<dyn RemoteStore>,
    policy: RequiredFieldsPolicy,
}

impl WorkItemEngine {
    /// Create an engine over a remote facade and a policy table.
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteStore>, policy: RequiredFieldsPolicy) -> Self {
        Self { remote, policy }
    }

    /// The policy this engine validates against.
    #[must_use]
    pub fn policy(&self) -> &RequiredFieldsPolicy {
        &self.policy
    }

    /// Create a new work item.
    ///
    /// Pipeline: local preconditions, patch assembly, policy defaults and
    /// structural validation, parent inheritance, relation linking, one
    /// submission, then diagnostic enrichment when the store embedded
    /// rule-validation failures.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidArgument` for a blank type name or malformed
    ///   relation tokens, before any remote call
    /// - `Error::MissingOwnerContext` when no project was supplied and
    ///   none could be derived from the parent URL, before submission
    /// - `Error::Remote` when a parent lookup or the submission call fails
    pub async fn create(&self, request: &CreateWorkItemRequest) -> Result<EnrichedResponse> {
        let type_name = request.work_item_type.trim();
        if type_name.is_empty() {
            return Err(Error::InvalidArgument {
                field: "work_item_type",
                value: request.work_item_type.clone(),
                expected: "Expected a work item type display name",
            });
        }
        let relation_specs = parse_relation_specs(request.relations.as_deref().unwrap_or(&[]))?;

        let shortcuts = ShortcutFields {
            title: request.title.as_deref(),
            state: request.state.as_deref(),
            description: request.description.as_deref(),
            area_path: request.area_path.as_deref(),
            iteration_path: request.iteration_path.as_deref(),
        };
        let mut ops = build_patch(&shortcuts, request.fields.as_deref(), None);

        let mut project = request
            .project
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(ToString::to_string);

        let mut parent_link = None;
        if let Some(parent_id) = request.parent_id {
            let resolution = resolve_parent(
                self.remote.as_ref(),
                parent_id,
                request.area_path.as_deref(),
                request.iteration_path.as_deref(),
                project.as_deref(),
            )
            .await?;
            ops.extend(resolution.ops);
            project = resolution.project;
            parent_link = Some(resolution.parent_link);
        }
        let project = project.ok_or(Error::MissingOwnerContext)?;

        self.policy
            .fill_defaults(type_name, &mut ops, &BTreeMap::new());
        let validation = self.policy.validate(type_name, &ops);

        if let Some(parent_link) = parent_link {
            ops.push(parent_link);
        }
        ops.extend(resolve_relations(self.remote.as_ref(), relation_specs).await);

        let outcome = submit(
            self.remote.as_ref(),
            PatchTarget::New {
                project,
                type_name: type_name.to_string(),
            },
            &ops,
            request.submit_flags(),
        )
        .await?;

        let mut response = EnrichedResponse::new(outcome);
        if matches!(response.outcome, PatchOutcome::SoftFailure { .. }) {
            if !validation.is_valid() {
                response.append_diagnostic(&format!(
                    "Required fields for type '{type_name}' not supplied and without a known default: {}",
                    validation.missing.join(", ")
                ));
            }
            let mut enricher = DiagnosticEnricher::new(self.remote.as_ref());
            enricher.enrich(&mut response, Some(type_name), None).await;
        }
        Ok(response)
    }

    /// Update an existing work item.
    ///
    /// Same pipeline as [`create`](Self::create) minus the required-fields
    /// structural pass, since updates are partial by design. Supplying
    /// `parent_id` re-parents the item and inherits classification paths
    /// the request leaves implicit.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidArgument` for a zero id, malformed relation
    ///   tokens, or a request describing no change at all
    /// - `Error::Remote` when a parent lookup or the submission call fails
    pub async fn update(&self, request: &UpdateWorkItemRequest) -> Result<EnrichedResponse> {
        if request.id == 0 {
            return Err(Error::InvalidArgument {
                field: "id",
                value: request.id.to_string(),
                expected: "Expected a non-zero work item id",
            });
        }
        let relation_specs = parse_relation_specs(request.relations.as_deref().unwrap_or(&[]))?;

        let shortcuts = ShortcutFields {
            title: request.title.as_deref(),
            state: request.state.as_deref(),
            description: request.description.as_deref(),
            area_path: request.area_path.as_deref(),
            iteration_path: request.iteration_path.as_deref(),
        };
        let mut ops = build_patch(
            &shortcuts,
            request.fields.as_deref(),
            request.remove.as_deref(),
        );

        if ops.is_empty() && request.parent_id.is_none() && relation_specs.is_empty() {
            return Err(Error::InvalidArgument {
                field: "request",
                value: format!("work item {}", request.id),
                expected: "Expected at least one field change, removal, relation, or parent",
            });
        }

        if let Some(parent_id) = request.parent_id {
            let resolution = resolve_parent(
                self.remote.as_ref(),
                parent_id,
                request.area_path.as_deref(),
                request.iteration_path.as_deref(),
                None,
            )
            .await?;
            ops.extend(resolution.ops);
            ops.push(resolution.parent_link);
        }
        ops.extend(resolve_relations(self.remote.as_ref(), relation_specs).await);

        let outcome = submit(
            self.remote.as_ref(),
            PatchTarget::Existing(request.id),
            &ops,
            request.submit_flags(),
        )
        .await?;

        let mut response = EnrichedResponse::new(outcome);
        if matches!(response.outcome, PatchOutcome::SoftFailure { .. }) {
            let mut enricher = DiagnosticEnricher::new(self.remote.as_ref());
            enricher
                .enrich(&mut response, None, Some(request.id))
                .await;
        }
        Ok(response)
    }
}
