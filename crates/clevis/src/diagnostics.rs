//! Rule-failure diagnostics.
//!
//! When the remote store accepts the HTTP call but rejects values against
//! server-side business rules, the response embeds rule-validation
//! failures instead of surfacing an error. This module reconstructs a
//! human-readable report from those failures by correlating them against
//! field-metadata, picklist, and state-machine lookups.
//!
//! All lookups are memoized in a [`LookupCache`] scoped to one enrichment
//! pass: the type-scoped field summary is fetched at most once, each
//! distinct global field reference at most once, and each distinct
//! picklist id at most once, no matter how many failures reference them.
//! The cache is never promoted beyond the call; field and picklist
//! metadata can change between mutations.

use crate::domain::{fields, EnrichedResponse};
use clevis_remote::{FieldMetadata, PatchOutcome, Picklist, RemoteStore, RuleValidationError};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

/// Per-pass memoization of remote metadata lookups.
///
/// Failed lookups are cached as misses so they are not repeated either.
#[derive(Debug, Default)]
pub struct LookupCache {
    type_fields: HashMap<String, Vec<FieldMetadata>>,
    global_fields: HashMap<String, Option<FieldMetadata>>,
    picklists: HashMap<String, Option<Picklist>>,
}

impl LookupCache {
    /// The type-scoped field summary, fetched on first use.
    async fn type_fields(&mut self, remote: &dyn RemoteStore, type_name: &str) -> &[FieldMetadata] {
        if !self.type_fields.contains_key(type_name) {
            let fetched = match remote.fetch_type_fields(type_name).await {
                Ok(fields) => fields,
                Err(error) => {
                    tracing::debug!(type_name, %error, "type-scoped field summary unavailable");
                    Vec::new()
                }
            };
            self.type_fields.insert(type_name.to_string(), fetched);
        } else {
            tracing::debug!(type_name, "type field summary cache hit");
        }
        &self.type_fields[type_name]
    }

    /// A global field definition, fetched on first use per reference.
    async fn global_field(
        &mut self,
        remote: &dyn RemoteStore,
        reference_name: &str,
    ) -> Option<&FieldMetadata> {
        if !self.global_fields.contains_key(reference_name) {
            let fetched = match remote.fetch_global_field(reference_name).await {
                Ok(field) => Some(field),
                Err(error) => {
                    tracing::debug!(reference_name, %error, "global field lookup failed");
                    None
                }
            };
            self.global_fields
                .insert(reference_name.to_string(), fetched);
        }
        self.global_fields[reference_name].as_ref()
    }

    /// Picklist items, fetched on first use per picklist id.
    async fn picklist(&mut self, remote: &dyn RemoteStore, picklist_id: &str) -> Option<&Picklist> {
        if !self.picklists.contains_key(picklist_id) {
            let fetched = match remote.fetch_picklist(picklist_id).await {
                Ok(picklist) => Some(picklist),
                Err(error) => {
                    tracing::debug!(picklist_id, %error, "picklist lookup failed");
                    None
                }
            };
            self.picklists.insert(picklist_id.to_string(), fetched);
        }
        self.picklists[picklist_id].as_ref()
    }
}

/// Builds diagnostic reports for soft-failure responses.
///
/// One enricher instance lives for one mutation call; its cache is shared
/// across every enrichment pass within that call and discarded with it.
pub struct DiagnosticEnricher<'a> {
    remote: &'a dyn RemoteStore,
    cache: LookupCache,
}

impl<'a> DiagnosticEnricher<'a> {
    /// Create an enricher for one mutation call.
    #[must_use]
    pub fn new(remote: &'a dyn RemoteStore) -> Self {
        Self {
            remote,
            cache: LookupCache::default(),
        }
    }

    /// Append a diagnostic report to the response when it carries embedded
    /// rule-validation failures. Pure addition: existing response fields
    /// and any previously recorded diagnostic text are preserved.
    ///
    /// `type_name` should be passed when the caller already knows the
    /// entity's type (always the case on create); otherwise it is fetched
    /// from the entity itself, once, using `entity_id` or the id embedded
    /// in the response payload.
    pub async fn enrich(
        &mut self,
        response: &mut EnrichedResponse,
        type_name: Option<&str>,
        entity_id: Option<u64>,
    ) {
        let PatchOutcome::SoftFailure { payload, failures } = &response.outcome else {
            return;
        };
        if failures.is_empty() {
            return;
        }
        let failures = failures.clone();

        let type_name = match type_name {
            Some(name) => Some(name.to_string()),
            None => {
                self.fetch_type_name(entity_id.or_else(|| payload_id(payload)))
                    .await
            }
        };

        let mut report = String::from("Rule validation failures reported by the remote store:");
        for failure in &failures {
            let line = self.describe_failure(failure, type_name.as_deref()).await;
            let _ = write!(report, "\n{line}");
        }

        let suggested = suggested_fields(&failures);
        if !suggested.is_empty() {
            report.push_str("\n\nSuggested additional fields to supply:");
            for reference in suggested {
                let _ = write!(report, "\n  - {reference}");
            }
        }

        response.append_diagnostic(&report);
    }

    /// One extra remote call to learn the entity's type, only when needed.
    async fn fetch_type_name(&self, entity_id: Option<u64>) -> Option<String> {
        let id = entity_id?;
        match self
            .remote
            .fetch_work_item(id, &[fields::WORK_ITEM_TYPE])
            .await
        {
            Ok(item) => item.field_str(fields::WORK_ITEM_TYPE).map(ToString::to_string),
            Err(error) => {
                tracing::debug!(id, %error, "could not resolve entity type for diagnostics");
                None
            }
        }
    }

    /// Build the report line for one failure, cross-referencing metadata.
    async fn describe_failure(
        &mut self,
        failure: &RuleValidationError,
        type_name: Option<&str>,
    ) -> String {
        let reference = failure.field_ref_name.as_str();

        // Type-scoped summary first; it is authoritative for the type.
        let mut meta: Option<FieldMetadata> = None;
        if let Some(type_name) = type_name {
            meta = self
                .cache
                .type_fields(self.remote, type_name)
                .await
                .iter()
                .find(|m| m.reference_name == reference)
                .cloned();
        }

        // Fall back to the global lookup when type or picklist info is
        // still missing, filling only the gaps.
        let incomplete = meta.as_ref().is_none_or(|m| {
            m.data_type.is_none() || (m.picklist_id.is_none() && m.picklist_values.is_empty())
        });
        if incomplete {
            if let Some(global) = self.cache.global_field(self.remote, reference).await {
                let global = global.clone();
                match &mut meta {
                    None => meta = Some(global),
                    Some(meta) => {
                        if meta.data_type.is_none() {
                            meta.data_type.clone_from(&global.data_type);
                        }
                        if meta.picklist_id.is_none() && meta.picklist_values.is_empty() {
                            meta.picklist_id.clone_from(&global.picklist_id);
                            meta.picklist_values.clone_from(&global.picklist_values);
                        }
                    }
                }
            }
        }

        // Closed-choice fields: resolve the picklist items when the lookup
        // only gave us an id.
        let mut allowed = meta
            .as_ref()
            .map(|m| m.picklist_values.clone())
            .unwrap_or_default();
        if allowed.is_empty() {
            if let Some(picklist_id) = meta.as_ref().and_then(|m| m.picklist_id.clone()) {
                if let Some(picklist) = self.cache.picklist(self.remote, &picklist_id).await {
                    allowed.clone_from(&picklist.items);
                }
            }
        }

        // State field with a closed-value violation: best-effort state
        // names; failures here are swallowed.
        let mut valid_states = Vec::new();
        if reference == fields::STATE && suggests_closed_value(failure) {
            if let Some(type_name) = type_name {
                if let Ok(states) = self.remote.fetch_type_states(type_name).await {
                    valid_states = states;
                }
            }
        }

        let mut line = format!("- {reference}: {}", failure.error_message);
        if !failure.field_status_flags.is_empty() {
            let _ = write!(line, " [flags: {}]", failure.field_status_flags);
        }
        if let Some(data_type) = meta.as_ref().and_then(|m| m.data_type.as_deref()) {
            let _ = write!(line, " (type: {data_type})");
        }
        if !allowed.is_empty() {
            let _ = write!(line, " allowed: {}", allowed.join(", "));
        }
        if !valid_states.is_empty() {
            let _ = write!(line, " valid states: {}", valid_states.join(", "));
        }
        line
    }
}

/// Whether the failure flags suggest a closed-value violation, mirroring
/// the remote store's `limitedToValues`/`invalidListValue` vocabulary.
fn suggests_closed_value(failure: &RuleValidationError) -> bool {
    let flags = failure.field_status_flags.to_lowercase();
    flags.contains("limited") || flags.contains("invalid")
}

/// Failures flagged as required, deduplicated in first-occurrence order.
fn suggested_fields(failures: &[RuleValidationError]) -> Vec<&str> {
    let mut seen = HashSet::new();
    failures
        .iter()
        .filter(|f| f.suggests_required())
        .map(|f| f.field_ref_name.as_str())
        .filter(|reference| seen.insert(*reference))
        .collect()
}

fn payload_id(payload: &Value) -> Option<u64> {
    payload.get("id").and_then(Value::as_u64)
}
