//! Request and response types for the mutation engine.
//!
//! Request types derive `JsonSchema` in addition to serde so the host
//! application can bind them directly as tool parameter schemas.

use clevis_remote::{PatchOutcome, SubmitFlags};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known field references and route markers of the remote store.
pub mod fields {
    /// Work item title.
    pub const TITLE: &str = "System.Title";

    /// Workflow state.
    pub const STATE: &str = "System.State";

    /// Description body.
    pub const DESCRIPTION: &str = "System.Description";

    /// Area classification path.
    pub const AREA_PATH: &str = "System.AreaPath";

    /// Iteration classification path.
    pub const ITERATION_PATH: &str = "System.IterationPath";

    /// Work item type display name.
    pub const WORK_ITEM_TYPE: &str = "System.WorkItemType";

    /// Relation type linking a child to its parent.
    pub const HIERARCHY_REVERSE: &str = "System.LinkTypes.Hierarchy-Reverse";

    /// Path segment that starts the remote store's API route. The segment
    /// immediately before it in a canonical URL is the owning project.
    pub const API_ROUTE_MARKER: &str = "_apis";
}

/// Request to create a new work item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CreateWorkItemRequest {
    /// Owning project. Optional when `parent_id` is given; it is then
    /// derived from the parent's canonical URL.
    pub project: Option<String>,

    /// Work item type display name (e.g. `Task`, `Bug`).
    pub work_item_type: String,

    /// Title shortcut (`System.Title`).
    pub title: Option<String>,

    /// State shortcut (`System.State`).
    pub state: Option<String>,

    /// Description shortcut (`System.Description`).
    pub description: Option<String>,

    /// Area path shortcut. Explicit values win over parent inheritance.
    pub area_path: Option<String>,

    /// Iteration path shortcut. Explicit values win over parent inheritance.
    pub iteration_path: Option<String>,

    /// Free-form `key=value` field list (comma-separated, quote-aware).
    pub fields: Option<String>,

    /// Parent work item id. Inherits area/iteration when not explicit and
    /// links the new item with a hierarchy-reverse relation.
    pub parent_id: Option<u64>,

    /// Compact relation specs, `type:id[:comment]`.
    pub relations: Option<Vec<String>>,

    /// Validate server-side without persisting.
    #[serde(default)]
    pub validate_only: bool,

    /// Bypass server-side business rules.
    #[serde(default)]
    pub bypass_rules: bool,

    /// Suppress notifications triggered by the mutation.
    #[serde(default)]
    pub suppress_notifications: bool,
}

/// Request to update an existing work item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct UpdateWorkItemRequest {
    /// Id of the work item to update. Must be non-zero.
    pub id: u64,

    /// Title shortcut (`System.Title`).
    pub title: Option<String>,

    /// State shortcut (`System.State`).
    pub state: Option<String>,

    /// Description shortcut (`System.Description`).
    pub description: Option<String>,

    /// Area path shortcut. Explicit values win over parent inheritance.
    pub area_path: Option<String>,

    /// Iteration path shortcut. Explicit values win over parent inheritance.
    pub iteration_path: Option<String>,

    /// Free-form `key=value` field list (comma-separated, quote-aware).
    pub fields: Option<String>,

    /// Comma-separated field references to clear.
    pub remove: Option<String>,

    /// Re-parent under this work item id.
    pub parent_id: Option<u64>,

    /// Compact relation specs, `type:id[:comment]`.
    pub relations: Option<Vec<String>>,

    /// Validate server-side without persisting.
    #[serde(default)]
    pub validate_only: bool,

    /// Bypass server-side business rules.
    #[serde(default)]
    pub bypass_rules: bool,

    /// Suppress notifications triggered by the mutation.
    #[serde(default)]
    pub suppress_notifications: bool,
}

impl CreateWorkItemRequest {
    /// The submission flags carried by this request.
    #[must_use]
    pub fn submit_flags(&self) -> SubmitFlags {
        SubmitFlags {
            validate_only: self.validate_only,
            bypass_rules: self.bypass_rules,
            suppress_notifications: self.suppress_notifications,
        }
    }
}

impl UpdateWorkItemRequest {
    /// The submission flags carried by this request.
    #[must_use]
    pub fn submit_flags(&self) -> SubmitFlags {
        SubmitFlags {
            validate_only: self.validate_only,
            bypass_rules: self.bypass_rules,
            suppress_notifications: self.suppress_notifications,
        }
    }
}

/// The remote envelope plus an optional diagnostic report.
///
/// The diagnostic is a pure addition: the underlying outcome payload is
/// never altered or trimmed. Built fresh per mutation attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedResponse {
    /// The classified submission outcome.
    pub outcome: PatchOutcome,

    /// Human-readable diagnostic report, when rule failures or local
    /// structural findings were recorded.
    pub diagnostic: Option<String>,
}

impl EnrichedResponse {
    /// Wrap an outcome with no diagnostic yet.
    #[must_use]
    pub fn new(outcome: PatchOutcome) -> Self {
        Self {
            outcome,
            diagnostic: None,
        }
    }

    /// Append a diagnostic block, separated from any existing text by a
    /// blank line. Supports multiple enrichment passes on one response.
    pub fn append_diagnostic(&mut self, block: &str) {
        match &mut self.diagnostic {
            Some(existing) => {
                existing.push_str("\n\n");
                existing.push_str(block);
            }
            None => self.diagnostic = Some(block.to_string()),
        }
    }

    /// Flatten into the raw JSON map shape hosts return over the wire:
    /// the response payload (or transport-error map) with a `diagnostic`
    /// key added when one was recorded.
    #[must_use]
    pub fn into_json(self) -> Value {
        let mut payload = match self.outcome {
            PatchOutcome::Success(payload) | PatchOutcome::SoftFailure { payload, .. } => payload,
            PatchOutcome::TransportError { status, message } => serde_json::json!({
                "isHttpError": true,
                "httpStatus": status,
                "message": message,
            }),
        };
        if let Some(diagnostic) = self.diagnostic {
            if let Some(map) = payload.as_object_mut() {
                map.insert("diagnostic".to_string(), Value::from(diagnostic));
            }
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_append_diagnostic_supports_multiple_passes() {
        let mut response = EnrichedResponse::new(PatchOutcome::Success(json!({})));
        assert!(response.diagnostic.is_none());

        response.append_diagnostic("first pass");
        response.append_diagnostic("second pass");
        assert_eq!(
            response.diagnostic.as_deref(),
            Some("first pass\n\nsecond pass")
        );
    }

    #[test]
    fn test_into_json_adds_diagnostic_without_touching_payload() {
        let mut response =
            EnrichedResponse::new(PatchOutcome::Success(json!({"id": 9, "rev": 2})));
        response.append_diagnostic("note");

        let flat = response.into_json();
        assert_eq!(flat.get("id"), Some(&json!(9)));
        assert_eq!(flat.get("rev"), Some(&json!(2)));
        assert_eq!(flat.get("diagnostic"), Some(&json!("note")));
    }

    #[test]
    fn test_into_json_transport_error_shape() {
        let response = EnrichedResponse::new(PatchOutcome::TransportError {
            status: 503,
            message: "unavailable".to_string(),
        });

        let flat = response.into_json();
        assert_eq!(flat.get("isHttpError"), Some(&json!(true)));
        assert_eq!(flat.get("httpStatus"), Some(&json!(503)));
    }

    #[test]
    fn test_request_defaults_deserialize() {
        let request: CreateWorkItemRequest = serde_json::from_value(json!({
            "work_item_type": "Task",
            "title": "Fix bug"
        }))
        .unwrap();

        assert_eq!(request.work_item_type, "Task");
        assert!(!request.validate_only);
        assert!(!request.submit_flags().bypass_rules);
    }
}
