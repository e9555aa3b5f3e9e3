//! Remote payload projections and the JSON-Patch operation type.
//!
//! These types mirror the wire shapes used by the remote entity store.
//! They are read-only projections: instances are created while resolving
//! one mutation call and discarded afterwards, never persisted locally.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path prefix for field-targeted patch operations.
pub const FIELDS_PATH_PREFIX: &str = "/fields/";

/// Path for appending a relation to an entity.
pub const RELATIONS_APPEND_PATH: &str = "/relations/-";

/// A single JSON-Patch operation targeting a field or relation path.
///
/// Invariants, enforced by the constructors:
/// - `Remove` never carries a value
/// - field operations always target a `/fields/<referenceName>` path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    /// The patch verb.
    pub op: PatchOp,

    /// Target path (`/fields/<referenceName>` or `/relations/-`).
    pub path: String,

    /// The value to write. Absent for `Remove` operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    /// Create an `Add` operation for a field reference name.
    #[must_use]
    pub fn add_field(reference_name: &str, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path: format!("{FIELDS_PATH_PREFIX}{reference_name}"),
            value: Some(value),
        }
    }

    /// Create a `Replace` operation for a field reference name.
    #[must_use]
    pub fn replace_field(reference_name: &str, value: Value) -> Self {
        Self {
            op: PatchOp::Replace,
            path: format!("{FIELDS_PATH_PREFIX}{reference_name}"),
            value: Some(value),
        }
    }

    /// Create a `Remove` operation for a field reference name.
    ///
    /// Remove operations carry no value on the wire.
    #[must_use]
    pub fn remove_field(reference_name: &str) -> Self {
        Self {
            op: PatchOp::Remove,
            path: format!("{FIELDS_PATH_PREFIX}{reference_name}"),
            value: None,
        }
    }

    /// Create an `Add` operation appending a relation.
    #[must_use]
    pub fn add_relation(value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path: RELATIONS_APPEND_PATH.to_string(),
            value: Some(value),
        }
    }

    /// The field reference name this operation targets, if it is a field op.
    #[must_use]
    pub fn field_reference(&self) -> Option<&str> {
        self.path.strip_prefix(FIELDS_PATH_PREFIX)
    }
}

/// Patch verbs understood by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Set a field or append a relation.
    Add,

    /// Overwrite an existing field value.
    Replace,

    /// Clear a field. Carries no value.
    Remove,
}

/// A work item as fetched from the remote store.
///
/// Only the projection the engine needs: identity, canonical URL, and the
/// requested field subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    /// Numeric work item id.
    pub id: u64,

    /// Canonical API URL of the work item.
    #[serde(default)]
    pub url: String,

    /// Requested fields, keyed by reference name.
    #[serde(default)]
    pub fields: serde_json::Map<String, Value>,
}

impl WorkItem {
    /// Get a field value as a string slice, if present and string-typed.
    #[must_use]
    pub fn field_str(&self, reference_name: &str) -> Option<&str> {
        self.fields.get(reference_name).and_then(Value::as_str)
    }
}

/// Metadata describing one field, from either a type-scoped or a global
/// (organization-wide) lookup.
///
/// The type-scoped result is authoritative for the entity's configured
/// type and takes precedence when both lookups are available.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    /// Canonical reference name (e.g. `System.Title`).
    pub reference_name: String,

    /// Human-readable display name.
    #[serde(default)]
    pub display_name: Option<String>,

    /// Field data type as reported by the remote store.
    #[serde(default)]
    pub data_type: Option<String>,

    /// Whether the field is mandatory for the scoped type.
    #[serde(default)]
    pub is_required: bool,

    /// Picklist id, for closed-choice fields.
    #[serde(default)]
    pub picklist_id: Option<String>,

    /// Allowed values, when the lookup already included them.
    #[serde(default)]
    pub picklist_values: Vec<String>,
}

/// A server-defined closed set of allowed values for a field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Picklist {
    /// Picklist name.
    #[serde(default)]
    pub name: String,

    /// Allowed values, in server order.
    #[serde(default)]
    pub items: Vec<String>,
}

/// Addressing for a patch submission: update an existing item or create a
/// new one of a given type inside a project.
///
/// The create/update distinction is carried by the type system rather than
/// by an optional entity id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchTarget {
    /// Update the work item with this id.
    Existing(u64),

    /// Create a new work item.
    New {
        /// Owning project (the owner context scoping the API route).
        project: String,
        /// Work item type display name (e.g. `Task`).
        type_name: String,
    },
}

/// Execution flags forwarded as query parameters on patch submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitFlags {
    /// Validate the patch server-side without persisting it.
    pub validate_only: bool,

    /// Bypass server-side business rules.
    pub bypass_rules: bool,

    /// Suppress notifications normally triggered by the mutation.
    pub suppress_notifications: bool,
}
