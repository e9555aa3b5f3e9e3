//! Static required-fields policy.
//!
//! A per-entity-type table of mandatory field references, their default
//! values, and closed-choice value sets. The table is built once at
//! startup (in code or from a YAML document), is immutable thereafter,
//! and is passed by reference into the engine with no hidden global state.
//!
//! Lookups are purely local; the policy never makes remote calls. Type
//! names are exact-match display names, case- and accent-sensitive, tied
//! to the organization's configuration. An unknown type degrades to the
//! universal set rather than failing closed.

use crate::domain::fields;
use crate::error::{Error, Result};
use clevis_remote::{PatchOp, PatchOperation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Immutable required-fields table for one organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequiredFieldsPolicy {
    /// Field references required for every work item type.
    #[serde(default)]
    universal: BTreeSet<String>,

    /// Extra required references per type display name.
    #[serde(default)]
    types: BTreeMap<String, BTreeSet<String>>,

    /// Static default value per field reference.
    #[serde(default)]
    defaults: BTreeMap<String, Value>,

    /// Allowed value set per closed-choice field reference.
    #[serde(default)]
    allowed_values: BTreeMap<String, Vec<String>>,
}

/// Result of checking a patch document against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    /// Required references the document does not supply, in policy order.
    pub missing: Vec<String>,
}

impl Validation {
    /// Whether every required field was supplied.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty()
    }
}

impl RequiredFieldsPolicy {
    /// The built-in baseline: every type requires a title, nothing else.
    ///
    /// Deployments layer their organization's table on top via
    /// [`from_yaml_str`](Self::from_yaml_str).
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            universal: BTreeSet::from([fields::TITLE.to_string()]),
            ..Default::default()
        }
    }

    /// Parse a policy from a YAML document.
    ///
    /// Expected keys: `universal` (list), `types` (map of type name to
    /// list), `defaults` (map of reference to value), `allowed_values`
    /// (map of reference to list). All keys are optional.
    ///
    /// # Errors
    ///
    /// Returns `Error::Policy` when the document cannot be parsed.
    pub fn from_yaml_str(document: &str) -> Result<Self> {
        serde_yaml::from_str(document).map_err(|e| Error::Policy(e.to_string()))
    }

    /// Load a policy from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Policy` when the file cannot be read or parsed.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let document = std::fs::read_to_string(path)
            .map_err(|e| Error::Policy(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&document)
    }

    /// All required field references for a type: the universal set unioned
    /// with the type-specific set. Unknown types get the universal set.
    #[must_use]
    pub fn required_fields(&self, type_name: &str) -> BTreeSet<String> {
        let mut required = self.universal.clone();
        if let Some(extra) = self.types.get(type_name) {
            required.extend(extra.iter().cloned());
        }
        required
    }

    /// The static default value for a field reference, if one is known.
    #[must_use]
    pub fn default_value(&self, reference_name: &str) -> Option<&Value> {
        self.defaults.get(reference_name)
    }

    /// The allowed value set for a closed-choice field, if one is known.
    #[must_use]
    pub fn allowed_values(&self, reference_name: &str) -> Option<&[String]> {
        self.allowed_values.get(reference_name).map(Vec::as_slice)
    }

    /// Check which required fields the patch document leaves unsupplied.
    ///
    /// A field counts as supplied when any `Add` or `Replace` operation
    /// targets it with a value.
    #[must_use]
    pub fn validate(&self, type_name: &str, ops: &[PatchOperation]) -> Validation {
        let supplied = supplied_references(ops);
        let missing = self
            .required_fields(type_name)
            .into_iter()
            .filter(|reference| !supplied.contains(reference.as_str()))
            .collect();
        Validation { missing }
    }

    /// Append one `Add` operation per missing required field that has a
    /// known default. User-supplied overrides take precedence over the
    /// static defaults. Fields with neither stay missing; they are
    /// reported by [`validate`](Self::validate), never guessed.
    pub fn fill_defaults(
        &self,
        type_name: &str,
        ops: &mut Vec<PatchOperation>,
        overrides: &BTreeMap<String, Value>,
    ) {
        for reference in self.validate(type_name, ops).missing {
            let value = overrides
                .get(&reference)
                .or_else(|| self.defaults.get(&reference));
            if let Some(value) = value {
                ops.push(PatchOperation::add_field(&reference, value.clone()));
            }
        }
    }
}

fn supplied_references(ops: &[PatchOperation]) -> BTreeSet<&str> {
    ops.iter()
        .filter(|op| matches!(op.op, PatchOp::Add | PatchOp::Replace) && op.value.is_some())
        .filter_map(PatchOperation::field_reference)
        .collect()
}
