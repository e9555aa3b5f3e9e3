//! Cross-entity relation linking.
//!
//! Compact relation specs (`type:id[:comment]`) are parsed up front, so
//! malformed tokens are local validation errors raised before any remote
//! call. Specs are then deduplicated by exact identity so remote lookups are
//! bounded by the number of distinct relations requested. Targets that
//! fail to resolve are dropped with a warning rather than aborting the
//! mutation.

use crate::error::{Error, Result};
use clevis_remote::{PatchOperation, RemoteStore};
use serde_json::json;
use std::collections::HashSet;

/// One requested relation to another work item.
///
/// Identity for deduplication is the full `(relation_type, target_id,
/// comment)` triple, compared exactly and case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationSpec {
    /// Relation type as given (e.g. `System.LinkTypes.Related`).
    pub relation_type: String,

    /// Target work item id.
    pub target_id: u64,

    /// Optional comment attached to the relation.
    pub comment: Option<String>,
}

impl RelationSpec {
    /// Parse one compact spec token, `type:id[:comment]`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` for an empty relation type, a
    /// missing id, or a non-integer id.
    pub fn parse(token: &str) -> Result<Self> {
        let invalid = |expected: &'static str| Error::InvalidArgument {
            field: "relation",
            value: token.to_string(),
            expected,
        };

        let mut parts = token.splitn(3, ':');
        let relation_type = parts.next().unwrap_or_default().trim();
        if relation_type.is_empty() {
            return Err(invalid("Expected format: type:id[:comment]"));
        }

        let id_part = parts
            .next()
            .ok_or_else(|| invalid("Expected format: type:id[:comment]"))?;
        let target_id = id_part
            .trim()
            .parse::<u64>()
            .map_err(|_| invalid("Relation target id must be a positive integer"))?;

        Ok(Self {
            relation_type: relation_type.to_string(),
            target_id,
            comment: parts.next().map(ToString::to_string),
        })
    }
}

/// Parse a list of compact spec tokens.
///
/// # Errors
///
/// Fails on the first malformed token; nothing is fetched before parsing
/// succeeds for the whole list.
pub fn parse_relation_specs(tokens: &[String]) -> Result<Vec<RelationSpec>> {
    tokens.iter().map(|t| RelationSpec::parse(t)).collect()
}

/// Resolve relation specs into patch operations.
///
/// Deduplicates by exact identity (keeping first-occurrence order) before
/// doing any network work, then fetches each distinct target's canonical
/// URL. Unresolvable targets (fetch failure or missing URL) are dropped
/// silently; the mutation proceeds with the rest.
pub async fn resolve_relations(
    remote: &dyn RemoteStore,
    specs: Vec<RelationSpec>,
) -> Vec<PatchOperation> {
    let mut seen = HashSet::new();
    let mut ops = Vec::new();

    for spec in specs {
        if !seen.insert(spec.clone()) {
            continue;
        }

        let target = match remote.fetch_work_item(spec.target_id, &[]).await {
            Ok(item) if !item.url.is_empty() => item,
            Ok(_) => {
                tracing::warn!(
                    target_id = spec.target_id,
                    "dropping relation: target has no canonical URL"
                );
                continue;
            }
            Err(error) => {
                tracing::warn!(
                    target_id = spec.target_id,
                    %error,
                    "dropping relation: target could not be fetched"
                );
                continue;
            }
        };

        let mut value = json!({
            "rel": spec.relation_type,
            "url": target.url,
        });
        if let Some(comment) = &spec.comment {
            value["attributes"] = json!({ "comment": comment });
        }
        ops.push(PatchOperation::add_relation(value));
    }

    ops
}
