//! Parent-based inheritance resolution.
//!
//! When a mutation names a parent work item, the parent contributes three
//! things: classification paths (area/iteration) for fields the caller
//! left implicit, the owner context (project) decoded from the parent's
//! canonical URL when not supplied, and a hierarchy-reverse relation
//! linking the item to its parent.

use crate::domain::fields;
use crate::error::Result;
use clevis_remote::{PatchOperation, RemoteStore};
use serde_json::json;

/// What resolving a parent contributed to the mutation.
#[derive(Debug, Clone)]
pub struct ParentResolution {
    /// Inherited classification ops (area/iteration the caller omitted).
    pub ops: Vec<PatchOperation>,

    /// The owner context: the explicit value when given, otherwise the
    /// project decoded from the parent's canonical URL. `None` when
    /// neither source yielded one; callers that need an owner context
    /// must abort with `Error::MissingOwnerContext` before submitting.
    pub project: Option<String>,

    /// Hierarchy-reverse relation op pointing at the parent's URL.
    /// Always emitted, whether or not anything was inherited.
    pub parent_link: PatchOperation,
}

/// Resolve a parent work item's contributions to a mutation.
///
/// Explicit caller values always win: an inherited area/iteration op is
/// emitted only when the caller supplied none and the parent carries a
/// non-blank path.
///
/// # Errors
///
/// Remote lookup failures while fetching the parent propagate as-is, with
/// no local retry. A parent without a canonical URL is an invalid payload.
pub async fn resolve_parent(
    remote: &dyn RemoteStore,
    parent_id: u64,
    explicit_area: Option<&str>,
    explicit_iteration: Option<&str>,
    explicit_project: Option<&str>,
) -> Result<ParentResolution> {
    let parent = remote
        .fetch_work_item(parent_id, &[fields::AREA_PATH, fields::ITERATION_PATH])
        .await?;

    if parent.url.is_empty() {
        return Err(clevis_remote::Error::InvalidPayload(format!(
            "parent work item {parent_id} has no canonical URL"
        ))
        .into());
    }

    let mut ops = Vec::new();
    let inheritable = [
        (fields::AREA_PATH, explicit_area),
        (fields::ITERATION_PATH, explicit_iteration),
    ];
    for (reference, explicit) in inheritable {
        if explicit.is_some_and(|v| !v.trim().is_empty()) {
            continue;
        }
        if let Some(inherited) = parent.field_str(reference) {
            if !inherited.trim().is_empty() {
                ops.push(PatchOperation::add_field(reference, inherited.into()));
            }
        }
    }

    let project = match explicit_project {
        Some(project) if !project.trim().is_empty() => Some(project.to_string()),
        _ => {
            let derived = project_from_url(&parent.url);
            if derived.is_none() {
                tracing::warn!(url = %parent.url, "could not derive project from parent URL");
            }
            derived
        }
    };

    let parent_link = PatchOperation::add_relation(json!({
        "rel": fields::HIERARCHY_REVERSE,
        "url": parent.url,
    }));

    Ok(ParentResolution {
        ops,
        project,
        parent_link,
    })
}

/// Decode the owning project from a canonical work item URL: the path
/// segment immediately preceding the fixed API route marker.
#[must_use]
pub fn project_from_url(url: &str) -> Option<String> {
    let segments: Vec<&str> = url.split('/').collect();
    let marker = segments
        .iter()
        .position(|segment| *segment == fields::API_ROUTE_MARKER)?;
    let project = *segments.get(marker.checked_sub(1)?)?;
    if project.is_empty() {
        None
    } else {
        Some(project.to_string())
    }
}
