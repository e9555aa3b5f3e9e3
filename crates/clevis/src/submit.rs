//! Patch submission.
//!
//! Exactly one remote call per mutation: an update patch for an existing
//! item or a typed-creation patch, selected by [`PatchTarget`]. Execution
//! flags pass through to the facade, which turns them into query
//! parameters. No retries and no timeout handling at this layer.

use crate::error::Result;
use clevis_remote::{PatchOperation, PatchOutcome, PatchTarget, RemoteStore, SubmitFlags};

/// Submit a patch document to the remote store.
///
/// Returns the facade's classified outcome unmodified: full success, a
/// transport-level error, or a soft failure carrying embedded
/// rule-validation errors for the diagnostic pass.
///
/// # Errors
///
/// Only facade-level errors (the call could not be issued at all); server
/// rejections arrive inside the returned [`PatchOutcome`].
pub async fn submit(
    remote: &dyn RemoteStore,
    target: PatchTarget,
    ops: &[PatchOperation],
    flags: SubmitFlags,
) -> Result<PatchOutcome> {
    tracing::debug!(
        ?target,
        op_count = ops.len(),
        validate_only = flags.validate_only,
        bypass_rules = flags.bypass_rules,
        "submitting patch"
    );

    let outcome = remote.submit_patch(target, ops, flags).await?;

    if let PatchOutcome::TransportError { status, message } = &outcome {
        tracing::debug!(status, %message, "patch submission failed at transport level");
    }

    Ok(outcome)
}
