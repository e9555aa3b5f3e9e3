//! The discriminated response envelope for patch submissions.
//!
//! The remote store reports failures in two distinct shapes:
//!
//! - **Transport errors**: the HTTP call itself failed. The raw envelope
//!   carries an `isHttpError` marker with `httpStatus`/`message`.
//! - **Soft failures**: the HTTP call succeeded (2xx) but the payload
//!   embeds business-rule rejections in a nested
//!   `customProperties.RuleValidationErrors` array.
//!
//! Rather than inspecting map keys at every call site, [`PatchOutcome`]
//! makes the distinction explicit in the type system. Classification of a
//! raw payload happens once, in [`PatchOutcome::classify`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a patch submission, with the failure shape made explicit.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOutcome {
    /// The mutation was accepted; payload is the resulting entity envelope.
    Success(Value),

    /// The HTTP call itself failed. Propagated to callers unmodified.
    TransportError {
        /// HTTP status code, or 0 when the request never reached the server.
        status: u16,
        /// Message reported by the transport or the server.
        message: String,
    },

    /// A 2xx-shaped envelope that embeds rule-validation failures.
    SoftFailure {
        /// The full response payload, returned to the caller unaltered.
        payload: Value,
        /// The embedded rule-validation failures.
        failures: Vec<RuleValidationError>,
    },
}

impl PatchOutcome {
    /// Classify a raw response payload into an explicit outcome.
    ///
    /// Checks the `isHttpError` marker first, then the nested
    /// `customProperties.RuleValidationErrors` array. Payloads matching
    /// neither shape are successes. Array elements that fail to parse are
    /// skipped with a warning rather than discarding the whole set.
    #[must_use]
    pub fn classify(payload: Value) -> Self {
        if payload
            .get("isHttpError")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            let status = payload
                .get("httpStatus")
                .and_then(Value::as_u64)
                .and_then(|s| u16::try_from(s).ok())
                .unwrap_or(0);
            let message = payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("remote call failed")
                .to_string();
            return Self::TransportError { status, message };
        }

        let failures = embedded_failures(&payload);
        if failures.is_empty() {
            Self::Success(payload)
        } else {
            Self::SoftFailure { payload, failures }
        }
    }

    /// The response payload, when one exists.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success(payload) | Self::SoftFailure { payload, .. } => Some(payload),
            Self::TransportError { .. } => None,
        }
    }

    /// Whether the mutation was accepted without embedded rule failures.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

fn embedded_failures(payload: &Value) -> Vec<RuleValidationError> {
    let Some(entries) = payload
        .get("customProperties")
        .and_then(|p| p.get("RuleValidationErrors"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match RuleValidationError::deserialize(entry) {
            Ok(failure) => Some(failure),
            Err(error) => {
                tracing::warn!(%error, "skipping malformed rule validation entry");
                None
            }
        })
        .collect()
}

/// One server-side business-rule rejection embedded in a response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleValidationError {
    /// Reference name of the rejected field.
    #[serde(alias = "fieldReferenceName")]
    pub field_ref_name: String,

    /// Human-readable rejection message.
    #[serde(default)]
    pub error_message: String,

    /// Opaque textual flag set describing the failure.
    #[serde(default, alias = "statusFlags")]
    pub field_status_flags: String,
}

impl RuleValidationError {
    /// Whether the flags mark this field as a required-field suggestion.
    ///
    /// The flag set is opaque text; the substring `required` is the
    /// documented marker, matched case-insensitively.
    #[must_use]
    pub fn suggests_required(&self) -> bool {
        self.field_status_flags.to_lowercase().contains("required")
    }
}
