//! Event payload validation
//!
//! The single gate through which [`Event`] values are created. Used by the
//! ingestion boundary before anything is appended, and again by the
//! aggregator for every log line it reads.
//!
//! # Rules
//!
//! Checked in order, first failure wins:
//!
//! 1. The payload decodes into `userId` (string), `name` (string) and
//!    `value` (integer) → else [`RejectionReason::MalformedPayload`]
//! 2. `userId` is non-empty after trimming → else [`RejectionReason::MissingUserId`]
//! 3. `name` is exactly `add_revenue` or `subtract_revenue` → else
//!    [`RejectionReason::InvalidName`]
//! 4. `value >= 0` → else [`RejectionReason::NegativeValue`]

use crate::types::{Event, EventName, RejectionReason};
use serde::Deserialize;

/// Strict wire decode target
///
/// Field names accept the camelCase wire form plus the PascalCase and
/// snake_case spellings older producers emit. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct WirePayload {
    #[serde(rename = "userId", alias = "UserId", alias = "userid", alias = "user_id")]
    user_id: String,
    #[serde(alias = "Name")]
    name: String,
    #[serde(alias = "Value")]
    value: i64,
}

/// Validate a raw payload and build an [`Event`] from it
///
/// Pure and deterministic: the same bytes always produce the same verdict.
pub fn validate(raw: impl AsRef<[u8]>) -> Result<Event, RejectionReason> {
    let payload: WirePayload =
        serde_json::from_slice(raw.as_ref()).map_err(RejectionReason::malformed)?;

    if payload.user_id.trim().is_empty() {
        return Err(RejectionReason::MissingUserId);
    }

    let name =
        EventName::parse(&payload.name).ok_or_else(|| RejectionReason::invalid_name(&payload.name))?;

    if payload.value < 0 {
        return Err(RejectionReason::NegativeValue {
            value: payload.value,
        });
    }

    Ok(Event::new(payload.user_id, name, payload.value))
}
