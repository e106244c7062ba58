//! Event-related types for the revenue ledger
//!
//! This module defines the revenue adjustment event, its name variants,
//! and the signed delta an event contributes to a user's balance.

use serde::{Deserialize, Serialize};

/// Revenue adjustment kinds recognized on the wire
///
/// Names are matched case-sensitively; `"Add_Revenue"` is not a valid name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    /// Credit the user's balance by `value`
    AddRevenue,

    /// Debit the user's balance by `value`
    ///
    /// Debits may take a balance below zero.
    SubtractRevenue,
}

impl EventName {
    /// Wire representation of the name
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventName::AddRevenue => "add_revenue",
            EventName::SubtractRevenue => "subtract_revenue",
        }
    }

    /// Parse a wire name, exact match only
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "add_revenue" => Some(EventName::AddRevenue),
            "subtract_revenue" => Some(EventName::SubtractRevenue),
            _ => None,
        }
    }
}

/// A validated revenue adjustment for one user
///
/// Values of this type only come out of [`crate::core::validator::validate`],
/// so every `Event` has a non-blank user id, a recognized name and a
/// non-negative value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    user_id: String,
    name: EventName,
    value: i64,
}

impl Event {
    pub(crate) fn new(user_id: String, name: EventName, value: i64) -> Self {
        debug_assert!(value >= 0);
        Self {
            user_id,
            name,
            value,
        }
    }

    /// User identifier exactly as it appeared in the payload
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn name(&self) -> EventName {
        self.name
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    /// Signed effect of this event on the user's balance
    pub fn delta(&self) -> i64 {
        match self.name {
            EventName::AddRevenue => self.value,
            EventName::SubtractRevenue => -self.value,
        }
    }

    /// Key under which this event's delta is aggregated and persisted
    pub fn user_key(&self) -> String {
        normalize_user_id(&self.user_id)
    }
}

/// Normalize a user identifier for aggregation and lookup
///
/// Identifiers are compared case-insensitively, so `"Alice"` and `"alice"`
/// share one balance. Surrounding whitespace is significant.
pub fn normalize_user_id(user_id: &str) -> String {
    user_id.to_lowercase()
}
