// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Card status state machine.
//!
//! ```text
//!   active <──> suspended
//!      │            │
//!      └──> closed <┘      (terminal)
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Reason returned when the requested status equals the current one.
pub const ALREADY_IN_STATUS: &str = "Card is already in the requested status";

/// Lifecycle status of a virtual card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    /// Card can be funded and used for purchases
    #[default]
    Active,
    /// Card is frozen by its owner or an admin; it can be reactivated
    Suspended,
    /// Card is permanently closed
    Closed,
}

impl CardStatus {
    pub const ALL: [CardStatus; 3] = [CardStatus::Active, CardStatus::Suspended, CardStatus::Closed];

    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Active => "active",
            CardStatus::Suspended => "suspended",
            CardStatus::Closed => "closed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CardStatus::Closed)
    }
}

impl std::fmt::Display for CardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of checking a status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusTransition {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StatusTransition {
    fn allowed() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Validate a requested status change.
///
/// Allowed: active↔suspended, active→closed, suspended→closed. Identity
/// transitions are rejected before anything else, so `closed→closed` reports
/// [`ALREADY_IN_STATUS`] rather than a generic transition error.
pub fn validate_status_transition(current: CardStatus, requested: CardStatus) -> StatusTransition {
    use CardStatus::*;

    if current == requested {
        return StatusTransition::rejected(ALREADY_IN_STATUS);
    }

    match (current, requested) {
        (Active, Suspended) | (Suspended, Active) | (Active, Closed) | (Suspended, Closed) => {
            StatusTransition::allowed()
        }
        _ => StatusTransition::rejected(format!("Cannot transition from {current} to {requested}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_active() {
        assert_eq!(CardStatus::default(), CardStatus::Active);
    }

    #[test]
    fn allowed_transitions_are_valid() {
        for (from, to) in [
            (CardStatus::Active, CardStatus::Suspended),
            (CardStatus::Suspended, CardStatus::Active),
            (CardStatus::Active, CardStatus::Closed),
            (CardStatus::Suspended, CardStatus::Closed),
        ] {
            let result = validate_status_transition(from, to);
            assert!(result.valid, "{from} -> {to} should be allowed");
            assert!(result.reason.is_none());
        }
    }

    #[test]
    fn closed_is_terminal_for_every_target() {
        for requested in CardStatus::ALL {
            let result = validate_status_transition(CardStatus::Closed, requested);
            assert!(!result.valid, "closed -> {requested} must be rejected");
            assert!(result.reason.is_some());
        }
    }

    #[test]
    fn identity_transition_reports_already_in_status() {
        for status in CardStatus::ALL {
            let result = validate_status_transition(status, status);
            assert!(!result.valid);
            assert_eq!(result.reason.as_deref(), Some(ALREADY_IN_STATUS));
        }
    }

    #[test]
    fn reopening_closed_card_names_both_states() {
        let result = validate_status_transition(CardStatus::Closed, CardStatus::Active);
        assert_eq!(
            result.reason.as_deref(),
            Some("Cannot transition from closed to active")
        );
    }

    #[test]
    fn every_pair_has_a_reason_iff_invalid() {
        for current in CardStatus::ALL {
            for requested in CardStatus::ALL {
                let result = validate_status_transition(current, requested);
                assert_eq!(result.valid, result.reason.is_none());
            }
        }
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&CardStatus::Suspended).unwrap(), r#""suspended""#);
        let parsed: CardStatus = serde_json::from_str(r#""closed""#).unwrap();
        assert_eq!(parsed, CardStatus::Closed);
    }
}
