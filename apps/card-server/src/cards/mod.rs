// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Card Domain
//!
//! Pure business rules for virtual cards. Nothing in this module performs
//! I/O; handlers and card stores call into it.
//!
//! - `status` - lifecycle state machine
//! - `card` - card record, usability and ownership guards
//! - `risk` - fraud risk heuristic
//! - `operation` - audit envelope for state-changing operations
//! - `mutation` - planning of status changes, funding and purchases
//! - `pan` - card number generation and masking

pub mod card;
pub mod mutation;
pub mod operation;
pub mod pan;
pub mod risk;
pub mod status;
pub mod transaction;

pub use card::{is_card_usable, validate_card_ownership, VirtualCard};
pub use mutation::{plan_mutation, CardChange, CardMutation, MutationRejected, INSUFFICIENT_FUNDS};
pub use operation::{create_operation_result, OperationKind, OperationResult};
pub use risk::{assess_risk, calculate_risk_score, get_risk_level, RiskAssessment, RiskLevel, RISK_SAMPLE_SIZE};
pub use status::{validate_status_transition, CardStatus, StatusTransition, ALREADY_IN_STATUS};
pub use transaction::{CardTransaction, TransactionStatus, TransactionType};
