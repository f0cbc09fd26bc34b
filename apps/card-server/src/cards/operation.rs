// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operation result envelope recorded for every state-changing card operation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::status::CardStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    StatusChange,
    Close,
    Fund,
    Purchase,
}

/// Audit envelope for a card operation.
///
/// `card_id`, `success` and `timestamp` are always present; every other field
/// is serialized only when it was supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub card_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<CardStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_status: Option<CardStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationKind>,
    /// Balance after the operation, for funding and purchases
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub balance: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

pub fn create_operation_result(
    card_id: impl Into<String>,
    success: bool,
    previous_status: Option<CardStatus>,
    new_status: Option<CardStatus>,
    reason: Option<String>,
) -> OperationResult {
    OperationResult {
        card_id: card_id.into(),
        success,
        previous_status,
        new_status,
        reason,
        operation: None,
        balance: None,
        timestamp: Utc::now(),
    }
}

impl OperationResult {
    pub fn with_operation(mut self, operation: OperationKind) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = Some(balance);
        self
    }
}
