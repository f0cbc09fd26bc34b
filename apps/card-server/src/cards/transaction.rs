// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Card transaction records.
//!
//! Transactions are append-only; only `status` may change after creation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Purchase,
    Refund,
    Topup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Declined,
}

/// A single movement (or attempted movement) on a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardTransaction {
    pub id: String,
    pub card_id: String,
    pub user_id: String,
    /// Always positive; the type carries the direction
    pub amount: Decimal,
    pub currency: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CardTransaction {
    pub fn new(
        card_id: impl Into<String>,
        user_id: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
        kind: TransactionType,
        status: TransactionStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            card_id: card_id.into(),
            user_id: user_id.into(),
            amount,
            currency: currency.into(),
            kind,
            status,
            description: None,
            created_at,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn is_declined(&self) -> bool {
        self.status == TransactionStatus::Declined
    }
}
