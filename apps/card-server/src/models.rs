// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. Field names are camelCase
//! on the wire. All types derive `ToSchema` for the OpenAPI document.
//!
//! Money is carried as [`Decimal`] internally and rendered as a JSON number
//! in responses. Requests accept a number or a numeric string.
//!
//! ## Model Categories
//!
//! - **Cards**: issuing, listing and lifecycle changes
//! - **Balance**: funding and purchases
//! - **Risk**: fraud risk assessment
//! - **Admin**: staff-only views

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::cards::{
    CardStatus, CardTransaction, RiskAssessment, RiskLevel, TransactionStatus, TransactionType, VirtualCard,
};
use crate::storage::AuditEvent;

// =============================================================================
// Card Models
// =============================================================================

/// A virtual card as returned by the API.
///
/// Only the masked card number is ever exposed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardResponse {
    pub id: String,
    pub user_id: String,
    /// Card number with all but the last four digits masked.
    pub masked_pan: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub balance: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    pub status: CardStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Expiry as printed on the card (`MM/YY`).
    pub expiry: String,
}

impl From<VirtualCard> for CardResponse {
    fn from(card: VirtualCard) -> Self {
        let expiry = card.expiry();
        Self {
            id: card.id,
            user_id: card.user_id,
            masked_pan: card.masked_pan,
            balance: card.balance,
            currency: card.currency,
            status: card.status,
            label: card.label,
            created_at: card.created_at,
            updated_at: card.updated_at,
            expires_at: card.expires_at,
            expiry,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardListResponse {
    pub cards: Vec<CardResponse>,
    pub total: usize,
}

/// Request to issue a new virtual card.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardRequest {
    /// Three-letter ISO 4217 currency code (case-insensitive).
    pub currency: String,
    /// Optional human-readable label for the card.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Request to change a card's status.
///
/// Only `active` and `suspended` may be requested here. Closing a card goes
/// through `DELETE /v1/cards/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    #[schema(example = "suspended")]
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusResponse {
    pub success: bool,
    pub id: String,
    pub status: CardStatus,
}

// =============================================================================
// Balance Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FundCardRequest {
    /// Amount to credit. Must be positive.
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FundCardResponse {
    pub success: bool,
    pub transaction_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub new_balance: Decimal,
    /// Set when the response replays an earlier request with the same idempotency key.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub replayed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    /// Amount to debit. Must be positive.
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Outcome of a purchase. Declined purchases are still recorded.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub success: bool,
    pub transaction_id: String,
    pub status: TransactionStatus,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub new_balance: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub replayed: bool,
}

// =============================================================================
// Transaction Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: String,
    pub card_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub currency: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub status: TransactionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CardTransaction> for TransactionResponse {
    fn from(tx: CardTransaction) -> Self {
        Self {
            id: tx.id,
            card_id: tx.card_id,
            amount: tx.amount,
            currency: tx.currency,
            kind: tx.kind,
            status: tx.status,
            description: tx.description,
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionResponse>,
    pub total: usize,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct TransactionQuery {
    /// Maximum number of transactions to return (default 50, max 200).
    pub limit: Option<usize>,
}

// =============================================================================
// Risk Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskResponse {
    pub id: String,
    /// Heuristic score in `[0, 0.99]`, rounded to two decimals.
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    /// Number of recent transactions the score was computed from.
    pub total_analyzed: usize,
}

impl RiskResponse {
    pub fn new(card_id: impl Into<String>, assessment: RiskAssessment) -> Self {
        Self {
            id: card_id.into(),
            risk_score: assessment.score,
            risk_level: assessment.level,
            total_analyzed: assessment.total_analyzed,
        }
    }
}

// =============================================================================
// Admin Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyBalance {
    pub currency: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatsResponse {
    pub total_cards: usize,
    pub active_cards: usize,
    pub suspended_cards: usize,
    pub closed_cards: usize,
    /// Sum of balances per currency, ordered by currency code.
    pub balances: Vec<CurrencyBalance>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AuditQuery {
    /// Day to read (`YYYY-MM-DD`, defaults to today in UTC).
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogResponse {
    pub date: String,
    pub events: Vec<AuditEvent>,
    pub total: usize,
}
