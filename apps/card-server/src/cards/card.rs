// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Virtual card record and its pure guards.

use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    pan::{generate_pan, mask_pan},
    status::CardStatus,
};

/// Issued cards are valid for three years.
pub const CARD_VALIDITY_MONTHS: u32 = 36;

/// A virtual card as persisted by the card store.
///
/// Balances are kept in the card's own currency and serialized as decimal
/// strings so no precision is lost at rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualCard {
    /// Unique card identifier (UUID)
    pub id: String,
    /// Auth provider user ID of the owner
    pub user_id: String,
    /// Card number with all but the last four digits masked
    pub masked_pan: String,
    /// Current balance, never negative
    pub balance: Decimal,
    /// ISO 4217 currency code
    pub currency: String,
    pub status: CardStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// End of validity; purchases are refused from this instant on
    pub expires_at: DateTime<Utc>,
}

impl VirtualCard {
    /// Issue a new active card with zero balance.
    pub fn issue(user_id: impl Into<String>, currency: impl Into<String>, label: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            masked_pan: mask_pan(&generate_pan()),
            balance: Decimal::ZERO,
            currency: currency.into(),
            status: CardStatus::Active,
            label,
            created_at: now,
            updated_at: now,
            expires_at: now
                .checked_add_months(Months::new(CARD_VALIDITY_MONTHS))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Expiry as printed on a card (`MM/YY`).
    pub fn expiry(&self) -> String {
        self.expires_at.format("%m/%y").to_string()
    }
}

/// A card can be spent from only while active and holding funds.
pub fn is_card_usable(card: &VirtualCard) -> bool {
    card.status == CardStatus::Active && card.balance > Decimal::ZERO
}

/// Strict, case-sensitive owner check.
pub fn validate_card_ownership(card: &VirtualCard, user_id: &str) -> bool {
    card.user_id == user_id
}
