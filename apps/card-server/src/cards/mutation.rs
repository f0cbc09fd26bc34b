// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Planning of state-changing card operations.
//!
//! [`plan_mutation`] is pure: given the current card it computes the updated
//! card, the transaction to append and the operation result to record. Card
//! stores call it inside their write transaction so the read, the rules and
//! the write happen atomically.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    card::{is_card_usable, VirtualCard},
    operation::{create_operation_result, OperationKind, OperationResult},
    status::{validate_status_transition, CardStatus},
    transaction::{CardTransaction, TransactionStatus, TransactionType},
};

pub const INSUFFICIENT_FUNDS: &str = "Insufficient funds";

/// A requested change to a single card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardMutation {
    ChangeStatus { target: CardStatus },
    Fund { amount: Decimal },
    Purchase {
        amount: Decimal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

/// Why a mutation was refused. Nothing is written for a refused mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationRejected {
    #[error("{0}")]
    Transition(String),
    #[error("Amount must be a positive number")]
    NonPositiveAmount,
    #[error("Cannot fund a closed card")]
    FundClosed,
    #[error("Card is not active")]
    NotActive,
    #[error("Amount would exceed the maximum card balance")]
    BalanceOverflow,
    #[error("Card has expired")]
    Expired,
}

/// The full effect of an accepted mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardChange {
    pub card: VirtualCard,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<CardTransaction>,
    pub result: OperationResult,
    /// Set when the change was served from an idempotency record
    #[serde(skip)]
    pub replayed: bool,
}

pub fn plan_mutation(
    card: &VirtualCard,
    mutation: &CardMutation,
    now: DateTime<Utc>,
) -> Result<CardChange, MutationRejected> {
    match mutation {
        CardMutation::ChangeStatus { target } => plan_status_change(card, *target, now),
        CardMutation::Fund { amount } => plan_fund(card, *amount, now),
        CardMutation::Purchase {
            amount,
            description,
        } => plan_purchase(card, *amount, description.clone(), now),
    }
}

fn plan_status_change(
    card: &VirtualCard,
    target: CardStatus,
    now: DateTime<Utc>,
) -> Result<CardChange, MutationRejected> {
    let check = validate_status_transition(card.status, target);
    if !check.valid {
        return Err(MutationRejected::Transition(check.reason.unwrap_or_default()));
    }

    let mut next = card.clone();
    next.status = target;
    next.updated_at = now;

    let kind = if target.is_terminal() {
        OperationKind::Close
    } else {
        OperationKind::StatusChange
    };
    let result = stamped(
        create_operation_result(&card.id, true, Some(card.status), Some(target), None)
            .with_operation(kind),
        now,
    );

    Ok(CardChange {
        card: next,
        transaction: None,
        result,
        replayed: false,
    })
}

fn plan_fund(card: &VirtualCard, amount: Decimal, now: DateTime<Utc>) -> Result<CardChange, MutationRejected> {
    ensure_positive(amount)?;
    if card.status == CardStatus::Closed {
        return Err(MutationRejected::FundClosed);
    }

    let mut next = card.clone();
    next.balance = card
        .balance
        .checked_add(amount)
        .ok_or(MutationRejected::BalanceOverflow)?;
    next.updated_at = now;

    let transaction = CardTransaction::new(
        &card.id,
        &card.user_id,
        amount,
        &card.currency,
        TransactionType::Topup,
        TransactionStatus::Completed,
        now,
    );
    let result = stamped(
        create_operation_result(&card.id, true, None, None, None)
            .with_operation(OperationKind::Fund)
            .with_balance(next.balance),
        now,
    );

    Ok(CardChange {
        card: next,
        transaction: Some(transaction),
        result,
        replayed: false,
    })
}

fn plan_purchase(
    card: &VirtualCard,
    amount: Decimal,
    description: Option<String>,
    now: DateTime<Utc>,
) -> Result<CardChange, MutationRejected> {
    ensure_positive(amount)?;
    if card.status != CardStatus::Active {
        return Err(MutationRejected::NotActive);
    }
    if card.is_expired(now) {
        return Err(MutationRejected::Expired);
    }

    let approved = is_card_usable(card) && amount <= card.balance;
    let mut next = card.clone();
    let (status, reason) = if approved {
        next.balance -= amount;
        next.updated_at = now;
        (TransactionStatus::Completed, None)
    } else {
        (TransactionStatus::Declined, Some(INSUFFICIENT_FUNDS.to_string()))
    };

    let transaction = CardTransaction::new(
        &card.id,
        &card.user_id,
        amount,
        &card.currency,
        TransactionType::Purchase,
        status,
        now,
    )
    .with_description(description);
    let result = stamped(
        create_operation_result(&card.id, approved, None, None, reason)
            .with_operation(OperationKind::Purchase)
            .with_balance(next.balance),
        now,
    );

    Ok(CardChange {
        card: next,
        transaction: Some(transaction),
        result,
        replayed: false,
    })
}

fn ensure_positive(amount: Decimal) -> Result<(), MutationRejected> {
    if amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(MutationRejected::NonPositiveAmount)
    }
}

fn stamped(mut result: OperationResult, now: DateTime<Utc>) -> OperationResult {
    result.timestamp = now;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card_with(status: CardStatus, balance: i64) -> VirtualCard {
        let mut card = VirtualCard::issue("user-1", "USD", None);
        card.status = status;
        card.balance = Decimal::from(balance);
        card
    }

    #[test]
    fn status_change_records_both_states() {
        let card = card_with(CardStatus::Active, 0);
        let change = plan_mutation(
            &card,
            &CardMutation::ChangeStatus {
                target: CardStatus::Suspended,
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(change.card.status, CardStatus::Suspended);
        assert_eq!(change.result.previous_status, Some(CardStatus::Active));
        assert_eq!(change.result.new_status, Some(CardStatus::Suspended));
        assert_eq!(change.result.operation, Some(OperationKind::StatusChange));
        assert!(change.transaction.is_none());
    }

    #[test]
    fn closing_is_tagged_as_close() {
        let card = card_with(CardStatus::Suspended, 5);
        let change = plan_mutation(
            &card,
            &CardMutation::ChangeStatus {
                target: CardStatus::Closed,
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(change.result.operation, Some(OperationKind::Close));
    }

    #[test]
    fn invalid_transition_is_rejected_with_reason() {
        let card = card_with(CardStatus::Closed, 0);
        let err = plan_mutation(
            &card,
            &CardMutation::ChangeStatus {
                target: CardStatus::Active,
            },
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Cannot transition from closed to active");
    }

    #[test]
    fn fund_credits_balance_and_appends_topup() {
        let card = card_with(CardStatus::Active, 10);
        let change = plan_mutation(
            &card,
            &CardMutation::Fund {
                amount: Decimal::new(2550, 2),
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(change.card.balance, Decimal::new(3550, 2));
        let tx = change.transaction.unwrap();
        assert_eq!(tx.kind, TransactionType::Topup);
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(change.result.balance, Some(Decimal::new(3550, 2)));
    }

    #[test]
    fn fund_allows_suspended_but_not_closed() {
        let fund = CardMutation::Fund {
            amount: Decimal::ONE,
        };
        assert!(plan_mutation(&card_with(CardStatus::Suspended, 0), &fund, Utc::now()).is_ok());
        assert_eq!(
            plan_mutation(&card_with(CardStatus::Closed, 0), &fund, Utc::now()).unwrap_err(),
            MutationRejected::FundClosed
        );
    }

    #[test]
    fn fund_past_decimal_range_is_rejected() {
        let mut card = card_with(CardStatus::Active, 0);
        card.balance = Decimal::MAX;
        let err = plan_mutation(
            &card,
            &CardMutation::Fund {
                amount: Decimal::ONE,
            },
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, MutationRejected::BalanceOverflow);
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let card = card_with(CardStatus::Active, 10);
        for amount in [Decimal::ZERO, Decimal::from(-5)] {
            assert_eq!(
                plan_mutation(&card, &CardMutation::Fund { amount }, Utc::now()).unwrap_err(),
                MutationRejected::NonPositiveAmount
            );
        }
    }

    #[test]
    fn purchase_debits_when_funds_suffice() {
        let card = card_with(CardStatus::Active, 100);
        let change = plan_mutation(
            &card,
            &CardMutation::Purchase {
                amount: Decimal::from(40),
                description: Some("Coffee".to_string()),
            },
            Utc::now(),
        )
        .unwrap();

        assert!(change.result.success);
        assert_eq!(change.card.balance, Decimal::from(60));
        let tx = change.transaction.unwrap();
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.description.as_deref(), Some("Coffee"));
    }

    #[test]
    fn purchase_over_balance_is_declined_not_rejected() {
        let card = card_with(CardStatus::Active, 10);
        let change = plan_mutation(
            &card,
            &CardMutation::Purchase {
                amount: Decimal::from(11),
                description: None,
            },
            Utc::now(),
        )
        .unwrap();

        assert!(!change.result.success);
        assert_eq!(change.result.reason.as_deref(), Some(INSUFFICIENT_FUNDS));
        assert_eq!(change.card.balance, Decimal::from(10));
        assert!(change.transaction.unwrap().is_declined());
    }

    #[test]
    fn purchase_on_empty_card_is_declined() {
        let card = card_with(CardStatus::Active, 0);
        let change = plan_mutation(
            &card,
            &CardMutation::Purchase {
                amount: Decimal::ONE,
                description: None,
            },
            Utc::now(),
        )
        .unwrap();
        assert!(change.transaction.unwrap().is_declined());
    }

    #[test]
    fn purchase_on_expired_card_is_rejected() {
        let card = card_with(CardStatus::Active, 100);
        let err = plan_mutation(
            &card,
            &CardMutation::Purchase {
                amount: Decimal::ONE,
                description: None,
            },
            card.expires_at,
        )
        .unwrap_err();
        assert_eq!(err, MutationRejected::Expired);
    }

    #[test]
    fn purchase_requires_active_card() {
        let card = card_with(CardStatus::Suspended, 100);
        let err = plan_mutation(
            &card,
            &CardMutation::Purchase {
                amount: Decimal::ONE,
                description: None,
            },
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, MutationRejected::NotActive);
    }
}
