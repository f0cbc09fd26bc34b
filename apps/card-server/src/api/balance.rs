// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Card balance API endpoints.
//!
//! Funding and purchases. The balance update, the transaction record and
//! the outbox entry are committed by the card store as one unit.

use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;

use crate::{
    api::{
        cards::load_card,
        extract::{IdempotencyKey, ValidatedJson},
    },
    auth::Auth,
    cards::{CardChange, CardMutation, MutationRejected, TransactionStatus},
    error::ApiError,
    models::{FundCardRequest, FundCardResponse, PurchaseRequest, PurchaseResponse},
    state::AppState,
    storage::{CardAccess, MutationRequest},
};

/// Reject a missing, zero or negative amount.
fn require_positive(amount: Option<Decimal>) -> Result<Decimal, ApiError> {
    match amount {
        Some(amount) if amount > Decimal::ZERO => Ok(amount),
        _ => Err(ApiError::bad_request(MutationRejected::NonPositiveAmount.to_string())),
    }
}

fn transaction_id(change: &CardChange) -> Result<String, ApiError> {
    change
        .transaction
        .as_ref()
        .map(|tx| tx.id.clone())
        .ok_or_else(|| ApiError::internal("Balance operation produced no transaction"))
}

/// Add funds to a card.
///
/// Active and suspended cards may be funded. Send an `Idempotency-Key`
/// header to make retries safe: a replay returns the original outcome
/// without crediting the card again.
#[utoipa::path(
    post,
    path = "/v1/cards/{card_id}/fund",
    tag = "Balance",
    security(("bearer_auth" = [])),
    params(
        ("card_id" = String, Path, description = "Card ID"),
        ("Idempotency-Key" = Option<String>, Header, description = "Client-chosen key for safe retries")
    ),
    request_body = FundCardRequest,
    responses(
        (status = 200, description = "Card funded", body = FundCardResponse),
        (status = 400, description = "Invalid amount or closed card"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the card owner"),
        (status = 404, description = "Card not found")
    )
)]
pub async fn fund_card(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(card_id): Path<String>,
    IdempotencyKey(idempotency_key): IdempotencyKey,
    ValidatedJson(request): ValidatedJson<FundCardRequest>,
) -> Result<Json<FundCardResponse>, ApiError> {
    let card = load_card(&state, &card_id, &user, CardAccess::Write)?;
    let amount = require_positive(request.amount)?;

    let change = state.store.apply_mutation(
        &MutationRequest::new(&card.id, &user.user_id, CardMutation::Fund { amount })
            .with_idempotency_key(idempotency_key),
    )?;
    state.risk_cache.invalidate(&card.id);

    tracing::info!(
        card_id = %card.id,
        user_id = %user.user_id,
        amount = %amount,
        new_balance = %change.card.balance,
        replayed = change.replayed,
        "Card funded"
    );

    Ok(Json(FundCardResponse {
        success: change.result.success,
        transaction_id: transaction_id(&change)?,
        new_balance: change.result.balance.unwrap_or(change.card.balance),
        replayed: change.replayed,
    }))
}

/// Charge a purchase to a card.
///
/// The card must be active. A purchase the balance cannot cover is recorded
/// as `declined` and answered with `success: false`.
#[utoipa::path(
    post,
    path = "/v1/cards/{card_id}/purchase",
    tag = "Balance",
    security(("bearer_auth" = [])),
    params(
        ("card_id" = String, Path, description = "Card ID"),
        ("Idempotency-Key" = Option<String>, Header, description = "Client-chosen key for safe retries")
    ),
    request_body = PurchaseRequest,
    responses(
        (status = 200, description = "Purchase completed or declined", body = PurchaseResponse),
        (status = 400, description = "Invalid amount or card not active"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the card owner"),
        (status = 404, description = "Card not found")
    )
)]
pub async fn purchase(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(card_id): Path<String>,
    IdempotencyKey(idempotency_key): IdempotencyKey,
    ValidatedJson(request): ValidatedJson<PurchaseRequest>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let card = load_card(&state, &card_id, &user, CardAccess::Write)?;
    let amount = require_positive(request.amount)?;
    let description = request
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let change = state.store.apply_mutation(
        &MutationRequest::new(
            &card.id,
            &user.user_id,
            CardMutation::Purchase {
                amount,
                description,
            },
        )
        .with_idempotency_key(idempotency_key),
    )?;
    state.risk_cache.invalidate(&card.id);

    let status = change
        .transaction
        .as_ref()
        .map(|tx| tx.status)
        .unwrap_or(TransactionStatus::Declined);

    if change.result.success {
        tracing::info!(card_id = %card.id, user_id = %user.user_id, amount = %amount, "Purchase completed");
    } else {
        tracing::warn!(
            card_id = %card.id,
            user_id = %user.user_id,
            amount = %amount,
            reason = change.result.reason.as_deref().unwrap_or_default(),
            "Purchase declined"
        );
    }

    Ok(Json(PurchaseResponse {
        success: change.result.success,
        transaction_id: transaction_id(&change)?,
        status,
        new_balance: change.card.balance,
        reason: change.result.reason.clone(),
        replayed: change.replayed,
    }))
}
