// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Staff-only API endpoints.
//!
//! - Card overview and statistics (admin or support)
//! - Audit log queries (admin)

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::{
    auth::{AdminOnly, StaffOnly},
    cards::CardStatus,
    error::ApiError,
    models::{AdminStatsResponse, AuditLogResponse, AuditQuery, CardListResponse, CardResponse, CurrencyBalance},
    state::AppState,
};

/// List every card regardless of owner.
#[utoipa::path(
    get,
    path = "/v1/admin/cards",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All cards", body = CardListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Staff role required")
    )
)]
pub async fn list_all_cards(
    StaffOnly(user): StaffOnly,
    State(state): State<AppState>,
) -> Result<Json<CardListResponse>, ApiError> {
    let cards: Vec<CardResponse> = state
        .store
        .list_all_cards()?
        .into_iter()
        .map(CardResponse::from)
        .collect();

    tracing::info!(user_id = %user.user_id, role = %user.role, count = cards.len(), "Staff listed all cards");

    Ok(Json(CardListResponse {
        total: cards.len(),
        cards,
    }))
}

/// Card counts by status and balances by currency.
#[utoipa::path(
    get,
    path = "/v1/admin/stats",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Card statistics", body = AdminStatsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Staff role required")
    )
)]
pub async fn get_stats(
    StaffOnly(_user): StaffOnly,
    State(state): State<AppState>,
) -> Result<Json<AdminStatsResponse>, ApiError> {
    let cards = state.store.list_all_cards()?;

    let count = |status: CardStatus| cards.iter().filter(|c| c.status == status).count();
    let mut balances: BTreeMap<&str, Decimal> = BTreeMap::new();
    for card in &cards {
        let total = balances.entry(card.currency.as_str()).or_default();
        *total = total.checked_add(card.balance).ok_or_else(|| {
            tracing::error!(currency = %card.currency, "Balance total out of range");
            ApiError::internal("Balance total out of range")
        })?;
    }

    Ok(Json(AdminStatsResponse {
        total_cards: cards.len(),
        active_cards: count(CardStatus::Active),
        suspended_cards: count(CardStatus::Suspended),
        closed_cards: count(CardStatus::Closed),
        balances: balances
            .into_iter()
            .map(|(currency, total)| CurrencyBalance {
                currency: currency.to_string(),
                total,
            })
            .collect(),
    }))
}

/// Read the audit log for one day.
#[utoipa::path(
    get,
    path = "/v1/admin/audit",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(AuditQuery),
    responses(
        (status = 200, description = "Audit events of the day", body = AuditLogResponse),
        (status = 400, description = "Invalid date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn get_audit_log(
    AdminOnly(_user): AdminOnly,
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<AuditLogResponse>, ApiError> {
    let date = match query.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| ApiError::bad_request("Invalid date format. Use YYYY-MM-DD"))?,
        None => Utc::now().date_naive(),
    };

    let events = match &state.audit_log {
        Some(log) => log.read_day(date)?,
        None => Vec::new(),
    };

    Ok(Json(AuditLogResponse {
        date: date.format("%Y-%m-%d").to_string(),
        total: events.len(),
        events,
    }))
}
