// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Card risk assessment endpoint.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    api::cards::load_card,
    auth::Auth,
    cards::{assess_risk, RISK_SAMPLE_SIZE},
    error::ApiError,
    models::RiskResponse,
    state::AppState,
    storage::CardAccess,
};

/// Assess the fraud risk of a card from its most recent transactions.
///
/// Results are cached per card until the next balance or status change.
#[utoipa::path(
    get,
    path = "/v1/cards/{card_id}/risk",
    tag = "Risk",
    security(("bearer_auth" = [])),
    params(("card_id" = String, Path, description = "Card ID")),
    responses(
        (status = 200, description = "Risk assessment", body = RiskResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the card owner"),
        (status = 404, description = "Card not found")
    )
)]
pub async fn get_card_risk(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Json<RiskResponse>, ApiError> {
    let card = load_card(&state, &card_id, &user, CardAccess::Read)?;

    if let Some(cached) = state.risk_cache.get(&card.id) {
        return Ok(Json(RiskResponse::new(&card.id, cached)));
    }

    let generation = state.risk_cache.generation();
    let recent = state.store.recent_transactions(&card.id, RISK_SAMPLE_SIZE)?;
    let assessment = assess_risk(&recent);
    state.risk_cache.put(&card.id, assessment, generation);

    tracing::debug!(
        card_id = %card.id,
        score = assessment.score,
        analyzed = assessment.total_analyzed,
        "Risk assessed"
    );

    Ok(Json(RiskResponse::new(&card.id, assessment)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::cards::tests::{issue, user};
    use crate::auth::Role;
    use crate::cards::{CardMutation, RiskLevel};
    use crate::storage::MutationRequest;
    use axum::http::StatusCode;
    use rust_decimal::Decimal;

    async fn risk(state: &AppState, card_id: &str, as_user: &str) -> Result<RiskResponse, ApiError> {
        get_card_risk(
            Auth(user(as_user, Role::User)),
            State(state.clone()),
            Path(card_id.to_string()),
        )
        .await
        .map(|Json(r)| r)
    }

    fn purchase(state: &AppState, card_id: &str, amount: i64) {
        state
            .store
            .apply_mutation(&MutationRequest::new(
                card_id,
                "user-1",
                CardMutation::Purchase {
                    amount: Decimal::from(amount),
                    description: None,
                },
            ))
            .unwrap();
    }

    #[tokio::test]
    async fn new_card_has_base_risk() {
        let state = AppState::default();
        let card = issue(&state, "user-1").await;

        let response = risk(&state, &card.id, "user-1").await.unwrap();
        assert_eq!(response.id, card.id);
        assert_eq!(response.risk_score, 0.05);
        assert_eq!(response.risk_level, RiskLevel::Low);
        assert_eq!(response.total_analyzed, 0);
    }

    #[tokio::test]
    async fn declines_raise_the_score() {
        let state = AppState::default();
        let card = issue(&state, "user-1").await;
        // Zero balance: every purchase is declined
        for _ in 0..3 {
            purchase(&state, &card.id, 10);
        }

        let response = risk(&state, &card.id, "user-1").await.unwrap();
        assert_eq!(response.total_analyzed, 3);
        assert_eq!(response.risk_score, 0.14);
    }

    #[tokio::test]
    async fn cached_assessment_is_reused_until_invalidated() {
        let state = AppState::default();
        let card = issue(&state, "user-1").await;
        risk(&state, &card.id, "user-1").await.unwrap();

        // Written behind the handler's back, so the cache is not invalidated
        purchase(&state, &card.id, 10);
        let cached = risk(&state, &card.id, "user-1").await.unwrap();
        assert_eq!(cached.total_analyzed, 0);

        state.risk_cache.invalidate(&card.id);
        let fresh = risk(&state, &card.id, "user-1").await.unwrap();
        assert_eq!(fresh.total_analyzed, 1);
    }

    #[tokio::test]
    async fn purchase_during_assessment_is_not_hidden_by_cache() {
        let state = AppState::default();
        let card = issue(&state, "user-1").await;

        // A reader misses and reads the history ...
        let generation = state.risk_cache.generation();
        let stale = assess_risk(&state.store.recent_transactions(&card.id, RISK_SAMPLE_SIZE).unwrap());
        // ... a purchase commits and invalidates ...
        purchase(&state, &card.id, 10);
        state.risk_cache.invalidate(&card.id);
        // ... and the late fill is refused.
        assert!(!state.risk_cache.put(&card.id, stale, generation));

        let response = risk(&state, &card.id, "user-1").await.unwrap();
        assert_eq!(response.total_analyzed, 1);
    }

    #[tokio::test]
    async fn risk_is_owner_only() {
        let state = AppState::default();
        let card = issue(&state, "user-1").await;
        let err = risk(&state, &card.id, "user-2").await.unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let err = risk(&state, "missing", "user-1").await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
