// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Card lifecycle API endpoints.
//!
//! Issuing, listing, reading, status changes and closing. All operations
//! require authentication and enforce ownership.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    api::extract::ValidatedJson,
    auth::{Auth, AuthenticatedUser},
    cards::{CardMutation, CardStatus, OperationResult, VirtualCard},
    error::{ApiError, CARD_NOT_FOUND},
    models::{CardListResponse, CardResponse, CreateCardRequest, UpdateStatusRequest, UpdateStatusResponse},
    state::AppState,
    storage::{authorize_card, CardAccess, MutationRequest},
};

pub const INVALID_STATUS: &str = "Invalid status. Must be 'active' or 'suspended'";
const MAX_LABEL_LEN: usize = 64;

/// Load a card and check the caller may access it (404, then 403).
pub(crate) fn load_card(
    state: &AppState,
    card_id: &str,
    user: &AuthenticatedUser,
    access: CardAccess,
) -> Result<VirtualCard, ApiError> {
    let card = state
        .store
        .get_card(card_id)?
        .ok_or_else(|| ApiError::not_found(CARD_NOT_FOUND))?;
    authorize_card(&card, user, access)?;
    Ok(card)
}

fn parse_requested_status(raw: &str) -> Result<CardStatus, ApiError> {
    match raw {
        "active" => Ok(CardStatus::Active),
        "suspended" => Ok(CardStatus::Suspended),
        _ => Err(ApiError::bad_request(INVALID_STATUS)),
    }
}

fn normalize_currency(raw: &str) -> Result<String, ApiError> {
    let code = raw.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(ApiError::bad_request("Currency must be a 3-letter ISO 4217 code"))
    }
}

fn normalize_label(raw: Option<String>) -> Result<Option<String>, ApiError> {
    let Some(label) = raw.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()) else {
        return Ok(None);
    };
    if label.chars().count() > MAX_LABEL_LEN {
        return Err(ApiError::bad_request(format!(
            "Label must be at most {MAX_LABEL_LEN} characters"
        )));
    }
    Ok(Some(label))
}

/// List the authenticated user's cards.
#[utoipa::path(
    get,
    path = "/v1/cards",
    tag = "Cards",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Cards owned by the caller", body = CardListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_cards(Auth(user): Auth, State(state): State<AppState>) -> Result<Json<CardListResponse>, ApiError> {
    let cards: Vec<CardResponse> = state
        .store
        .list_cards_by_owner(&user.user_id)?
        .into_iter()
        .map(CardResponse::from)
        .collect();

    Ok(Json(CardListResponse {
        total: cards.len(),
        cards,
    }))
}

/// Issue a new virtual card for the authenticated user.
///
/// The card starts active with a zero balance. The full card number is
/// generated once and only its masked form is stored.
#[utoipa::path(
    post,
    path = "/v1/cards",
    tag = "Cards",
    security(("bearer_auth" = [])),
    request_body = CreateCardRequest,
    responses(
        (status = 201, description = "Card issued", body = CardResponse),
        (status = 400, description = "Invalid currency or label"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn create_card(
    Auth(user): Auth,
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateCardRequest>,
) -> Result<(StatusCode, Json<CardResponse>), ApiError> {
    let currency = normalize_currency(&request.currency)?;
    let label = normalize_label(request.label)?;

    let card = VirtualCard::issue(&user.user_id, currency, label);
    state.store.insert_card(&card, &user.user_id)?;

    tracing::info!(
        card_id = %card.id,
        user_id = %user.user_id,
        currency = %card.currency,
        "Card issued"
    );

    Ok((StatusCode::CREATED, Json(CardResponse::from(card))))
}

/// Get a single card.
#[utoipa::path(
    get,
    path = "/v1/cards/{card_id}",
    tag = "Cards",
    security(("bearer_auth" = [])),
    params(("card_id" = String, Path, description = "Card ID")),
    responses(
        (status = 200, description = "Card details", body = CardResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the card owner"),
        (status = 404, description = "Card not found")
    )
)]
pub async fn get_card(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Json<CardResponse>, ApiError> {
    let card = load_card(&state, &card_id, &user, CardAccess::Read)?;
    Ok(Json(CardResponse::from(card)))
}

/// Activate or suspend a card.
///
/// Transitions are checked against the card lifecycle. Closed cards can
/// never change status again.
#[utoipa::path(
    patch,
    path = "/v1/cards/{card_id}/status",
    tag = "Cards",
    security(("bearer_auth" = [])),
    params(("card_id" = String, Path, description = "Card ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = UpdateStatusResponse),
        (status = 400, description = "Invalid status or transition"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the card owner"),
        (status = 404, description = "Card not found")
    )
)]
pub async fn update_card_status(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(card_id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateStatusRequest>,
) -> Result<Json<UpdateStatusResponse>, ApiError> {
    let card = load_card(&state, &card_id, &user, CardAccess::Write)?;
    let target = parse_requested_status(&request.status)?;

    let change = state.store.apply_mutation(&MutationRequest::new(
        &card.id,
        &user.user_id,
        CardMutation::ChangeStatus { target },
    ))?;
    state.risk_cache.invalidate(&card.id);

    tracing::info!(
        card_id = %card.id,
        user_id = %user.user_id,
        from = %card.status,
        to = %change.card.status,
        "Card status changed"
    );

    Ok(Json(UpdateStatusResponse {
        success: change.result.success,
        id: change.card.id,
        status: change.card.status,
    }))
}

/// Close a card permanently.
#[utoipa::path(
    delete,
    path = "/v1/cards/{card_id}",
    tag = "Cards",
    security(("bearer_auth" = [])),
    params(("card_id" = String, Path, description = "Card ID")),
    responses(
        (status = 200, description = "Card closed", body = OperationResult),
        (status = 400, description = "Card is already closed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the card owner"),
        (status = 404, description = "Card not found")
    )
)]
pub async fn close_card(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Json<OperationResult>, ApiError> {
    let card = load_card(&state, &card_id, &user, CardAccess::Write)?;

    let change = state.store.apply_mutation(&MutationRequest::new(
        &card.id,
        &user.user_id,
        CardMutation::ChangeStatus {
            target: CardStatus::Closed,
        },
    ))?;
    state.risk_cache.invalidate(&card.id);

    tracing::info!(card_id = %card.id, user_id = %user.user_id, "Card closed");

    Ok(Json(change.result))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::cards::{OperationKind, ALREADY_IN_STATUS};

    pub(crate) fn user(user_id: &str, role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: user_id.to_string(),
            role,
            session_id: None,
            expires_at: 0,
        }
    }

    pub(crate) async fn issue(state: &AppState, owner: &str) -> CardResponse {
        let (_, Json(card)) = create_card(
            Auth(user(owner, Role::User)),
            State(state.clone()),
            ValidatedJson(CreateCardRequest {
                currency: "usd".to_string(),
                label: Some("  Groceries ".to_string()),
            }),
        )
        .await
        .unwrap();
        card
    }

    async fn set_status(state: &AppState, card_id: &str, as_user: &str, status: &str) -> Result<UpdateStatusResponse, ApiError> {
        update_card_status(
            Auth(user(as_user, Role::User)),
            State(state.clone()),
            Path(card_id.to_string()),
            ValidatedJson(UpdateStatusRequest {
                status: status.to_string(),
            }),
        )
        .await
        .map(|Json(r)| r)
    }

    #[tokio::test]
    async fn create_card_normalizes_input() {
        let state = AppState::default();
        let card = issue(&state, "user-1").await;

        assert_eq!(card.currency, "USD");
        assert_eq!(card.label.as_deref(), Some("Groceries"));
        assert_eq!(card.status, CardStatus::Active);
        assert_eq!(card.balance, rust_decimal::Decimal::ZERO);
        assert!(card.masked_pan.starts_with("************"));
    }

    #[tokio::test]
    async fn create_card_rejects_bad_currency() {
        let state = AppState::default();
        let err = create_card(
            Auth(user("user-1", Role::User)),
            State(state),
            ValidatedJson(CreateCardRequest {
                currency: "dollars".to_string(),
                label: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_cards_only_returns_own_cards() {
        let state = AppState::default();
        issue(&state, "user-1").await;
        issue(&state, "user-1").await;
        issue(&state, "user-2").await;

        let Json(list) = list_cards(Auth(user("user-1", Role::User)), State(state)).await.unwrap();
        assert_eq!(list.total, 2);
        assert!(list.cards.iter().all(|c| c.user_id == "user-1"));
    }

    #[tokio::test]
    async fn get_card_checks_existence_then_ownership() {
        let state = AppState::default();
        let card = issue(&state, "user-1").await;

        let err = get_card(
            Auth(user("user-1", Role::User)),
            State(state.clone()),
            Path("missing".to_string()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = get_card(
            Auth(user("user-2", Role::User)),
            State(state.clone()),
            Path(card.id.clone()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let Json(found) = get_card(Auth(user("support-1", Role::Support)), State(state), Path(card.id.clone()))
            .await
            .unwrap();
        assert_eq!(found.id, card.id);
    }

    #[tokio::test]
    async fn suspend_and_reactivate() {
        let state = AppState::default();
        let card = issue(&state, "user-1").await;

        let suspended = set_status(&state, &card.id, "user-1", "suspended").await.unwrap();
        assert!(suspended.success);
        assert_eq!(suspended.status, CardStatus::Suspended);

        let active = set_status(&state, &card.id, "user-1", "active").await.unwrap();
        assert_eq!(active.status, CardStatus::Active);
    }

    #[tokio::test]
    async fn status_change_rejections_carry_reason() {
        let state = AppState::default();
        let card = issue(&state, "user-1").await;

        let err = set_status(&state, &card.id, "user-1", "active").await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, ALREADY_IN_STATUS);

        let err = set_status(&state, &card.id, "user-1", "closed").await.unwrap_err();
        assert_eq!(err.message, INVALID_STATUS);

        let err = set_status(&state, &card.id, "user-1", "frozen").await.unwrap_err();
        assert_eq!(err.message, INVALID_STATUS);

        let err = set_status(&state, &card.id, "user-2", "suspended").await.unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn support_cannot_change_status() {
        let state = AppState::default();
        let card = issue(&state, "user-1").await;

        let err = update_card_status(
            Auth(user("support-1", Role::Support)),
            State(state),
            Path(card.id),
            ValidatedJson(UpdateStatusRequest {
                status: "suspended".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn closed_card_is_terminal() {
        let state = AppState::default();
        let card = issue(&state, "user-1").await;

        let Json(result) = close_card(
            Auth(user("user-1", Role::User)),
            State(state.clone()),
            Path(card.id.clone()),
        )
        .await
        .unwrap();
        assert!(result.success);
        assert_eq!(result.previous_status, Some(CardStatus::Active));
        assert_eq!(result.new_status, Some(CardStatus::Closed));
        assert_eq!(result.operation, Some(OperationKind::Close));

        let err = set_status(&state, &card.id, "user-1", "active").await.unwrap_err();
        assert_eq!(err.message, "Cannot transition from closed to active");

        let err = close_card(Auth(user("user-1", Role::User)), State(state), Path(card.id))
            .await
            .unwrap_err();
        assert_eq!(err.message, ALREADY_IN_STATUS);
    }

    #[tokio::test]
    async fn admin_may_close_any_card() {
        let state = AppState::default();
        let card = issue(&state, "user-1").await;

        let Json(result) = close_card(Auth(user("admin-1", Role::Admin)), State(state), Path(card.id))
            .await
            .unwrap();
        assert!(result.success);
    }
}
