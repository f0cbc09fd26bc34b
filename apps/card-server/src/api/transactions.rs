// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Card transaction history endpoint.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    api::cards::load_card,
    auth::Auth,
    error::ApiError,
    models::{TransactionListResponse, TransactionQuery, TransactionResponse},
    state::AppState,
    storage::CardAccess,
};

pub const DEFAULT_TRANSACTION_LIMIT: usize = 50;
pub const MAX_TRANSACTION_LIMIT: usize = 200;

/// List a card's transactions, newest first.
#[utoipa::path(
    get,
    path = "/v1/cards/{card_id}/transactions",
    tag = "Transactions",
    security(("bearer_auth" = [])),
    params(
        ("card_id" = String, Path, description = "Card ID"),
        TransactionQuery
    ),
    responses(
        (status = 200, description = "Transaction history", body = TransactionListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the card owner"),
        (status = 404, description = "Card not found")
    )
)]
pub async fn list_card_transactions(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(card_id): Path<String>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<TransactionListResponse>, ApiError> {
    let card = load_card(&state, &card_id, &user, CardAccess::Read)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TRANSACTION_LIMIT)
        .clamp(1, MAX_TRANSACTION_LIMIT);

    let transactions: Vec<TransactionResponse> = state
        .store
        .recent_transactions(&card.id, limit)?
        .into_iter()
        .map(TransactionResponse::from)
        .collect();

    Ok(Json(TransactionListResponse {
        total: transactions.len(),
        transactions,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::cards::tests::{issue, user};
    use crate::auth::Role;
    use crate::cards::{CardMutation, TransactionType};
    use crate::storage::MutationRequest;
    use axum::http::StatusCode;
    use rust_decimal::Decimal;

    async fn list(state: &AppState, card_id: &str, as_user: &str, limit: Option<usize>) -> Result<TransactionListResponse, ApiError> {
        list_card_transactions(
            Auth(user(as_user, Role::User)),
            State(state.clone()),
            Path(card_id.to_string()),
            Query(TransactionQuery { limit }),
        )
        .await
        .map(|Json(r)| r)
    }

    #[tokio::test]
    async fn lists_newest_first_with_limit() {
        let state = AppState::default();
        let card = issue(&state, "user-1").await;
        for amount in 1..=3 {
            state
                .store
                .apply_mutation(&MutationRequest::new(
                    &card.id,
                    "user-1",
                    CardMutation::Fund {
                        amount: Decimal::from(amount),
                    },
                ))
                .unwrap();
        }

        let all = list(&state, &card.id, "user-1", None).await.unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.transactions[0].amount, Decimal::from(3));
        assert!(all.transactions.iter().all(|t| t.kind == TransactionType::Topup));

        let limited = list(&state, &card.id, "user-1", Some(2)).await.unwrap();
        assert_eq!(limited.total, 2);

        // Zero is clamped up to one
        let one = list(&state, &card.id, "user-1", Some(0)).await.unwrap();
        assert_eq!(one.total, 1);
    }

    #[tokio::test]
    async fn other_users_are_forbidden() {
        let state = AppState::default();
        let card = issue(&state, "user-1").await;
        let err = list(&state, &card.id, "user-2", None).await.unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }
}
