// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::storage::{AccessDenied, StoreError};

pub const CARD_NOT_FOUND: &str = "Card not found";
pub const FORBIDDEN: &str = "Forbidden";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CardNotFound(_) => ApiError::not_found(CARD_NOT_FOUND),
            StoreError::Rejected(reason) => ApiError::bad_request(reason.to_string()),
            StoreError::IdempotencyConflict(key) => ApiError::bad_request(format!(
                "Idempotency key '{key}' was already used for a different request"
            )),
            other => {
                tracing::error!(error = %other, "Card store failure");
                ApiError::internal("Internal server error")
            }
        }
    }
}

impl From<AccessDenied> for ApiError {
    fn from(err: AccessDenied) -> Self {
        tracing::warn!(user_id = %err.user_id, card_id = %err.card_id, "Card access denied");
        ApiError::forbidden(FORBIDDEN)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::MutationRejected;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let forbidden = ApiError::forbidden("no");
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

        let internal = ApiError::internal("oops");
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn store_errors_map_to_http_statuses() {
        let nf = ApiError::from(StoreError::CardNotFound("c1".to_string()));
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, CARD_NOT_FOUND);

        let rejected = ApiError::from(StoreError::Rejected(MutationRejected::FundClosed));
        assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
        assert_eq!(rejected.message, "Cannot fund a closed card");

        let conflict = ApiError::from(StoreError::IdempotencyConflict("k".to_string()));
        assert_eq!(conflict.status, StatusCode::BAD_REQUEST);

        let unavailable = ApiError::from(StoreError::Unavailable("disk".to_string()));
        assert_eq!(unavailable.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!unavailable.message.contains("disk"));
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }
}
