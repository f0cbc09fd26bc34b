// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderName,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::Role,
    cards::{CardStatus, OperationKind, OperationResult, RiskLevel, TransactionStatus, TransactionType},
    models::{
        AdminStatsResponse, AuditLogResponse, CardListResponse, CardResponse, CreateCardRequest, CurrencyBalance,
        FundCardRequest, FundCardResponse, PurchaseRequest, PurchaseResponse, RiskResponse,
        TransactionListResponse, TransactionResponse, UpdateStatusRequest, UpdateStatusResponse,
    },
    state::AppState,
    storage::AuditEvent,
};

pub mod admin;
pub mod balance;
pub mod cards;
pub mod extract;
pub mod health;
pub mod risk;
pub mod transactions;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/cards", get(cards::list_cards).post(cards::create_card))
        .route("/cards/{card_id}", get(cards::get_card).delete(cards::close_card))
        .route("/cards/{card_id}/status", patch(cards::update_card_status))
        .route("/cards/{card_id}/fund", post(balance::fund_card))
        .route("/cards/{card_id}/purchase", post(balance::purchase))
        .route("/cards/{card_id}/risk", get(risk::get_card_risk))
        .route(
            "/cards/{card_id}/transactions",
            get(transactions::list_card_transactions),
        )
        .route("/admin/cards", get(admin::list_all_cards))
        .route("/admin/stats", get(admin::get_stats))
        .route("/admin/audit", get(admin::get_audit_log))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        cards::list_cards,
        cards::create_card,
        cards::get_card,
        cards::update_card_status,
        cards::close_card,
        balance::fund_card,
        balance::purchase,
        risk::get_card_risk,
        transactions::list_card_transactions,
        admin::list_all_cards,
        admin::get_stats,
        admin::get_audit_log,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            CardResponse,
            CardListResponse,
            CreateCardRequest,
            UpdateStatusRequest,
            UpdateStatusResponse,
            FundCardRequest,
            FundCardResponse,
            PurchaseRequest,
            PurchaseResponse,
            TransactionResponse,
            TransactionListResponse,
            RiskResponse,
            AdminStatsResponse,
            CurrencyBalance,
            AuditLogResponse,
            AuditEvent,
            OperationResult,
            OperationKind,
            CardStatus,
            TransactionType,
            TransactionStatus,
            RiskLevel,
            Role,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Cards", description = "Virtual card lifecycle"),
        (name = "Balance", description = "Funding and purchases"),
        (name = "Transactions", description = "Card transaction history"),
        (name = "Risk", description = "Fraud risk assessment"),
        (name = "Admin", description = "Staff-only views"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
