// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc, time::Duration};

use celora_card_server::{
    api::router,
    config::{Config, StoreBackend},
    outbox::OutboxRelay,
    state::AppState,
    storage::{AuditLog, CardStore, InMemoryCardStore, RedbCardStore, RiskCache},
    telemetry::init_tracing,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(config.log_format);

    if let Err(e) = run(config).await {
        error!(error = %e, "Card server failed");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let (store, audit_log): (Arc<dyn CardStore>, Option<Arc<AuditLog>>) = match config.store_backend {
        StoreBackend::Redb => {
            let path = config.database_path();
            let store = RedbCardStore::open(&path)?;
            let audit_log = AuditLog::open(&config.data_dir)?;
            info!(path = %path.display(), "Card database opened");
            (Arc::new(store), Some(Arc::new(audit_log)))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory card store; data is lost on restart");
            (Arc::new(InMemoryCardStore::new()), None)
        }
    };

    let auth_config = config.auth_config();
    if auth_config.is_production() {
        info!(issuer = ?auth_config.issuer, audience = ?auth_config.audience, "JWT signature verification enabled");
    } else {
        warn!("AUTH_JWT_SECRET not set; accepting unverified tokens (development mode)");
    }

    let mut state = AppState::new(store.clone())
        .with_auth_config(auth_config)
        .with_risk_cache(RiskCache::new(
            config.risk_cache_capacity,
            Duration::from_secs(config.risk_cache_ttl_secs),
        ));
    if let Some(log) = &audit_log {
        state = state.with_audit_log(log.clone());
    }

    let shutdown = CancellationToken::new();
    let relay = OutboxRelay::new(
        store,
        audit_log,
        Duration::from_secs(config.outbox_poll_interval_secs),
    );
    let relay_handle = tokio::spawn(relay.run(shutdown.clone()));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Card server listening (docs at /docs)");

    let app = router(state);
    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_signal().await;
            info!("Shutdown signal received");
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = relay_handle.await {
        warn!(error = %e, "Outbox relay task ended abnormally");
    }

    info!("Card server stopped");
    Ok(())
}

async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
