// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use crate::config::{DEFAULT_RISK_CACHE_CAPACITY, DEFAULT_RISK_CACHE_TTL_SECS};
use crate::storage::{AuditLog, CardStore, InMemoryCardStore, RiskCache};

/// JWT verification settings.
///
/// Without a secret the server runs in development mode and accepts
/// unsigned tokens.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Shared HS256 secret of the hosted auth provider
    pub jwt_secret: Option<String>,
    /// Expected issuer
    pub issuer: Option<String>,
    /// Expected audience
    pub audience: Option<String>,
}

impl AuthConfig {
    pub fn is_production(&self) -> bool {
        self.jwt_secret.is_some()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CardStore>,
    pub auth_config: AuthConfig,
    pub risk_cache: Arc<RiskCache>,
    /// Present when the audit log is persisted to disk
    pub audit_log: Option<Arc<AuditLog>>,
}

impl AppState {
    pub fn new(store: Arc<dyn CardStore>) -> Self {
        Self {
            store,
            auth_config: AuthConfig::default(),
            risk_cache: Arc::new(RiskCache::new(
                DEFAULT_RISK_CACHE_CAPACITY,
                Duration::from_secs(DEFAULT_RISK_CACHE_TTL_SECS),
            )),
            audit_log: None,
        }
    }

    pub fn with_auth_config(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = auth_config;
        self
    }

    pub fn with_risk_cache(mut self, risk_cache: RiskCache) -> Self {
        self.risk_cache = Arc::new(risk_cache);
        self
    }

    pub fn with_audit_log(mut self, audit_log: Arc<AuditLog>) -> Self {
        self.audit_log = Some(audit_log);
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryCardStore::new()))
    }
}
