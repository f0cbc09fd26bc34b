// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for the card database and audit log | `./data` |
//! | `STORE_BACKEND` | `redb` or `memory` | `redb` |
//! | `AUTH_JWT_SECRET` | Auth provider JWT secret (HS256) | Required for production |
//! | `AUTH_ISSUER` | Expected JWT issuer claim | Optional |
//! | `AUTH_AUDIENCE` | Expected JWT audience claim | Optional |
//! | `RISK_CACHE_CAPACITY` | Max cards held in the risk cache | `1024` |
//! | `RISK_CACHE_TTL_SECS` | Risk cache entry lifetime | `60` |
//! | `OUTBOX_POLL_INTERVAL_SECS` | Delay between outbox relay passes | `2` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::str::FromStr;

use crate::state::AuthConfig;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory path.
///
/// The redb database lives at `$DATA_DIR/cards.redb` and the audit log
/// under `$DATA_DIR/audit/events/`.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const STORE_BACKEND_ENV: &str = "STORE_BACKEND";
pub const AUTH_JWT_SECRET_ENV: &str = "AUTH_JWT_SECRET";
pub const AUTH_ISSUER_ENV: &str = "AUTH_ISSUER";
pub const AUTH_AUDIENCE_ENV: &str = "AUTH_AUDIENCE";
pub const RISK_CACHE_CAPACITY_ENV: &str = "RISK_CACHE_CAPACITY";
pub const RISK_CACHE_TTL_SECS_ENV: &str = "RISK_CACHE_TTL_SECS";
pub const OUTBOX_POLL_INTERVAL_SECS_ENV: &str = "OUTBOX_POLL_INTERVAL_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_RISK_CACHE_CAPACITY: usize = 1024;
pub const DEFAULT_RISK_CACHE_TTL_SECS: u64 = 60;
pub const DEFAULT_OUTBOX_POLL_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Database file name inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "cards.redb";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redb,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redb" => Ok(StoreBackend::Redb),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::Invalid {
                var: STORE_BACKEND_ENV,
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(ConfigError::Invalid {
                var: LOG_FORMAT_ENV,
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub store_backend: StoreBackend,
    pub jwt_secret: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub risk_cache_capacity: usize,
    pub risk_cache_ttl_secs: u64,
    pub outbox_poll_interval_secs: u64,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?,
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())),
            store_backend: get(STORE_BACKEND_ENV)
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or(StoreBackend::Redb),
            jwt_secret: get(AUTH_JWT_SECRET_ENV),
            issuer: get(AUTH_ISSUER_ENV),
            audience: get(AUTH_AUDIENCE_ENV),
            risk_cache_capacity: parse_or(
                get(RISK_CACHE_CAPACITY_ENV),
                RISK_CACHE_CAPACITY_ENV,
                DEFAULT_RISK_CACHE_CAPACITY,
            )?,
            risk_cache_ttl_secs: parse_or(
                get(RISK_CACHE_TTL_SECS_ENV),
                RISK_CACHE_TTL_SECS_ENV,
                DEFAULT_RISK_CACHE_TTL_SECS,
            )?,
            outbox_poll_interval_secs: parse_or(
                get(OUTBOX_POLL_INTERVAL_SECS_ENV),
                OUTBOX_POLL_INTERVAL_SECS_ENV,
                DEFAULT_OUTBOX_POLL_INTERVAL_SECS,
            )?,
            log_format: get(LOG_FORMAT_ENV)
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or(LogFormat::Pretty),
        })
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            jwt_secret: self.jwt_secret.clone(),
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError> {
    match value {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid { var, value: v }),
        None => Ok(default),
    }
}
