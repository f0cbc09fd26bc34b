// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Celora Card Service - Virtual Card Lifecycle & Risk API
//!
//! Owns virtual card status, balances, transaction history and the fraud
//! risk heuristic for the wallet platform.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - JWT verification and roles
//! - `cards` - Card business rules (pure)
//! - `storage` - Card store, audit log and risk cache
//! - `outbox` - Audit delivery task

pub mod api;
pub mod auth;
pub mod cards;
pub mod config;
pub mod error;
pub mod models;
pub mod outbox;
pub mod state;
pub mod storage;
pub mod telemetry;
