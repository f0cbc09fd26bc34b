// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Identity tokens are issued by the hosted auth provider. This service only
//! verifies them.
//!
//! ## Auth Flow
//!
//! 1. The client signs in with the auth provider
//! 2. The client sends `Authorization: Bearer <JWT>`
//! 3. The card server:
//!    - Verifies the HS256 signature with the provider's JWT secret
//!    - Checks expiry, issuer and audience
//!    - Extracts:
//!      - `sub` → canonical `user_id`
//!      - `app_metadata.role` → [`Role`] (defaults to `user`)
//!
//! ## Security
//!
//! - All non-health endpoints require authentication
//! - Without a configured secret tokens are decoded unverified (development only)
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod roles;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth, StaffOnly};
pub use roles::Role;
