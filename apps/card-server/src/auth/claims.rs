// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// Claims carried by an identity token from the hosted auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    #[serde(default)]
    pub iat: i64,

    #[serde(default)]
    pub exp: i64,

    #[serde(default)]
    pub iss: String,

    /// Audience (validated by jsonwebtoken, may be a string or a list)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Server-controlled metadata containing the role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_metadata: Option<AppMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Authenticated user information extracted from JWT.
///
/// This is the primary type used throughout the application to represent
/// the authenticated user making a request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Canonical user ID (`sub` claim)
    pub user_id: String,

    pub role: Role,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Token expiration (Unix timestamp, not serialized)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: JwtClaims) -> Self {
        // Unknown or missing roles fall back to a plain cardholder
        let role = claims
            .app_metadata
            .as_ref()
            .and_then(|m| m.role.as_deref())
            .and_then(Role::parse)
            .unwrap_or_default();

        Self {
            user_id: claims.sub,
            role,
            session_id: claims.session_id,
            expires_at: claims.exp,
        }
    }

    /// Check if the user has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> JwtClaims {
        JwtClaims {
            sub: "user_123".to_string(),
            iat: 1700000000,
            exp: 1700003600,
            iss: "https://auth.example.com".to_string(),
            aud: Some(serde_json::json!("authenticated")),
            session_id: Some("sess_abc".to_string()),
            email: None,
            app_metadata: Some(AppMetadata {
                role: Some("support".to_string()),
            }),
        }
    }

    #[test]
    fn from_claims_extracts_user_and_role() {
        let user = AuthenticatedUser::from_claims(sample_claims());
        assert_eq!(user.user_id, "user_123");
        assert_eq!(user.role, Role::Support);
        assert_eq!(user.session_id.as_deref(), Some("sess_abc"));
    }

    #[test]
    fn from_claims_defaults_to_user_role() {
        let mut claims = sample_claims();
        claims.app_metadata = None;
        assert_eq!(AuthenticatedUser::from_claims(claims).role, Role::User);

        let mut claims = sample_claims();
        claims.app_metadata = Some(AppMetadata {
            role: Some("superuser".to_string()),
        });
        assert_eq!(AuthenticatedUser::from_claims(claims).role, Role::User);
    }

    #[test]
    fn has_role_checks_privilege() {
        let user = AuthenticatedUser::from_claims(sample_claims());
        assert!(user.has_role(Role::Support));
        assert!(!user.has_role(Role::Admin));
        assert!(!user.is_admin());
    }
}
