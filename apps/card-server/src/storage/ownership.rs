// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for card access.
//!
//! Every handler that touches a single card passes it through
//! [`authorize_card`] before reading or mutating it.

use crate::auth::{AuthenticatedUser, Role};
use crate::cards::{validate_card_ownership, VirtualCard};

/// Kind of access requested on a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAccess {
    Read,
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("user {user_id} may not access card {card_id}")]
pub struct AccessDenied {
    pub user_id: String,
    pub card_id: String,
}

/// Check that `user` may access `card`.
///
/// - Admins may read and write any card
/// - Support staff may read any card
/// - Everyone else must own the card
pub fn authorize_card(card: &VirtualCard, user: &AuthenticatedUser, access: CardAccess) -> Result<(), AccessDenied> {
    let allowed = match (user.role, access) {
        (Role::Admin, _) => true,
        (Role::Support, CardAccess::Read) => true,
        _ => validate_card_ownership(card, &user.user_id),
    };

    if allowed {
        Ok(())
    } else {
        Err(AccessDenied {
            user_id: user.user_id.clone(),
            card_id: card.id.clone(),
        })
    }
}
