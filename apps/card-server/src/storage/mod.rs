// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Card Storage
//!
//! Persistence sits behind the [`CardStore`] trait so the card rules can be
//! exercised without a backend.
//!
//! - `RedbCardStore` - embedded ACID database (production)
//! - `InMemoryCardStore` - process-local maps (tests, local development)
//!
//! ## Write Model
//!
//! Every state-changing operation goes through [`CardStore::apply_mutation`].
//! Implementations read the card, run [`plan_mutation`](crate::cards::plan_mutation)
//! and write the updated card, the appended transaction, the outbox entry and
//! the idempotency record as one unit. Either all of them are committed or
//! none is.
//!
//! ## Outbox
//!
//! Each committed [`OperationResult`] is also written to an outbox. The
//! outbox relay drains it into the audit log and acknowledges delivered
//! entries, so audit delivery is at-least-once.

pub mod audit;
pub mod memory;
pub mod ownership;
pub mod redb_store;
pub mod risk_cache;

use serde::{Deserialize, Serialize};

use crate::cards::{CardChange, CardMutation, CardTransaction, MutationRejected, OperationResult, VirtualCard};

pub use audit::{AuditEvent, AuditLog};
pub use memory::InMemoryCardStore;
pub use ownership::{authorize_card, AccessDenied, CardAccess};
pub use redb_store::RedbCardStore;
pub use risk_cache::RiskCache;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("card not found: {0}")]
    CardNotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error(transparent)]
    Rejected(#[from] MutationRejected),

    #[error("idempotency key '{0}' was already used for a different request")]
    IdempotencyConflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A state change requested against one card.
#[derive(Debug, Clone)]
pub struct MutationRequest {
    pub card_id: String,
    /// User who asked for the change (owner or admin)
    pub actor_id: String,
    pub mutation: CardMutation,
    /// Client-supplied key; replays with the same key return the first outcome
    pub idempotency_key: Option<String>,
}

impl MutationRequest {
    pub fn new(card_id: impl Into<String>, actor_id: impl Into<String>, mutation: CardMutation) -> Self {
        Self {
            card_id: card_id.into(),
            actor_id: actor_id.into(),
            mutation,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: Option<String>) -> Self {
        self.idempotency_key = key;
        self
    }

    /// Idempotency keys are scoped to the card they were used on.
    pub(crate) fn idempotency_slot(&self) -> Option<String> {
        self.idempotency_key
            .as_ref()
            .map(|key| format!("{}|{}", self.card_id, key))
    }
}

/// Operation result waiting to be delivered to the audit log.
///
/// `event_id` is fixed when the entry is enqueued, so a redelivered entry
/// keeps its identity in the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub sequence: u64,
    pub event_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    pub result: OperationResult,
}

impl OutboxEntry {
    pub fn new(sequence: u64, actor_id: &str, result: OperationResult) -> Self {
        Self {
            sequence,
            event_id: uuid::Uuid::new_v4().to_string(),
            actor_id: Some(actor_id.to_string()),
            result,
        }
    }
}

/// Stored outcome of an idempotent mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct IdempotencyRecord {
    pub mutation: CardMutation,
    pub change: CardChange,
}

impl IdempotencyRecord {
    /// Return the recorded change if the replayed request matches the original.
    pub(crate) fn replay(self, request: &MutationRequest) -> StoreResult<CardChange> {
        if self.mutation != request.mutation {
            return Err(StoreError::IdempotencyConflict(
                request.idempotency_key.clone().unwrap_or_default(),
            ));
        }
        let mut change = self.change;
        change.replayed = true;
        Ok(change)
    }
}

/// Repository over cards, their transactions and the operation outbox.
pub trait CardStore: Send + Sync {
    fn get_card(&self, card_id: &str) -> StoreResult<Option<VirtualCard>>;

    fn list_cards_by_owner(&self, user_id: &str) -> StoreResult<Vec<VirtualCard>>;

    /// All cards regardless of owner (admin views).
    fn list_all_cards(&self) -> StoreResult<Vec<VirtualCard>>;

    /// Persist a newly issued card and queue its creation result.
    fn insert_card(&self, card: &VirtualCard, actor_id: &str) -> StoreResult<OperationResult>;

    /// Most recent transactions of a card, newest first.
    fn recent_transactions(&self, card_id: &str, limit: usize) -> StoreResult<Vec<CardTransaction>>;

    /// Atomically read, validate and update a card.
    fn apply_mutation(&self, request: &MutationRequest) -> StoreResult<CardChange>;

    /// Oldest undelivered outbox entries.
    fn pending_outbox(&self, limit: usize) -> StoreResult<Vec<OutboxEntry>>;

    fn acknowledge_outbox(&self, sequences: &[u64]) -> StoreResult<()>;

    fn health_check(&self) -> StoreResult<()>;
}
