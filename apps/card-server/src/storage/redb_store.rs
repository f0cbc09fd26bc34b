// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Card store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `cards`: card_id → serialized VirtualCard
//! - `owner_card_index`: composite key (owner(user_id), card_id) → card_id
//! - `transactions`: tx_id → serialized CardTransaction
//! - `card_tx_index`: composite key (owner(card_id), !timestamp, tx_id) → tx_id
//! - `idempotency`: card_id|client_key → serialized IdempotencyRecord
//! - `outbox`: sequence → serialized OutboxEntry
//! - `outbox_meta`: `next_sequence` counter, never reset
//!
//! `owner(x)` is the byte length of `x` as a big-endian u32 followed by `x`,
//! so an id that contains separator bytes cannot match another id's prefix.
//!
//! redb allows a single writer at a time, so every mutation below runs as a
//! serializable read-modify-write inside one write transaction.

use std::path::Path;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};

use super::{CardStore, IdempotencyRecord, MutationRequest, OutboxEntry, StoreError, StoreResult};
use crate::cards::{
    create_operation_result, plan_mutation, validate_card_ownership, CardChange, CardTransaction, OperationKind,
    OperationResult, VirtualCard,
};

// =============================================================================
// Table Definitions
// =============================================================================

const CARDS: TableDefinition<&str, &[u8]> = TableDefinition::new("cards");

const OWNER_CARD_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("owner_card_index");

const TRANSACTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("transactions");

/// Key format: `owner(card_id) ++ !timestamp_be ++ tx_id` so a forward scan is newest first.
const CARD_TX_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("card_tx_index");

const IDEMPOTENCY: TableDefinition<&str, &[u8]> = TableDefinition::new("idempotency");

const OUTBOX: TableDefinition<u64, &[u8]> = TableDefinition::new("outbox");

const OUTBOX_META: TableDefinition<&str, u64> = TableDefinition::new("outbox_meta");

const NEXT_SEQUENCE: &str = "next_sequence";

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Length-prefixed leading key component.
fn make_prefix(owner: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(owner.len() + 4);
    prefix.extend_from_slice(&(owner.len() as u32).to_be_bytes());
    prefix.extend_from_slice(owner.as_bytes());
    prefix
}

fn make_owner_key(user_id: &str, card_id: &str) -> Vec<u8> {
    let mut key = make_prefix(user_id);
    key.extend_from_slice(card_id.as_bytes());
    key
}

fn make_tx_index_key(tx: &CardTransaction) -> Vec<u8> {
    let nanos = tx
        .created_at
        .timestamp_nanos_opt()
        .unwrap_or_else(|| tx.created_at.timestamp_micros());
    let mut key = make_prefix(&tx.card_id);
    // Inverted timestamp for descending order (newest first)
    key.extend_from_slice(&(!(nanos as u64)).to_be_bytes());
    key.extend_from_slice(tx.id.as_bytes());
    key
}

// =============================================================================
// RedbCardStore
// =============================================================================

pub struct RedbCardStore {
    db: Database,
    #[cfg(test)]
    fail_next_transaction_insert: AtomicBool,
}

impl RedbCardStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(format!("cannot create {}: {e}", parent.display())))?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CARDS)?;
            let _ = write_txn.open_table(OWNER_CARD_INDEX)?;
            let _ = write_txn.open_table(TRANSACTIONS)?;
            let _ = write_txn.open_table(CARD_TX_INDEX)?;
            let _ = write_txn.open_table(IDEMPOTENCY)?;
            let _ = write_txn.open_table(OUTBOX)?;
            let _ = write_txn.open_table(OUTBOX_META)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db,
            #[cfg(test)]
            fail_next_transaction_insert: AtomicBool::new(false),
        })
    }

    /// Make the next transaction insert fail, to exercise rollback paths.
    #[cfg(test)]
    pub(crate) fn fail_next_transaction_insert(&self) {
        self.fail_next_transaction_insert.store(true, Ordering::SeqCst);
    }

    /// Card ids indexed under `user_id`.
    fn owner_card_ids(&self, user_id: &str) -> StoreResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(OWNER_CARD_INDEX)?;
        let prefix = make_prefix(user_id);
        let mut ids = Vec::new();
        for entry in index.range(prefix.as_slice()..)? {
            let (key, card_id) = entry?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            ids.push(card_id.value().to_string());
        }
        Ok(ids)
    }

    fn read_cards(&self, ids: impl IntoIterator<Item = String>) -> StoreResult<Vec<VirtualCard>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CARDS)?;
        let mut cards = Vec::new();
        for id in ids {
            if let Some(value) = table.get(id.as_str())? {
                cards.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(cards)
    }

    /// Append an outbox entry with the next sequence number.
    ///
    /// The counter lives in its own table so sequences keep growing after the
    /// outbox has been fully drained.
    fn enqueue(write_txn: &WriteTransaction, actor_id: &str, result: &OperationResult) -> StoreResult<()> {
        let sequence = {
            let mut meta = write_txn.open_table(OUTBOX_META)?;
            let sequence = meta.get(NEXT_SEQUENCE)?.map(|v| v.value()).unwrap_or(1);
            meta.insert(NEXT_SEQUENCE, sequence + 1)?;
            sequence
        };

        let entry = OutboxEntry::new(sequence, actor_id, result.clone());
        let mut outbox = write_txn.open_table(OUTBOX)?;
        outbox.insert(sequence, serde_json::to_vec(&entry)?.as_slice())?;
        Ok(())
    }

    fn append_transaction(&self, write_txn: &WriteTransaction, tx: &CardTransaction) -> StoreResult<()> {
        #[cfg(test)]
        if self.fail_next_transaction_insert.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("transaction insert failed".to_string()));
        }

        let mut transactions = write_txn.open_table(TRANSACTIONS)?;
        if transactions.get(tx.id.as_str())?.is_some() {
            return Err(StoreError::AlreadyExists(format!("Transaction {}", tx.id)));
        }
        transactions.insert(tx.id.as_str(), serde_json::to_vec(tx)?.as_slice())?;

        let mut index = write_txn.open_table(CARD_TX_INDEX)?;
        index.insert(make_tx_index_key(tx).as_slice(), tx.id.as_str())?;
        Ok(())
    }
}

impl CardStore for RedbCardStore {
    fn get_card(&self, card_id: &str) -> StoreResult<Option<VirtualCard>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CARDS)?;
        match table.get(card_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn list_cards_by_owner(&self, user_id: &str) -> StoreResult<Vec<VirtualCard>> {
        let ids = self.owner_card_ids(user_id)?;
        let mut cards = self.read_cards(ids)?;
        cards.retain(|card| validate_card_ownership(card, user_id));
        cards.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(cards)
    }

    fn list_all_cards(&self) -> StoreResult<Vec<VirtualCard>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CARDS)?;
        let mut cards = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            cards.push(serde_json::from_slice::<VirtualCard>(value.value())?);
        }
        cards.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(cards)
    }

    fn insert_card(&self, card: &VirtualCard, actor_id: &str) -> StoreResult<OperationResult> {
        let result = create_operation_result(&card.id, true, None, Some(card.status), None)
            .with_operation(OperationKind::Create);

        let write_txn = self.db.begin_write()?;
        {
            let mut cards = write_txn.open_table(CARDS)?;
            if cards.get(card.id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!("Card {}", card.id)));
            }
            cards.insert(card.id.as_str(), serde_json::to_vec(card)?.as_slice())?;

            let mut index = write_txn.open_table(OWNER_CARD_INDEX)?;
            index.insert(make_owner_key(&card.user_id, &card.id).as_slice(), card.id.as_str())?;
        }
        Self::enqueue(&write_txn, actor_id, &result)?;
        write_txn.commit()?;

        Ok(result)
    }

    fn recent_transactions(&self, card_id: &str, limit: usize) -> StoreResult<Vec<CardTransaction>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(CARD_TX_INDEX)?;
        let transactions = read_txn.open_table(TRANSACTIONS)?;

        let prefix = make_prefix(card_id);
        let mut results = Vec::with_capacity(limit.min(64));

        for entry in index.range(prefix.as_slice()..)? {
            if results.len() >= limit {
                break;
            }
            let (key, tx_id) = entry?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            if let Some(value) = transactions.get(tx_id.value())? {
                results.push(serde_json::from_slice(value.value())?);
            }
        }

        Ok(results)
    }

    fn apply_mutation(&self, request: &MutationRequest) -> StoreResult<CardChange> {
        let slot = request.idempotency_slot();
        let write_txn = self.db.begin_write()?;

        if let Some(slot) = &slot {
            let idempotency = write_txn.open_table(IDEMPOTENCY)?;
            let recorded = idempotency.get(slot.as_str())?.map(|v| v.value().to_vec());
            if let Some(bytes) = recorded {
                let record: IdempotencyRecord = serde_json::from_slice(&bytes)?;
                return record.replay(request);
            }
        }

        let change = {
            let mut cards = write_txn.open_table(CARDS)?;
            let card: VirtualCard = match cards.get(request.card_id.as_str())? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => return Err(StoreError::CardNotFound(request.card_id.clone())),
            };

            let change = plan_mutation(&card, &request.mutation, Utc::now())?;
            cards.insert(card.id.as_str(), serde_json::to_vec(&change.card)?.as_slice())?;
            change
        };

        if let Some(tx) = &change.transaction {
            self.append_transaction(&write_txn, tx)?;
        }
        Self::enqueue(&write_txn, &request.actor_id, &change.result)?;

        if let Some(slot) = &slot {
            let record = IdempotencyRecord {
                mutation: request.mutation.clone(),
                change: change.clone(),
            };
            let mut idempotency = write_txn.open_table(IDEMPOTENCY)?;
            idempotency.insert(slot.as_str(), serde_json::to_vec(&record)?.as_slice())?;
        }

        write_txn.commit()?;
        Ok(change)
    }

    fn pending_outbox(&self, limit: usize) -> StoreResult<Vec<OutboxEntry>> {
        let read_txn = self.db.begin_read()?;
        let outbox = read_txn.open_table(OUTBOX)?;
        let mut entries = Vec::new();
        for entry in outbox.iter()?.take(limit) {
            let (_, value) = entry?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }

    fn acknowledge_outbox(&self, sequences: &[u64]) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut outbox = write_txn.open_table(OUTBOX)?;
            for sequence in sequences {
                outbox.remove(*sequence)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn health_check(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(CARDS)?;
        Ok(())
    }
}
