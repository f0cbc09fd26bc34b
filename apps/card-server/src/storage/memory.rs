// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory card store for tests and local development.
//!
//! All state lives behind one mutex, which serializes mutations the same way
//! redb serializes write transactions.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;

use super::{CardStore, IdempotencyRecord, MutationRequest, OutboxEntry, StoreError, StoreResult};
use crate::cards::{
    create_operation_result, plan_mutation, validate_card_ownership, CardChange, CardTransaction, OperationKind,
    OperationResult, VirtualCard,
};

#[derive(Default)]
struct MemoryState {
    cards: HashMap<String, VirtualCard>,
    /// Per-card transactions in insertion order (oldest first)
    transactions: HashMap<String, Vec<CardTransaction>>,
    idempotency: HashMap<String, IdempotencyRecord>,
    outbox: BTreeMap<u64, OutboxEntry>,
    next_sequence: u64,
}

impl MemoryState {
    fn enqueue(&mut self, actor_id: &str, result: OperationResult) {
        self.next_sequence += 1;
        let sequence = self.next_sequence;
        self.outbox.insert(sequence, OutboxEntry::new(sequence, actor_id, result));
    }
}

#[derive(Default)]
pub struct InMemoryCardStore {
    state: Mutex<MemoryState>,
    #[cfg(test)]
    fail_next_transaction_insert: AtomicBool,
}

impl InMemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    /// Make the next transaction insert fail, to exercise rollback paths.
    #[cfg(test)]
    pub(crate) fn fail_next_transaction_insert(&self) {
        self.fail_next_transaction_insert.store(true, Ordering::SeqCst);
    }

    fn append_transaction(&self, state: &mut MemoryState, tx: &CardTransaction) -> StoreResult<()> {
        #[cfg(test)]
        if self.fail_next_transaction_insert.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("transaction insert failed".to_string()));
        }

        let history = state.transactions.entry(tx.card_id.clone()).or_default();
        if history.iter().any(|existing| existing.id == tx.id) {
            return Err(StoreError::AlreadyExists(format!("Transaction {}", tx.id)));
        }
        history.push(tx.clone());
        Ok(())
    }
}

impl CardStore for InMemoryCardStore {
    fn get_card(&self, card_id: &str) -> StoreResult<Option<VirtualCard>> {
        Ok(self.lock()?.cards.get(card_id).cloned())
    }

    fn list_cards_by_owner(&self, user_id: &str) -> StoreResult<Vec<VirtualCard>> {
        let state = self.lock()?;
        let mut cards: Vec<VirtualCard> = state
            .cards
            .values()
            .filter(|card| validate_card_ownership(card, user_id))
            .cloned()
            .collect();
        cards.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(cards)
    }

    fn list_all_cards(&self) -> StoreResult<Vec<VirtualCard>> {
        let state = self.lock()?;
        let mut cards: Vec<VirtualCard> = state.cards.values().cloned().collect();
        cards.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(cards)
    }

    fn insert_card(&self, card: &VirtualCard, actor_id: &str) -> StoreResult<OperationResult> {
        let mut state = self.lock()?;
        if state.cards.contains_key(&card.id) {
            return Err(StoreError::AlreadyExists(format!("Card {}", card.id)));
        }

        let result = create_operation_result(&card.id, true, None, Some(card.status), None)
            .with_operation(OperationKind::Create);
        state.cards.insert(card.id.clone(), card.clone());
        state.enqueue(actor_id, result.clone());
        Ok(result)
    }

    fn recent_transactions(&self, card_id: &str, limit: usize) -> StoreResult<Vec<CardTransaction>> {
        let state = self.lock()?;
        Ok(state
            .transactions
            .get(card_id)
            .map(|history| history.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn apply_mutation(&self, request: &MutationRequest) -> StoreResult<CardChange> {
        let mut state = self.lock()?;
        let slot = request.idempotency_slot();

        if let Some(record) = slot.as_ref().and_then(|s| state.idempotency.get(s)) {
            return record.clone().replay(request);
        }

        let card = state
            .cards
            .get(&request.card_id)
            .ok_or_else(|| StoreError::CardNotFound(request.card_id.clone()))?;
        let change = plan_mutation(card, &request.mutation, Utc::now())?;

        // The transaction insert is the only fallible write, so it goes first.
        if let Some(tx) = &change.transaction {
            self.append_transaction(&mut state, tx)?;
        }
        state.cards.insert(change.card.id.clone(), change.card.clone());
        state.enqueue(&request.actor_id, change.result.clone());
        if let Some(slot) = slot {
            state.idempotency.insert(
                slot,
                IdempotencyRecord {
                    mutation: request.mutation.clone(),
                    change: change.clone(),
                },
            );
        }

        Ok(change)
    }

    fn pending_outbox(&self, limit: usize) -> StoreResult<Vec<OutboxEntry>> {
        Ok(self.lock()?.outbox.values().take(limit).cloned().collect())
    }

    fn acknowledge_outbox(&self, sequences: &[u64]) -> StoreResult<()> {
        let mut state = self.lock()?;
        for sequence in sequences {
            state.outbox.remove(sequence);
        }
        Ok(())
    }

    fn health_check(&self) -> StoreResult<()> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract;

    #[test]
    fn insert_and_list() {
        contract::insert_and_list(&InMemoryCardStore::new());
    }

    #[test]
    fn fund_updates_balance_and_history() {
        contract::fund_updates_balance_and_history(&InMemoryCardStore::new());
    }

    #[test]
    fn rejected_mutation_writes_nothing() {
        contract::rejected_mutation_writes_nothing(&InMemoryCardStore::new());
    }

    #[test]
    fn missing_card_is_reported() {
        contract::missing_card_is_reported(&InMemoryCardStore::new());
    }

    #[test]
    fn idempotent_replay() {
        contract::idempotent_replay(&InMemoryCardStore::new());
    }

    #[test]
    fn declined_purchase_is_recorded() {
        contract::declined_purchase_is_recorded(&InMemoryCardStore::new());
    }

    #[test]
    fn outbox_drains_in_order() {
        contract::outbox_drains_in_order(&InMemoryCardStore::new());
    }

    #[test]
    fn fund_past_balance_range_is_rejected() {
        contract::fund_past_balance_range_is_rejected(&InMemoryCardStore::new());
    }

    #[test]
    fn owners_sharing_a_prefix_stay_isolated() {
        contract::owners_sharing_a_prefix_stay_isolated(&InMemoryCardStore::new());
    }

    #[test]
    fn outbox_entries_keep_their_identity() {
        contract::outbox_entries_keep_their_identity(&InMemoryCardStore::new());
    }

    #[test]
    fn failed_transaction_insert_rolls_back() {
        let store = InMemoryCardStore::new();
        contract::failed_transaction_insert_rolls_back(&store, &|| store.fail_next_transaction_insert());
    }
}
