// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Outbox Relay
//!
//! Background task that moves committed operation results from the card
//! store's outbox into the audit log.
//!
//! ## Strategy
//!
//! Every `poll_interval` the relay:
//! 1. Reads up to [`BATCH_SIZE`] pending outbox entries, oldest first.
//! 2. Appends them to the audit log (or emits them as `audit` log records
//!    when no audit log is configured).
//! 3. Acknowledges the delivered entries.
//!
//! A crash between steps 2 and 3 re-delivers the batch, so audit delivery is
//! at-least-once. Each event keeps the `event_id` assigned at commit time,
//! so duplicates can be dropped by ID.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown. A final
//! drain runs before the task exits.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::storage::{AuditEvent, AuditLog, CardStore, StoreResult};

/// Maximum entries delivered per pass.
pub const BATCH_SIZE: usize = 100;

pub struct OutboxRelay {
    store: Arc<dyn CardStore>,
    audit_log: Option<Arc<AuditLog>>,
    poll_interval: Duration,
}

impl OutboxRelay {
    pub fn new(store: Arc<dyn CardStore>, audit_log: Option<Arc<AuditLog>>, poll_interval: Duration) -> Self {
        Self {
            store,
            audit_log,
            poll_interval,
        }
    }

    /// Run the relay loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(relay.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            persistent = self.audit_log.is_some(),
            "Outbox relay starting"
        );

        loop {
            self.drain_logged();

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    self.drain_logged();
                    info!("Outbox relay shutting down");
                    return;
                }
            }
        }
    }

    fn drain_logged(&self) {
        match self.drain() {
            Ok(0) => {}
            Ok(delivered) => info!(delivered, "Outbox relay delivered audit events"),
            Err(e) => warn!(error = %e, "Outbox relay pass failed, will retry"),
        }
    }

    /// Deliver every pending entry. Returns the number delivered.
    pub fn drain(&self) -> StoreResult<usize> {
        let mut delivered = 0;
        loop {
            let batch = self.drain_once()?;
            delivered += batch;
            if batch < BATCH_SIZE {
                return Ok(delivered);
            }
        }
    }

    /// Deliver one batch of pending entries.
    pub fn drain_once(&self) -> StoreResult<usize> {
        let pending = self.store.pending_outbox(BATCH_SIZE)?;
        if pending.is_empty() {
            return Ok(0);
        }

        let events: Vec<AuditEvent> = pending.iter().map(AuditEvent::from_outbox).collect();
        match &self.audit_log {
            Some(log) => log.append(&events)?,
            None => {
                for event in &events {
                    info!(
                        target: "audit",
                        sequence = event.sequence,
                        card_id = %event.result.card_id,
                        actor_id = event.actor_id.as_deref().unwrap_or("unknown"),
                        operation = ?event.result.operation,
                        success = event.result.success,
                        "Card operation"
                    );
                }
            }
        }

        let sequences: Vec<u64> = pending.iter().map(|entry| entry.sequence).collect();
        self.store.acknowledge_outbox(&sequences)?;
        Ok(sequences.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardMutation, OperationKind, VirtualCard};
    use crate::storage::{InMemoryCardStore, MutationRequest};
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn store_with_operations(count: usize) -> (Arc<dyn CardStore>, VirtualCard) {
        let store: Arc<dyn CardStore> = Arc::new(InMemoryCardStore::new());
        let card = VirtualCard::issue("user-1", "USD", None);
        store.insert_card(&card, "user-1").unwrap();
        for _ in 1..count {
            store
                .apply_mutation(&MutationRequest::new(
                    &card.id,
                    "user-1",
                    CardMutation::Fund {
                        amount: Decimal::ONE,
                    },
                ))
                .unwrap();
        }
        (store, card)
    }

    #[test]
    fn drain_writes_audit_log_and_acknowledges() {
        let temp = TempDir::new().unwrap();
        let log = Arc::new(AuditLog::open(temp.path()).unwrap());
        let (store, card) = store_with_operations(2);

        let relay = OutboxRelay::new(store.clone(), Some(log.clone()), Duration::from_secs(1));
        assert_eq!(relay.drain().unwrap(), 2);
        assert!(store.pending_outbox(10).unwrap().is_empty());

        let events = log.read_day(chrono::Utc::now().date_naive()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].result.card_id, card.id);
        assert_eq!(events[0].result.operation, Some(OperationKind::Create));
        assert_eq!(events[1].result.operation, Some(OperationKind::Fund));

        assert_eq!(relay.drain().unwrap(), 0);
    }

    #[test]
    fn redelivery_after_unacknowledged_append_repeats_event_ids() {
        let temp = TempDir::new().unwrap();
        let log = Arc::new(AuditLog::open(temp.path()).unwrap());
        let (store, _) = store_with_operations(1);

        // Appended but never acknowledged, as after a crash
        let pending = store.pending_outbox(BATCH_SIZE).unwrap();
        let events: Vec<AuditEvent> = pending.iter().map(AuditEvent::from_outbox).collect();
        log.append(&events).unwrap();

        let relay = OutboxRelay::new(store.clone(), Some(log.clone()), Duration::from_secs(1));
        assert_eq!(relay.drain().unwrap(), 1);

        let written = log.read_day(events[0].result.timestamp.date_naive()).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].event_id, written[1].event_id);
        assert_eq!(written[0].event_id, pending[0].event_id);
    }

    #[test]
    fn drain_handles_more_than_one_batch() {
        let (store, _) = store_with_operations(BATCH_SIZE + 5);
        let relay = OutboxRelay::new(store.clone(), None, Duration::from_secs(1));

        assert_eq!(relay.drain_once().unwrap(), BATCH_SIZE);
        assert_eq!(relay.drain().unwrap(), 5);
        assert!(store.pending_outbox(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_drains_before_exit() {
        let (store, _) = store_with_operations(3);
        let relay = OutboxRelay::new(store.clone(), None, Duration::from_secs(3600));

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        relay.run(shutdown).await;

        assert!(store.pending_outbox(10).unwrap().is_empty());
    }
}
