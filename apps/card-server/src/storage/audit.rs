// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit log of card operations.
//!
//! Operation results drained from the outbox are appended to a daily log
//! file in JSONL format (`audit/events/YYYY-MM-DD.jsonl`).

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{OutboxEntry, StoreError, StoreResult};
use crate::cards::OperationResult;

/// An audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Unique event ID, assigned when the operation was committed.
    ///
    /// A redelivered event carries the same ID, so readers can drop duplicates.
    pub event_id: String,
    /// Outbox sequence the event was delivered from.
    pub sequence: u64,
    /// When the event was written to the log.
    pub recorded_at: DateTime<Utc>,
    /// User who triggered the operation (if known).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    pub result: OperationResult,
}

impl AuditEvent {
    pub fn from_outbox(entry: &OutboxEntry) -> Self {
        Self {
            event_id: entry.event_id.clone(),
            sequence: entry.sequence,
            recorded_at: Utc::now(),
            actor_id: entry.actor_id.clone(),
            result: entry.result.clone(),
        }
    }
}

/// Append-only JSONL audit log, one file per day of the operation timestamp.
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    /// Open the log under `base_dir`, creating the directory if needed.
    pub fn open(base_dir: &Path) -> StoreResult<Self> {
        let dir = base_dir.join("audit").join("events");
        fs::create_dir_all(&dir)
            .map_err(|e| StoreError::Unavailable(format!("cannot create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    fn day_file(&self, date: &str) -> PathBuf {
        self.dir.join(format!("{date}.jsonl"))
    }

    /// Append events to the files of their operation dates.
    pub fn append(&self, events: &[AuditEvent]) -> StoreResult<()> {
        for event in events {
            let date = event.result.timestamp.format("%Y-%m-%d").to_string();
            let mut line = serde_json::to_vec(event)?;
            line.push(b'\n');

            let path = self.day_file(&date);
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| StoreError::Unavailable(format!("cannot open {}: {e}", path.display())))?;
            file.write_all(&line)
                .map_err(|e| StoreError::Unavailable(format!("cannot write {}: {e}", path.display())))?;
        }
        Ok(())
    }

    /// Read audit events for a specific date (`YYYY-MM-DD`).
    ///
    /// A day without any events yields an empty list.
    pub fn read_day(&self, date: NaiveDate) -> StoreResult<Vec<AuditEvent>> {
        let path = self.day_file(&date.format("%Y-%m-%d").to_string());
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "cannot read {}: {e}",
                    path.display()
                )))
            }
        };

        let mut events = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(line)?);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{create_operation_result, CardStatus, OperationKind};
    use tempfile::TempDir;

    fn entry(sequence: u64, card_id: &str) -> OutboxEntry {
        OutboxEntry::new(
            sequence,
            "user_1",
            create_operation_result(card_id, true, Some(CardStatus::Active), Some(CardStatus::Suspended), None)
                .with_operation(OperationKind::StatusChange),
        )
    }

    #[test]
    fn event_copies_outbox_entry() {
        let event = AuditEvent::from_outbox(&entry(7, "card_a"));
        assert_eq!(event.sequence, 7);
        assert_eq!(event.actor_id.as_deref(), Some("user_1"));
        assert_eq!(event.result.card_id, "card_a");
    }

    #[test]
    fn redelivered_entry_keeps_event_id() {
        let entry = entry(3, "card_a");
        let first = AuditEvent::from_outbox(&entry);
        let second = AuditEvent::from_outbox(&entry);
        assert_eq!(first.event_id, entry.event_id);
        assert_eq!(first.event_id, second.event_id);
    }

    #[test]
    fn append_and_read_day() {
        let temp = TempDir::new().unwrap();
        let log = AuditLog::open(temp.path()).unwrap();

        let first = AuditEvent::from_outbox(&entry(1, "card_a"));
        let second = AuditEvent::from_outbox(&entry(2, "card_b"));
        log.append(&[first.clone()]).unwrap();
        log.append(&[second.clone()]).unwrap();

        let day = first.result.timestamp.date_naive();
        let events = log.read_day(day).unwrap();
        assert_eq!(events, vec![first, second]);
    }

    #[test]
    fn missing_day_is_empty() {
        let temp = TempDir::new().unwrap();
        let log = AuditLog::open(temp.path()).unwrap();
        let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert!(log.read_day(day).unwrap().is_empty());
    }
}
