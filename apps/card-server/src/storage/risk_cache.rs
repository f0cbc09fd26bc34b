// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for card risk assessments.
//!
//! The risk score is derived from the card's last transactions, so any
//! mutation that appends a transaction invalidates the card's entry.
//!
//! ## Fill Protocol
//!
//! A reader that misses takes a [`Generation`] before reading the store and
//! hands it back to [`RiskCache::put`]. Every invalidation bumps the cache
//! generation, and `put` drops an assessment computed under an older one.
//! A fill racing with a committed change therefore never outlives it.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::cards::RiskAssessment;

struct CacheEntry {
    assessment: RiskAssessment,
    inserted_at: Instant,
}

struct CacheState {
    entries: LruCache<String, CacheEntry>,
    generation: u64,
}

/// Cache generation observed before computing an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

/// In-process LRU cache keyed by card ID.
pub struct RiskCache {
    state: Mutex<CacheState>,
    ttl: Duration,
}

impl RiskCache {
    /// Create a new cache with the given capacity and TTL.
    ///
    /// - `capacity`: Max number of cards to cache (at least one).
    /// - `ttl`: Time-to-live for each cache entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
                generation: 0,
            }),
            ttl,
        }
    }

    /// Returns `None` if not cached or expired.
    pub fn get(&self, card_id: &str) -> Option<RiskAssessment> {
        let mut state = self.state.lock().ok()?;
        if let Some(entry) = state.entries.get(card_id) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.assessment);
            }
            state.entries.pop(card_id);
        }
        None
    }

    /// Take before reading the transactions an assessment is computed from.
    pub fn generation(&self) -> Generation {
        Generation(self.state.lock().map(|state| state.generation).unwrap_or(u64::MAX))
    }

    /// Store an assessment unless the cache was invalidated since `seen`.
    ///
    /// Returns whether the assessment was stored.
    pub fn put(&self, card_id: &str, assessment: RiskAssessment, seen: Generation) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        if state.generation != seen.0 {
            return false;
        }
        state.entries.put(
            card_id.to_string(),
            CacheEntry {
                assessment,
                inserted_at: Instant::now(),
            },
        );
        true
    }

    pub fn invalidate(&self, card_id: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.entries.pop(card_id);
            state.generation = state.generation.wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::assess_risk;

    fn fill(cache: &RiskCache, card_id: &str) {
        assert!(cache.put(card_id, assess_risk(&[]), cache.generation()));
    }

    #[test]
    fn cache_put_and_get() {
        let cache = RiskCache::new(10, Duration::from_secs(300));
        assert!(cache.get("card-1").is_none());

        fill(&cache, "card-1");
        let cached = cache.get("card-1").unwrap();
        assert_eq!(cached.score, 0.05);
        assert_eq!(cached.total_analyzed, 0);
    }

    #[test]
    fn cache_invalidate() {
        let cache = RiskCache::new(10, Duration::from_secs(300));
        fill(&cache, "card-1");
        cache.invalidate("card-1");
        assert!(cache.get("card-1").is_none());
    }

    #[test]
    fn fill_computed_before_invalidation_is_dropped() {
        let cache = RiskCache::new(10, Duration::from_secs(300));

        assert!(cache.get("card-1").is_none());
        let seen = cache.generation();
        let stale = assess_risk(&[]);
        // A committed change lands between the read and the fill
        cache.invalidate("card-1");

        assert!(!cache.put("card-1", stale, seen));
        assert!(cache.get("card-1").is_none());

        // The next reader fills normally.
        fill(&cache, "card-1");
        assert!(cache.get("card-1").is_some());
    }

    #[test]
    fn cache_ttl_expiry() {
        let cache = RiskCache::new(10, Duration::from_millis(1));
        fill(&cache, "card-1");

        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.get("card-1").is_none());
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let cache = RiskCache::new(1, Duration::from_secs(300));
        fill(&cache, "card-1");
        fill(&cache, "card-2");
        assert!(cache.get("card-1").is_none());
        assert!(cache.get("card-2").is_some());
    }
}
