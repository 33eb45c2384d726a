// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::ids::random_request_id;
use crate::trade::set::TradeSet;
use dashmap::DashMap;

/// Concurrent id → trade-set map. The HTTP surface inserts and snapshots;
/// the tick handler is the only writer of existing entries. Sets are never
/// evicted; losing them on restart is acceptable, unbounded growth is a known
/// gap.
#[derive(Default)]
pub struct TradeRegistry {
    sets: DashMap<String, TradeSet>,
}

impl TradeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh request id and store the set built for it. Ids already
    /// in use are redrawn, so an id is never assigned twice.
    pub fn insert_with<F>(&self, build: F) -> String
    where
        F: FnOnce(String) -> TradeSet,
    {
        let id = loop {
            let candidate = random_request_id();
            if !self.sets.contains_key(&candidate) {
                break candidate;
            }
        };
        self.sets.insert(id.clone(), build(id.clone()));
        id
    }

    /// Point-in-time snapshot for status queries. Fields are mutually
    /// consistent only per-field; a concurrent tick may land between reads.
    pub fn snapshot(&self, id: &str) -> Option<TradeSet> {
        self.sets.get(id).map(|entry| entry.value().clone())
    }

    pub fn ids(&self) -> Vec<String> {
        self.sets.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Replace a set wholesale. Only the tick handler calls this, with a set
    /// it snapshotted at the start of the same tick.
    pub fn store(&self, set: TradeSet) {
        self.sets.insert(set.id.clone(), set);
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
