//! Cache Statistics Module
//!
//! Per-request counters, a chronological trace log and a group → ids access map.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::store::{ServerInfo, ServerStats};

// == Counter ==
/// Named counters kept for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// Served from the local cache
    SessionHit,
    /// Served from the persistent tier
    PersistentHit,
    /// Not found, or persistent tier unavailable
    Miss,
    /// Persistent tier skipped for policy reasons
    Excluded,
    /// Persistent write lost a race or failed
    Failure,
    /// Persistent write succeeded
    Update,
}

// == Cache Counts ==
/// Counter values, serialized under `counts`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheCounts {
    pub session_hits: u64,
    pub persistent_hits: u64,
    pub misses: u64,
    pub excluded: u64,
    pub failures: u64,
    pub updates: u64,
}

impl CacheCounts {
    /// Fraction of reads answered by either tier.
    ///
    /// Returns 0.0 if no reads have been recorded.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.session_hits + self.persistent_hits;
        let total = hits + self.misses + self.excluded;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

// == Stats Recorder ==
/// Accumulates statistics for a single request. Not shared across requests.
#[derive(Debug, Clone, Default)]
pub struct StatsRecorder {
    counts: CacheCounts,
    log: Vec<String>,
    map: BTreeMap<String, Vec<String>>,
}

impl StatsRecorder {
    // == Constructor ==
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record ==
    /// Appends a line to the trace log.
    pub fn record(&mut self, message: impl Into<String>) {
        self.log.push(message.into());
    }

    // == Increment ==
    /// Bumps a counter and returns its new value.
    pub fn increment(&mut self, counter: Counter) -> u64 {
        let slot = match counter {
            Counter::SessionHit => &mut self.counts.session_hits,
            Counter::PersistentHit => &mut self.counts.persistent_hits,
            Counter::Miss => &mut self.counts.misses,
            Counter::Excluded => &mut self.counts.excluded,
            Counter::Failure => &mut self.counts.failures,
            Counter::Update => &mut self.counts.updates,
        };
        *slot += 1;
        *slot
    }

    // == Note Access ==
    /// Adds `id` to the group's access list unless already present.
    pub fn note_access(&mut self, group: &str, id: &str) {
        let ids = self.map.entry(group.to_string()).or_default();
        if !ids.iter().any(|seen| seen == id) {
            ids.push(id.to_string());
        }
    }

    pub fn counts(&self) -> &CacheCounts {
        &self.counts
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn map(&self) -> &BTreeMap<String, Vec<String>> {
        &self.map
    }

    // == Snapshot ==
    /// Copies the recorded state, attaching server introspection if given.
    pub fn snapshot(
        &self,
        server_stats: Option<BTreeMap<String, ServerStats>>,
        server_list: Option<Vec<ServerInfo>>,
    ) -> StatsSnapshot {
        StatsSnapshot {
            counts: self.counts.clone(),
            log: self.log.clone(),
            map: self.map.clone(),
            server_stats,
            server_list,
        }
    }
}

// == Stats Snapshot ==
/// Point-in-time view returned by `ObjectCache::stats`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub counts: CacheCounts,
    pub log: Vec<String>,
    pub map: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_stats: Option<BTreeMap<String, ServerStats>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_list: Option<Vec<ServerInfo>>,
}
