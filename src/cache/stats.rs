//! Cache Statistics Module
//!
//! Snapshots of tier performance: hit/miss counters for the memory tier, file
//! counts for the persistent tier, and the aggregate returned by the manager.

use std::path::PathBuf;

use serde::Serialize;

// == Memory Stats ==
/// Counters and occupancy for the memory tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryStats {
    /// Number of successful retrievals
    pub hits: u64,
    /// Number of failed retrievals (absent or expired)
    pub misses: u64,
    /// Number of entries evicted to make room
    pub evictions: u64,
    /// Number of entries removed because their TTL elapsed
    pub expirations: u64,
    /// Current number of entries
    pub size: usize,
    /// Maximum number of entries
    pub capacity: usize,
}

impl MemoryStats {
    // == Constructor ==
    /// Creates a new MemoryStats with all counters at zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Total number of `get` calls observed.
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }
}

// == Persistent Stats ==
/// Disk usage of the persistent tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistentStats {
    /// Number of managed cache files
    pub files: usize,
    /// Combined size of the managed files
    pub total_bytes: u64,
    /// Cache directory
    pub cache_dir: PathBuf,
}

impl PersistentStats {
    /// Total size in mebibytes, rounded to two decimals.
    pub fn total_mb(&self) -> f64 {
        (self.total_bytes as f64 / 1024.0 / 1024.0 * 100.0).round() / 100.0
    }
}

// == Manager Stats ==
/// Aggregate of both tiers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManagerStats {
    pub memory: MemoryStats,
    /// Zeroed when the directory could not be read; see `persistent_error`
    pub persistent: PersistentStats,
    /// Why the persistent tier's stats are unavailable, if they are
    pub persistent_error: Option<String>,
    /// Live memory keys belonging to the device cache
    pub device_keys: usize,
}
