//! Cache Manager Module
//!
//! Presents the memory and persistent tiers as one API with a tier selector,
//! and promotes persistent hits into memory on combined lookups.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{ManagerStats, MemoryCache, PersistentCache, PersistentStats};
use crate::config::Config;
use crate::error::Result;

/// Key prefix shared by the device cache façade.
pub const DEVICE_KEY_PREFIX: &str = "device_";

// == Tier ==
/// Which storage tiers an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Memory,
    Persistent,
    #[default]
    Both,
}

impl Tier {
    pub fn includes_memory(self) -> bool {
        matches!(self, Tier::Memory | Tier::Both)
    }

    pub fn includes_persistent(self) -> bool {
        matches!(self, Tier::Persistent | Tier::Both)
    }
}

// == Write Outcomes ==
/// Result of writing to a single tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TierWrite {
    /// Tier not selected
    Skipped,
    Written,
    Failed,
}

/// Per-tier outcome of a `set`. Tiers are written independently, so one may
/// fail while the other succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SetOutcome {
    pub memory: TierWrite,
    pub persistent: TierWrite,
}

impl SetOutcome {
    /// True when some selected tier failed to store the value.
    pub fn is_partial(&self) -> bool {
        self.memory == TierWrite::Failed || self.persistent == TierWrite::Failed
    }

    /// True when every selected tier stored the value.
    pub fn is_complete(&self) -> bool {
        !self.is_partial()
    }
}

/// Number of entries removed from each tier by a cleanup pass.
///
/// A persistent tier that could not be swept reports 0 removals and the
/// failure in `persistent_error`; the memory count is still valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub memory: usize,
    pub persistent: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent_error: Option<String>,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.memory + self.persistent
    }

    /// True when some tier could not be swept.
    pub fn is_partial(&self) -> bool {
        self.persistent_error.is_some()
    }
}

// == Cache Manager ==
/// Two-tier cache facade.
///
/// Holds no lock of its own; each tier serializes its own operations.
#[derive(Debug)]
pub struct CacheManager {
    memory: MemoryCache,
    persistent: PersistentCache,
}

impl CacheManager {
    // == Constructors ==
    /// Builds both tiers from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let memory = MemoryCache::new(config.memory_capacity, config.memory_default_ttl);
        let persistent =
            PersistentCache::open(&config.cache_dir, config.persistent_default_ttl)?
                .with_record_access(config.persistent_record_access);
        info!(
            memory_capacity = config.memory_capacity,
            cache_dir = %config.cache_dir.display(),
            "cache manager initialized"
        );
        Ok(Self::new(memory, persistent))
    }

    pub fn new(memory: MemoryCache, persistent: PersistentCache) -> Self {
        Self { memory, persistent }
    }

    pub fn memory(&self) -> &MemoryCache {
        &self.memory
    }

    pub fn persistent(&self) -> &PersistentCache {
        &self.persistent
    }

    // == Get ==
    /// Looks `key` up in the selected tiers, memory first.
    ///
    /// A persistent hit under `Tier::Both` is copied into memory with the
    /// memory tier's default TTL; the persistent entry's deadline is not
    /// carried over.
    pub fn get_value(&self, key: &str, tier: Tier) -> Option<Value> {
        if tier.includes_memory() {
            if let Some(value) = self.memory.get(key) {
                return Some(value);
            }
        }

        if tier.includes_persistent() {
            if let Some(value) = self.persistent.get(key) {
                if tier == Tier::Both {
                    self.memory.set(key, value.clone(), None);
                    debug!(key, "promoted persistent hit to memory");
                }
                return Some(value);
            }
        }

        None
    }

    /// Typed lookup. A stored value of the wrong shape is an error.
    pub fn get<T: DeserializeOwned>(&self, key: &str, tier: Tier) -> Result<Option<T>> {
        match self.get_value(key, tier) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    // == Set ==
    /// Writes a raw value to each selected tier.
    ///
    /// `ttl` of None uses each tier's own default.
    pub fn set_value(&self, key: &str, value: Value, ttl: Option<u64>, tier: Tier) -> SetOutcome {
        let mut outcome = SetOutcome {
            memory: TierWrite::Skipped,
            persistent: TierWrite::Skipped,
        };

        if tier.includes_persistent() {
            outcome.persistent = match self.persistent.set(key, value.clone(), ttl) {
                Ok(()) => TierWrite::Written,
                Err(_) => TierWrite::Failed,
            };
        }

        if tier.includes_memory() {
            self.memory.set(key, value, ttl);
            outcome.memory = TierWrite::Written;
        }

        if outcome.is_partial() {
            warn!(key, ?outcome, "cache set only partially succeeded");
        }
        outcome
    }

    /// Serializes `value` and writes it to each selected tier.
    ///
    /// Fails only if `value` cannot be serialized; tier failures are
    /// reported in the returned outcome.
    pub fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<u64>,
        tier: Tier,
    ) -> Result<SetOutcome> {
        let value = serde_json::to_value(value)?;
        Ok(self.set_value(key, value, ttl, tier))
    }

    // == Delete ==
    /// Removes `key` from each selected tier. True if any tier held it.
    pub fn delete(&self, key: &str, tier: Tier) -> bool {
        let mut removed = false;
        if tier.includes_memory() {
            removed |= self.memory.delete(key);
        }
        if tier.includes_persistent() {
            removed |= self.persistent.delete(key);
        }
        removed
    }

    // == Clear ==
    /// Clears each selected tier.
    pub fn clear(&self, tier: Tier) {
        if tier.includes_memory() {
            self.memory.clear();
        }
        if tier.includes_persistent() {
            if let Err(err) = self.persistent.clear() {
                warn!(error = %err, "failed to clear persistent tier");
            }
        }
    }

    // == Cleanup Expired ==
    /// Purges expired entries from both tiers.
    ///
    /// A persistent failure is recorded in the report instead of discarding
    /// the memory tier's result.
    pub fn cleanup_expired(&self) -> CleanupReport {
        let memory = self.memory.cleanup_expired();
        let (persistent, persistent_error) = match self.persistent.cleanup_expired() {
            Ok(removed) => (removed, None),
            Err(err) => {
                warn!(error = %err, "failed to sweep persistent tier");
                (0, Some(err.to_string()))
            }
        };
        CleanupReport {
            memory,
            persistent,
            persistent_error,
        }
    }

    // == Stats ==
    /// Aggregated statistics of both tiers.
    pub fn stats(&self) -> ManagerStats {
        let (persistent, persistent_error) = match self.persistent.stats() {
            Ok(stats) => (stats, None),
            Err(err) => {
                warn!(error = %err, "failed to read persistent tier stats");
                let empty = PersistentStats {
                    files: 0,
                    total_bytes: 0,
                    cache_dir: self.persistent.dir().to_path_buf(),
                };
                (empty, Some(err.to_string()))
            }
        };

        ManagerStats {
            memory: self.memory.stats(),
            persistent,
            persistent_error,
            device_keys: self.memory.count_with_prefix(DEVICE_KEY_PREFIX),
        }
    }
}
