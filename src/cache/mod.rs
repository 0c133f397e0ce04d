//! Cache Module
//!
//! Two-tier caching: a bounded memory tier with TTL expiration and LRU
//! eviction, a disk-backed persistent tier, and a manager combining them.

mod entry;
mod manager;
mod memoize;
mod memory;
mod persistent;
mod stats;


// Re-export public types
pub use entry::{Entry, EntryInfo};
pub use manager::{CacheManager, CleanupReport, SetOutcome, Tier, TierWrite, DEVICE_KEY_PREFIX};
pub use memoize::{memo_key, Memoized, MEMO_KEY_PREFIX};
pub use memory::MemoryCache;
pub use persistent::{key_digest, PersistentCache, CACHE_FILE_EXTENSION};
pub use stats::{ManagerStats, MemoryStats, PersistentStats};

// == Public Constants ==
/// Maximum allowed key length in bytes for requests from the HTTP surface
pub const MAX_KEY_LENGTH: usize = 256;
