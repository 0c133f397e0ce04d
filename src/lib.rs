//! Tiered Cache - A two-tier cache for expensive lookups
//!
//! Provides a bounded memory tier with TTL expiration and LRU eviction, a
//! self-healing disk tier, a manager that combines them with promotion and
//! memoization, and a background expiration sweeper.

pub mod api;
pub mod cache;
pub mod config;
pub mod device;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheManager, Memoized, Tier};
pub use config::Config;
pub use device::DeviceCache;
pub use error::{CacheError, Result};
pub use tasks::{spawn_sweeper, SweeperHandle};
