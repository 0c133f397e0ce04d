//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of the cache.
//!
//! # Tasks
//! - Expiration sweep: purges expired entries from both tiers at a fixed interval

mod sweeper;

pub use sweeper::{spawn_sweeper, SweeperHandle};
