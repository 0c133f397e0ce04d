//! Cache Entry Module
//!
//! Defines a single cached item with its metadata. The same shape is held in
//! memory and written to disk by the persistent tier.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// A cached value plus creation time, TTL and access statistics.
///
/// Expiration is absolute: it depends only on `created_at`, so reads never
/// extend an entry's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// The key this entry is stored under
    pub key: String,
    /// The stored value
    pub value: Value,
    /// Insertion time, never mutated
    pub created_at: DateTime<Utc>,
    /// TTL in seconds, 0 = never expires
    pub ttl_seconds: u64,
    /// Number of successful reads
    pub access_count: u64,
    /// Time of the most recent read, initialized to `created_at`
    pub last_access_at: DateTime<Utc>,
}

impl Entry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(key: impl Into<String>, value: Value, ttl_seconds: u64) -> Self {
        Self::new_at(key, value, ttl_seconds, Utc::now())
    }

    /// Creates a new entry with an explicit creation time.
    pub fn new_at(
        key: impl Into<String>,
        value: Value,
        ttl_seconds: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            value,
            created_at,
            ttl_seconds,
            access_count: 0,
            last_access_at: created_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired as of now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Checks if the entry has expired as of `now`.
    ///
    /// An entry is live up to and including `created_at + ttl_seconds` and
    /// expired strictly after. A TTL of 0 never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if self.ttl_seconds == 0 {
            return false;
        }
        match ttl_delta(self.ttl_seconds) {
            Some(limit) => now.signed_duration_since(self.created_at) > limit,
            None => false,
        }
    }

    // == Record Access ==
    /// Records a successful read at `now` and returns the value.
    ///
    /// `last_access_at` never moves before `created_at`, even if the wall
    /// clock steps backwards.
    pub fn access_at(&mut self, now: DateTime<Utc>) -> &Value {
        self.access_count = self.access_count.saturating_add(1);
        self.last_access_at = now.max(self.created_at);
        &self.value
    }

    /// Whole seconds elapsed since creation.
    pub fn age_seconds(&self) -> i64 {
        Utc::now().signed_duration_since(self.created_at).num_seconds()
    }

    /// Seconds of lifetime left, or None if the entry never expires.
    pub fn ttl_remaining(&self) -> Option<u64> {
        if self.ttl_seconds == 0 {
            return None;
        }
        let age = self.age_seconds().max(0) as u64;
        Some(self.ttl_seconds.saturating_sub(age))
    }

    /// Snapshot of this entry's metadata without the value.
    pub fn info(&self) -> EntryInfo {
        EntryInfo {
            key: self.key.clone(),
            age_seconds: self.age_seconds(),
            access_count: self.access_count,
            ttl_seconds: self.ttl_seconds,
            is_expired: self.is_expired(),
        }
    }
}

/// Metadata view of an entry, used for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub key: String,
    pub age_seconds: i64,
    pub access_count: u64,
    pub ttl_seconds: u64,
    pub is_expired: bool,
}

fn ttl_delta(ttl_seconds: u64) -> Option<TimeDelta> {
    i64::try_from(ttl_seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
}
