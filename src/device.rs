//! Device Cache
//!
//! Fixed key prefixes, TTLs and tiers for device-related lookups, layered on
//! top of [`CacheManager`]. Each getter reads from the tier its setter writes.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{CacheManager, SetOutcome, Tier};
use crate::error::Result;

/// Device metadata lifetime: 30 minutes, both tiers.
pub const DEVICE_INFO_TTL: u64 = 1800;
/// Scan result lifetime: 5 minutes, memory only.
pub const DEVICE_SCAN_TTL: u64 = 300;
/// Per-method result lifetime: 2 hours, persistent only.
pub const METHOD_RESULT_TTL: u64 = 7200;

const DEVICE_INFO_TIER: Tier = Tier::Both;
const DEVICE_SCAN_TIER: Tier = Tier::Memory;
const METHOD_RESULT_TIER: Tier = Tier::Persistent;

/// Cache for device metadata, scan results and per-method results.
#[derive(Debug, Clone)]
pub struct DeviceCache {
    manager: Arc<CacheManager>,
}

impl DeviceCache {
    pub fn new(manager: Arc<CacheManager>) -> Self {
        Self { manager }
    }

    pub fn cache_device_info<T: Serialize + ?Sized>(
        &self,
        device_id: &str,
        info: &T,
    ) -> Result<SetOutcome> {
        self.manager.set(
            &device_info_key(device_id),
            info,
            Some(DEVICE_INFO_TTL),
            DEVICE_INFO_TIER,
        )
    }

    pub fn device_info<T: DeserializeOwned>(&self, device_id: &str) -> Result<Option<T>> {
        self.manager
            .get(&device_info_key(device_id), DEVICE_INFO_TIER)
    }

    pub fn cache_scan_result<T: Serialize + ?Sized>(
        &self,
        scan_hash: &str,
        devices: &T,
    ) -> Result<SetOutcome> {
        self.manager.set(
            &scan_key(scan_hash),
            devices,
            Some(DEVICE_SCAN_TTL),
            DEVICE_SCAN_TIER,
        )
    }

    pub fn scan_result<T: DeserializeOwned>(&self, scan_hash: &str) -> Result<Option<T>> {
        self.manager.get(&scan_key(scan_hash), DEVICE_SCAN_TIER)
    }

    /// Stores the outcome of running `method` against a device.
    pub fn cache_method_result<T: Serialize + ?Sized>(
        &self,
        device_id: &str,
        method: &str,
        result: &T,
    ) -> Result<SetOutcome> {
        self.manager.set(
            &method_result_key(device_id, method),
            result,
            Some(METHOD_RESULT_TTL),
            METHOD_RESULT_TIER,
        )
    }

    pub fn method_result<T: DeserializeOwned>(
        &self,
        device_id: &str,
        method: &str,
    ) -> Result<Option<T>> {
        self.manager
            .get(&method_result_key(device_id, method), METHOD_RESULT_TIER)
    }

    /// Drops everything cached for a device's metadata.
    pub fn forget_device(&self, device_id: &str) -> bool {
        self.manager
            .delete(&device_info_key(device_id), DEVICE_INFO_TIER)
    }
}

fn device_info_key(device_id: &str) -> String {
    format!("device_info:{device_id}")
}

fn scan_key(scan_hash: &str) -> String {
    format!("device_scan:{scan_hash}")
}

fn method_result_key(device_id: &str, method: &str) -> String {
    format!("method_result:{device_id}:{method}")
}
