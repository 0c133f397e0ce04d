//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::{
    CleanupReport, EntryInfo, ManagerStats, MemoryStats, PersistentStats, SetOutcome, Tier,
};

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: Value,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Outcome message
    pub message: String,
    /// The key that was set
    pub key: String,
    /// Per-tier write result
    pub outcome: SetOutcome,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>, outcome: SetOutcome) -> Self {
        let key = key.into();
        let message = if outcome.is_complete() {
            format!("Key '{}' set successfully", key)
        } else {
            format!("Key '{}' set partially", key)
        };
        Self {
            message,
            key,
            outcome,
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for POST /clear
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
    pub tier: Tier,
}

impl ClearResponse {
    pub fn new(tier: Tier) -> Self {
        Self {
            message: "Cache cleared".to_string(),
            tier,
        }
    }
}

/// Response body for POST /cleanup
#[derive(Debug, Clone, Serialize)]
pub struct CleanupResponse {
    pub memory_removed: usize,
    pub persistent_removed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent_error: Option<String>,
}

impl From<CleanupReport> for CleanupResponse {
    fn from(report: CleanupReport) -> Self {
        Self {
            memory_removed: report.memory,
            persistent_removed: report.persistent,
            persistent_error: report.persistent_error,
        }
    }
}

/// Memory tier section of the stats response
#[derive(Debug, Clone, Serialize)]
pub struct MemoryStatsResponse {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub total_requests: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<MemoryStats> for MemoryStatsResponse {
    fn from(stats: MemoryStats) -> Self {
        Self {
            size: stats.size,
            capacity: stats.capacity,
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            expirations: stats.expirations,
            total_requests: stats.total_requests(),
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Persistent tier section of the stats response
#[derive(Debug, Clone, Serialize)]
pub struct PersistentStatsResponse {
    pub files: usize,
    pub total_size_bytes: u64,
    pub total_size_mb: f64,
    pub cache_dir: String,
}

impl From<PersistentStats> for PersistentStatsResponse {
    fn from(stats: PersistentStats) -> Self {
        Self {
            files: stats.files,
            total_size_bytes: stats.total_bytes,
            total_size_mb: stats.total_mb(),
            cache_dir: stats.cache_dir.display().to_string(),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub memory: MemoryStatsResponse,
    pub persistent: PersistentStatsResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent_error: Option<String>,
    pub device_cache_keys: usize,
}

impl From<ManagerStats> for StatsResponse {
    fn from(stats: ManagerStats) -> Self {
        Self {
            memory: stats.memory.into(),
            persistent: stats.persistent.into(),
            persistent_error: stats.persistent_error,
            device_cache_keys: stats.device_keys,
        }
    }
}

/// Response body for GET /entries
#[derive(Debug, Clone, Serialize)]
pub struct EntriesResponse {
    pub count: usize,
    pub entries: Vec<EntryInfo>,
}

impl EntriesResponse {
    pub fn new(entries: Vec<EntryInfo>) -> Self {
        Self {
            count: entries.len(),
            entries,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
