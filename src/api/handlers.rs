//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. Cache operations may
//! touch the disk, so they run on the blocking pool.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::{CacheManager, Tier};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::requests::validate_key;
use crate::models::{
    CleanupResponse, ClearResponse, DeleteResponse, EntriesResponse, GetResponse, HealthResponse,
    SetRequest, SetResponse, StatsResponse, TierQuery,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared two-tier cache
    pub cache: Arc<CacheManager>,
}

impl AppState {
    /// Creates a new AppState around an existing manager.
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self { cache }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Arc::new(CacheManager::from_config(config)?)))
    }
}

/// Runs a cache operation on the blocking pool.
async fn run_blocking<T, F>(state: &AppState, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&CacheManager) -> T + Send + 'static,
{
    let cache = Arc::clone(&state.cache);
    tokio::task::spawn_blocking(move || op(&cache))
        .await
        .map_err(|err| CacheError::Internal(format!("cache task failed: {}", err)))
}

/// Handler for PUT /set
///
/// Stores a JSON value in the selected tiers with optional TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let SetRequest {
        key,
        value,
        ttl,
        tier,
    } = req;
    let outcome = {
        let key = key.clone();
        run_blocking(&state, move |cache| cache.set_value(&key, value, ttl, tier)).await?
    };

    Ok(Json(SetResponse::new(key, outcome)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value from the selected tiers.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<TierQuery>,
) -> Result<Json<GetResponse>> {
    if let Some(error_msg) = validate_key(&key) {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let lookup = key.clone();
    let value = run_blocking(&state, move |cache| cache.get_value(&lookup, query.tier)).await?;

    match value {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
///
/// Deletes a key from the selected tiers.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<TierQuery>,
) -> Result<Json<DeleteResponse>> {
    if let Some(error_msg) = validate_key(&key) {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let target = key.clone();
    let removed = run_blocking(&state, move |cache| cache.delete(&target, query.tier)).await?;

    if removed {
        Ok(Json(DeleteResponse::new(key)))
    } else {
        Err(CacheError::NotFound(key))
    }
}

/// Handler for POST /clear
///
/// Clears the selected tiers.
pub async fn clear_handler(
    State(state): State<AppState>,
    Query(query): Query<TierQuery>,
) -> Result<Json<ClearResponse>> {
    let tier: Tier = query.tier;
    run_blocking(&state, move |cache| cache.clear(tier)).await?;
    Ok(Json(ClearResponse::new(tier)))
}

/// Handler for POST /cleanup
///
/// Runs an expiration sweep immediately.
pub async fn cleanup_handler(State(state): State<AppState>) -> Result<Json<CleanupResponse>> {
    let report = run_blocking(&state, |cache| cache.cleanup_expired()).await?;
    Ok(Json(report.into()))
}

/// Handler for GET /stats
///
/// Returns statistics of both tiers.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let stats = run_blocking(&state, |cache| cache.stats()).await?;
    Ok(Json(stats.into()))
}

/// Handler for GET /entries
///
/// Lists metadata of the memory tier's entries.
pub async fn entries_handler(State(state): State<AppState>) -> Json<EntriesResponse> {
    Json(EntriesResponse::new(state.cache.memory().entries()))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
