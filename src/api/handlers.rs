//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. Every request opens
//! its own [`ObjectCache`] over the shared store, so the local tier lives
//! exactly as long as the request.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use tracing::debug;

use crate::cache::{ObjectCache, StaticTenant, StatsSnapshot};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    CounterParams, CounterResponse, DebugParams, DeleteResponse, GetResponse, HealthResponse,
    ItemPath, SetRequest, SetResponse, StatsResponse,
};
use crate::store::{MemoryStore, PersistentStore};

/// Header carrying the tenant id. Absent means the tenant is unresolved.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared persistent tier
    pub store: Arc<MemoryStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates a new AppState over an existing store.
    pub fn new(store: Arc<MemoryStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Registers the configured servers with a fresh in-memory store.
    pub fn from_config(config: &Config) -> Self {
        let store = MemoryStore::with_servers(config.max_entries, &config.servers);
        Self::new(Arc::new(store), config.clone())
    }

    /// Opens the cache for one request, resolving the tenant from headers.
    pub async fn open_cache(&self, headers: &HeaderMap) -> ObjectCache {
        let namespace = self.config.namespace.clone();
        let tenant = match tenant_id(headers) {
            Some(id) => StaticTenant::resolved(id, namespace),
            None => StaticTenant::unresolved(namespace),
        };
        let store: Arc<dyn PersistentStore> = self.store.clone();
        ObjectCache::connect(Some(store), Arc::new(tenant), &self.config.cache_settings()).await
    }
}

fn tenant_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn check(item: &ItemPath) -> Result<()> {
    match item.validate() {
        Some(error_msg) => Err(CacheError::InvalidRequest(error_msg)),
        None => Ok(()),
    }
}

async fn debug_stats(cache: &ObjectCache, debug: bool) -> Option<StatsSnapshot> {
    if debug {
        Some(cache.stats().await)
    } else {
        None
    }
}

/// Handler for PUT /cache/:group/:id
///
/// Stores a JSON value with optional TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item): Path<ItemPath>,
    Query(params): Query<DebugParams>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    check(&item)?;

    let mut cache = state.open_cache(&headers).await;
    cache.set(&item.id, req.value, &item.group, req.ttl).await?;

    let mut response = SetResponse::new(item.group, item.id);
    response.stats = debug_stats(&cache, params.debug).await;
    Ok(Json(response))
}

/// Handler for GET /cache/:group/:id
///
/// Retrieves a value. A miss in both tiers is reported as 404.
pub async fn get_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item): Path<ItemPath>,
    Query(params): Query<DebugParams>,
) -> Result<Json<GetResponse>> {
    check(&item)?;

    let mut cache = state.open_cache(&headers).await;
    let value = cache
        .get(&item.id, &item.group)
        .await
        .ok_or_else(|| CacheError::NotFound(format!("{}/{}", item.group, item.id)))?;

    Ok(Json(GetResponse {
        stats: debug_stats(&cache, params.debug).await,
        value: value.into_json(),
        group: item.group,
        id: item.id,
    }))
}

/// Handler for DELETE /cache/:group/:id
pub async fn delete_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item): Path<ItemPath>,
    Query(params): Query<DebugParams>,
) -> Result<Json<DeleteResponse>> {
    check(&item)?;

    let mut cache = state.open_cache(&headers).await;
    if !cache.delete(&item.id, &item.group).await? {
        return Err(CacheError::NotFound(format!("{}/{}", item.group, item.id)));
    }

    let mut response = DeleteResponse::new(item.group, item.id);
    response.stats = debug_stats(&cache, params.debug).await;
    Ok(Json(response))
}

/// Handler for POST /cache/:group/:id/incr
pub async fn incr_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item): Path<ItemPath>,
    Query(params): Query<CounterParams>,
) -> Result<Json<CounterResponse>> {
    adjust(state, headers, item, params, true).await
}

/// Handler for POST /cache/:group/:id/decr
pub async fn decr_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item): Path<ItemPath>,
    Query(params): Query<CounterParams>,
) -> Result<Json<CounterResponse>> {
    adjust(state, headers, item, params, false).await
}

async fn adjust(
    state: AppState,
    headers: HeaderMap,
    item: ItemPath,
    params: CounterParams,
    up: bool,
) -> Result<Json<CounterResponse>> {
    check(&item)?;

    let mut cache = state.open_cache(&headers).await;
    let value = if up {
        cache.incr(&item.id, params.by, &item.group).await?
    } else {
        cache.decr(&item.id, params.by, &item.group).await?
    };
    debug!(group = %item.group, id = %item.id, value, "Counter request served");

    Ok(Json(CounterResponse {
        stats: debug_stats(&cache, params.debug).await,
        value,
        group: item.group,
        id: item.id,
    }))
}

/// Handler for GET /stats
///
/// Returns a fresh request's statistics, including store introspection.
pub async fn stats_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<StatsResponse> {
    let cache = state.open_cache(&headers).await;
    Json(StatsResponse::new(cache.stats().await))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
