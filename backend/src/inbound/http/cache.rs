//! Cache API handlers.
//!
//! ```text
//! GET    /api/cache/{key}
//! PUT    /api/cache/{key} {"value":{"name":"alice"},"ttl":60}
//! DELETE /api/cache/{key}
//! ```

use std::time::Duration;

use actix_web::{HttpResponse, delete, get, put, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::ApiResult;
use super::state::HttpState;
use crate::domain::Error;

/// TTL applied when a write omits one or sends zero.
pub const DEFAULT_TTL_SECS: u64 = 3600;
const CACHE_LABEL: &str = "redis-cluster";

/// Body of `PUT /api/cache/{key}`.
#[derive(Debug, Deserialize)]
pub struct PutCacheRequest {
    /// Any JSON value; stored as its JSON text.
    #[serde(default)]
    pub value: Value,
    /// Expiry in seconds.
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl PutCacheRequest {
    fn effective_ttl(&self) -> u64 {
        self.ttl.filter(|ttl| *ttl > 0).unwrap_or(DEFAULT_TTL_SECS)
    }
}

#[derive(Debug, Serialize)]
struct GetCacheResponse {
    operation: &'static str,
    key: String,
    value: Option<String>,
    found: bool,
    source: &'static str,
}

#[derive(Debug, Serialize)]
struct SetCacheResponse {
    operation: &'static str,
    key: String,
    value: Value,
    ttl: u64,
    success: bool,
    destination: &'static str,
}

#[derive(Debug, Serialize)]
struct DeleteCacheResponse {
    operation: &'static str,
    key: String,
    deleted: bool,
    destination: &'static str,
}

/// Read a key. Misses and backend failures both answer `found: false`.
#[get("/cache/{key}")]
pub async fn get_cache(state: web::Data<HttpState>, key: web::Path<String>) -> HttpResponse {
    let key = key.into_inner();
    let value = state.cache.get(&key).await;
    HttpResponse::Ok().json(GetCacheResponse {
        operation: "GET",
        found: value.is_some(),
        value,
        key,
        source: CACHE_LABEL,
    })
}

/// Store a JSON value. A failed write answers 503.
#[put("/cache/{key}")]
pub async fn put_cache(
    state: web::Data<HttpState>,
    key: web::Path<String>,
    payload: web::Json<PutCacheRequest>,
) -> ApiResult<HttpResponse> {
    let key = key.into_inner();
    let request = payload.into_inner();
    let ttl = request.effective_ttl();
    let encoded = serde_json::to_string(&request.value)
        .map_err(|err| Error::invalid_request(format!("value is not serializable: {err}")))?;

    state
        .cache
        .set(&key, &encoded, Some(Duration::from_secs(ttl)))
        .await
        .map_err(|err| {
            Error::service_unavailable("cache write failed")
                .with_details(json!({ "key": key, "reason": err.to_string() }))
        })?;

    Ok(HttpResponse::Ok().json(SetCacheResponse {
        operation: "SET",
        key,
        value: request.value,
        ttl,
        success: true,
        destination: CACHE_LABEL,
    }))
}

/// Remove a key. Failures read as `deleted: false`.
#[delete("/cache/{key}")]
pub async fn delete_cache(state: web::Data<HttpState>, key: web::Path<String>) -> HttpResponse {
    let key = key.into_inner();
    let deleted = state.cache.delete(&key).await;
    HttpResponse::Ok().json(DeleteCacheResponse {
        operation: "DELETE",
        key,
        deleted,
        destination: CACHE_LABEL,
    })
}
