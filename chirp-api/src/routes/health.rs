//! Health Check Endpoints
//!
//! Kubernetes-compatible health checks:
//! - /health/ping - Simple liveness check
//! - /health/live - Process alive check
//! - /health/ready - Graph store and cache reachability
//!
//! No authentication required for health endpoints.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chirp_storage::{CoherentCache, GraphStore};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    /// The store answers but the cache does not; reads fall through to the store
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDetails {
    pub store: ComponentHealth,
    pub cache: ComponentHealth,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    fn healthy(latency_ms: u64) -> Self {
        Self {
            status: HealthStatus::Healthy,
            latency_ms: Some(latency_ms),
            error: None,
        }
    }

    fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            error: Some(error.into()),
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready
///
/// 503 when the store is unreachable. An unreachable cache only degrades
/// the service, so it still answers 200.
pub async fn readiness(
    State(store): State<Arc<dyn GraphStore>>,
    State(cache): State<CoherentCache>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let started = Instant::now();
    let store_health = match store.ping().await {
        Ok(()) => ComponentHealth::healthy(started.elapsed().as_millis() as u64),
        Err(e) => ComponentHealth::unhealthy(format!("Store check failed: {}", e)),
    };

    let started = Instant::now();
    let cache_health = if cache.is_healthy().await {
        ComponentHealth::healthy(started.elapsed().as_millis() as u64)
    } else {
        ComponentHealth::unhealthy("Cache backend unreachable")
    };

    let status = match (store_health.status, cache_health.status) {
        (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
        (HealthStatus::Healthy, _) => HealthStatus::Degraded,
        _ => HealthStatus::Unhealthy,
    };

    let response = HealthResponse {
        status,
        message: None,
        details: Some(HealthDetails {
            store: store_health,
            cache: cache_health,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: start_time.elapsed().as_secs(),
        }),
    };

    let status_code = if status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status_code, Json(response))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create health check router (no auth required)
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() -> Result<(), String> {
        let response = HealthResponse {
            status: HealthStatus::Degraded,
            message: None,
            details: None,
        };
        let json = serde_json::to_string(&response).map_err(|e| e.to_string())?;
        assert_eq!(json, r#"{"status":"degraded"}"#);
        Ok(())
    }

    #[test]
    fn test_component_health_with_error() -> Result<(), String> {
        let component = ComponentHealth::unhealthy("Connection refused");
        let json = serde_json::to_string(&component).map_err(|e| e.to_string())?;
        assert!(json.contains("\"status\":\"unhealthy\""));
        assert!(json.contains("Connection refused"));
        assert!(!json.contains("latency_ms"));
        Ok(())
    }
}
