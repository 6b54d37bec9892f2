//! REST API Routes Module
//!
//! Route handlers grouped by resource, plus the router builder that puts
//! the security stack around them.
//!
//! Includes:
//! - Tweets, users, notifications and direct messages under /api/v1
//! - The WebSocket upgrade at /ws
//! - Health checks (Kubernetes-compatible) and Prometheus metrics
//! - CORS support for browser-based clients

pub mod health;
pub mod messages;
pub mod notifications;
pub mod tweets;
pub mod users;

use std::time::Duration;

use axum::{
    http::{header, header::HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{
    auth_middleware, rate_limit_middleware, AuthMiddlewareState, RateLimitState,
};
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};
use crate::ws::ws_handler;

pub use health::create_router as health_router;
pub use messages::create_router as messages_router;
pub use notifications::create_router as notifications_router;
pub use tweets::create_router as tweets_router;
pub use users::create_router as users_router;

// ============================================================================
// PRODUCTION VALIDATION
// ============================================================================

fn is_production_environment() -> bool {
    std::env::var("CHIRP_ENVIRONMENT")
        .map(|e| matches!(e.to_lowercase().as_str(), "production" | "prod"))
        .unwrap_or(false)
}

fn validate_api_config_for_production(config: &ApiConfig) -> ApiResult<()> {
    if config.cors_origins.is_empty() {
        return Err(ApiError::invalid_input(
            "CORS origins not configured for production. Set CHIRP_CORS_ORIGINS.",
        ));
    }
    if !config.rate_limit_enabled {
        tracing::warn!(
            "Rate limiting is disabled in production. \
             Set CHIRP_RATE_LIMIT_ENABLED=true to enable it."
        );
    }
    Ok(())
}

// ============================================================================
// SECURE ROUTER BUILDER
// ============================================================================

/// Builds the application router with auth and rate limiting in place.
///
/// Every `/api/v1` route requires a bearer token except the public feed
/// and single-tweet reads. Health, metrics and the WebSocket endpoint sit
/// outside `/api/v1`; the socket authenticates during its own handshake.
pub struct SecureRouterBuilder {
    state: AppState,
    auth_state: AuthMiddlewareState,
    rate_limit_state: RateLimitState,
}

impl SecureRouterBuilder {
    /// In production this refuses insecure secrets and open CORS.
    pub fn new(state: AppState) -> ApiResult<Self> {
        state.api_config.validate()?;
        state.auth_config.validate_for_production()?;
        if is_production_environment() {
            validate_api_config_for_production(&state.api_config)?;
        }

        let auth_state = AuthMiddlewareState::from_shared(state.auth_config.clone());
        let rate_limit_state = RateLimitState::new(state.api_config.as_ref().clone());

        Ok(Self {
            state,
            auth_state,
            rate_limit_state,
        })
    }

    fn build_public_routes(&self) -> Router<AppState> {
        Router::new().nest("/tweets", tweets::public_router())
    }

    fn build_protected_routes(&self) -> Router<AppState> {
        Router::new()
            .nest("/tweets", tweets::create_router(self.rate_limit_state.clone()))
            .nest("/users", users::create_router())
            .nest("/notifications", notifications::create_router())
            .nest("/messages", messages::create_router(self.rate_limit_state.clone()))
            .layer(from_fn_with_state(self.auth_state.clone(), auth_middleware))
    }

    /// Build the complete router.
    ///
    /// # Middleware Order (outer to inner)
    /// 1. CORS - handles preflight requests
    /// 2. Observability - tracing and metrics
    /// 3. API rate limit (only under /api/v1)
    /// 4. Auth (only on protected routes)
    /// 5. Per-user tweet and message budgets (only on those two routes)
    pub fn build(self) -> Router {
        let api_routes = self
            .build_public_routes()
            .merge(self.build_protected_routes())
            .layer(from_fn_with_state(
                self.rate_limit_state.clone(),
                rate_limit_middleware,
            ));

        let cors = build_cors_layer(&self.state.api_config);

        Router::new()
            .nest("/api/v1", api_routes)
            .nest("/health", health::create_router())
            .route("/ws", get(ws_handler))
            .route("/metrics", get(metrics_handler))
            .layer(from_fn(observability_middleware))
            .layer(cors)
            .with_state(self.state)
    }
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderName::from_static("retry-after"),
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any).allow_headers(Any).expose_headers(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

/// Create the complete application router.
///
/// - REST API under /api/v1/* (auth required except the public tweet reads)
/// - WebSocket delivery hub at /ws
/// - Health checks at /health/* (public)
/// - Metrics at /metrics (public)
pub fn create_api_router(state: AppState) -> ApiResult<Router> {
    SecureRouterBuilder::new(state).map(SecureRouterBuilder::build)
}
