//! Axum Middleware for Authentication
//!
//! This module provides Axum middleware that:
//! - Authenticates requests using `Authorization: Bearer <jwt>`
//! - Injects AuthContext into request extensions
//! - Returns 401 for unauthenticated requests

use crate::auth::{authenticate, AuthConfig, AuthContext};
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

// ============================================================================
// MIDDLEWARE STATE
// ============================================================================

/// Shared state for authentication middleware.
#[derive(Debug, Clone)]
pub struct AuthMiddlewareState {
    pub auth_config: Arc<AuthConfig>,
}

impl AuthMiddlewareState {
    pub fn new(auth_config: AuthConfig) -> Self {
        Self {
            auth_config: Arc::new(auth_config),
        }
    }

    pub fn from_shared(auth_config: Arc<AuthConfig>) -> Self {
        Self { auth_config }
    }
}

// ============================================================================
// MIDDLEWARE FUNCTION
// ============================================================================

/// Axum middleware for authentication.
///
/// Validates the bearer token and injects the resulting [`AuthContext`]
/// into request extensions. Requests without a valid token never reach
/// the handler.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, middleware};
/// use chirp_api::middleware::{auth_middleware, AuthMiddlewareState};
/// use chirp_api::AuthConfig;
///
/// let auth_state = AuthMiddlewareState::new(AuthConfig::from_env());
///
/// let app = Router::new()
///     .route("/api/v1/notifications", axum::routing::get(|| async { "OK" }))
///     .layer(middleware::from_fn_with_state(auth_state, auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthMiddlewareError> {
    let auth_header = request
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok());

    let auth_context =
        authenticate(&state.auth_config, auth_header).map_err(AuthMiddlewareError)?;

    tracing::Span::current().record("user_id", tracing::field::display(auth_context.user_id));
    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Error wrapper for middleware that implements IntoResponse.
#[derive(Debug)]
pub struct AuthMiddlewareError(pub ApiError);

impl IntoResponse for AuthMiddlewareError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

// ============================================================================
// TYPED EXTRACTOR
// ============================================================================

/// Typed Axum extractor for authentication context.
///
/// The `auth_middleware` must be applied to the route or router for this
/// extractor to work. Without it the extractor returns 500.
///
/// ```ignore
/// async fn my_notifications(AuthExtractor(auth): AuthExtractor) -> String {
///     auth.username
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthExtractor(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthExtractor
where
    S: Send + Sync,
{
    type Rejection = AuthMiddlewareError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthExtractor)
            .ok_or_else(|| {
                AuthMiddlewareError(ApiError::internal_error(
                    "AuthContext not found in request extensions. \
                     Ensure auth_middleware is applied to this route.",
                ))
            })
    }
}

impl std::ops::Deref for AuthExtractor {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Extract AuthContext from request extensions.
pub fn extract_auth_context(request: &Request) -> ApiResult<&AuthContext> {
    request
        .extensions()
        .get::<AuthContext>()
        .ok_or_else(|| ApiError::unauthorized("Auth context missing from request"))
}

// ============================================================================
// TESTS
// ============================================================================
