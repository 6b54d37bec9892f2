//! Middleware modules for the Chirp API
//!
//! - `auth`: bearer authentication and the `AuthExtractor`
//! - `rate_limit`: per-IP and per-user budgets
//!
//! # Middleware Order
//!
//! ```ignore
//! Router::new()
//!     .route("/api/v1/tweets", post(create_tweet.layer(
//!         middleware::from_fn_with_state(rate_limit_state.clone(), tweet_rate_limit_middleware),
//!     )))
//!     // Auth runs before the per-user budgets (provides the principal)
//!     .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
//!     // The per-IP budget runs first
//!     .layer(middleware::from_fn_with_state(rate_limit_state, rate_limit_middleware))
//! ```

mod auth;
mod rate_limit;

pub use auth::{
    auth_middleware, extract_auth_context, AuthExtractor, AuthMiddlewareError,
    AuthMiddlewareState,
};

pub use rate_limit::{
    message_rate_limit_middleware, rate_limit_middleware, tweet_rate_limit_middleware,
    RateLimitError, RateLimitKey, RateLimitScope, RateLimitState,
};
