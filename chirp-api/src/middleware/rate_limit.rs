//! Rate limiting middleware.
//!
//! Three independent budgets:
//! - `Api`: every `/api` request, keyed by client IP
//! - `Messages`: message sends, keyed by authenticated user
//! - `Tweets`: tweet creation, keyed by authenticated user
//!
//! Each budget is one keyed limiter. Keys whose budget has fully refilled
//! are dropped every `PRUNE_EVERY` checks, so idle clients cost nothing.

use crate::auth::AuthContext;
use crate::config::ApiConfig;
use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

type KeyedRateLimiter =
    RateLimiter<RateLimitKey, DefaultKeyedStateStore<RateLimitKey>, DefaultClock>;

const PRUNE_EVERY: u64 = 1024;

/// Which budget a request draws from.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum RateLimitScope {
    Api,
    Messages,
    Tweets,
}

impl RateLimitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitScope::Api => "api",
            RateLimitScope::Messages => "messages",
            RateLimitScope::Tweets => "tweets",
        }
    }

    fn rejection_message(&self) -> &'static str {
        match self {
            RateLimitScope::Api => "Too many requests, please try again later",
            RateLimitScope::Messages => "Too many messages, please slow down",
            RateLimitScope::Tweets => "Too many tweets, please slow down",
        }
    }
}

/// Key for rate limiting: client IP for the API budget, user for the rest.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum RateLimitKey {
    Ip(IpAddr),
    User(String),
}

/// State for rate limiting middleware.
#[derive(Clone)]
pub struct RateLimitState {
    config: Arc<ApiConfig>,
    api: Arc<KeyedRateLimiter>,
    messages: Arc<KeyedRateLimiter>,
    tweets: Arc<KeyedRateLimiter>,
    checks: Arc<AtomicU64>,
}

impl RateLimitState {
    pub fn new(config: ApiConfig) -> Self {
        let keyed = |scope| Arc::new(RateLimiter::keyed(quota_for(&config, scope)));
        Self {
            api: keyed(RateLimitScope::Api),
            messages: keyed(RateLimitScope::Messages),
            tweets: keyed(RateLimitScope::Tweets),
            config: Arc::new(config),
            checks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Requests allowed per window for `scope`.
    pub fn limit_for(&self, scope: RateLimitScope) -> u32 {
        limit_for(&self.config, scope)
    }

    fn limiter(&self, scope: RateLimitScope) -> &KeyedRateLimiter {
        match scope {
            RateLimitScope::Api => &self.api,
            RateLimitScope::Messages => &self.messages,
            RateLimitScope::Tweets => &self.tweets,
        }
    }

    /// Draw one request from the budget.
    pub fn check(&self, scope: RateLimitScope, key: RateLimitKey) -> Result<(), RateLimitError> {
        if !self.config.rate_limit_enabled {
            return Ok(());
        }
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune();
        }
        self.limiter(scope).check_key(&key).map_err(|not_until| {
            let retry_after = not_until
                .wait_time_from(governor::clock::Clock::now(&DefaultClock::default()))
                .as_secs()
                .max(1);
            metrics_rejected(scope);
            RateLimitError { scope, retry_after }
        })
    }

    /// Forget every key whose budget is full again.
    pub fn prune(&self) {
        for limiter in [&self.api, &self.messages, &self.tweets] {
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    }

    /// Keys currently tracked across all budgets.
    pub fn tracked_keys(&self) -> usize {
        self.api.len() + self.messages.len() + self.tweets.len()
    }
}

fn limit_for(config: &ApiConfig, scope: RateLimitScope) -> u32 {
    match scope {
        RateLimitScope::Api => config.rate_limit_api_per_window,
        RateLimitScope::Messages => config.rate_limit_messages_per_minute,
        RateLimitScope::Tweets => config.rate_limit_tweets_per_minute,
    }
}

fn window_for(config: &ApiConfig, scope: RateLimitScope) -> Duration {
    match scope {
        RateLimitScope::Api => config.rate_limit_api_window,
        RateLimitScope::Messages | RateLimitScope::Tweets => Duration::from_secs(60),
    }
}

fn quota_for(config: &ApiConfig, scope: RateLimitScope) -> Quota {
    let limit = NonZeroU32::new(limit_for(config, scope)).unwrap_or(NonZeroU32::MIN);
    let period = window_for(config, scope) / limit.get();
    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_minute(limit))
        .allow_burst(limit)
}

fn metrics_rejected(scope: RateLimitScope) {
    crate::telemetry::metrics::with_metrics(|m| m.record_rate_limited(scope.as_str()));
}

/// Error type for rate limit middleware.
#[derive(Debug)]
pub struct RateLimitError {
    pub scope: RateLimitScope,
    /// Seconds until the next request would be admitted
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let mut error = ApiError::too_many_requests(Some(self.retry_after));
        error.message = self.scope.rejection_message().to_string();

        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(error.envelope())).into_response();
        response.headers_mut().insert(
            HeaderName::from_static("retry-after"),
            HeaderValue::from_str(&self.retry_after.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("60")),
        );
        response
    }
}

/// Extract client IP from request, considering proxy headers.
fn extract_client_ip(request: &Request, fallback: Option<SocketAddr>) -> IpAddr {
    if let Some(forwarded_for) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(first_ip) = forwarded_for.split(',').next() {
            if let Ok(ip) = first_ip.trim().parse() {
                return ip;
            }
        }
    }

    if let Some(real_ip) = request
        .headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
    {
        if let Ok(ip) = real_ip.trim().parse() {
            return ip;
        }
    }

    fallback
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// General API budget, keyed by client IP.
///
/// Returns 429 with a `Retry-After` header when the budget is exhausted.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let ip = extract_client_ip(&request, connect_info.map(|ConnectInfo(addr)| addr));
    state.check(RateLimitScope::Api, RateLimitKey::Ip(ip))?;

    let mut response = next.run(request).await;
    response.headers_mut().insert(
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderValue::from(state.limit_for(RateLimitScope::Api)),
    );
    Ok(response)
}

async fn user_scoped(
    state: &RateLimitState,
    scope: RateLimitScope,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    // Falls back to the IP when no principal is attached.
    let key = match request.extensions().get::<AuthContext>() {
        Some(auth) => RateLimitKey::User(auth.user_id.to_string()),
        None => RateLimitKey::Ip(extract_client_ip(&request, None)),
    };
    state.check(scope, key)?;
    Ok(next.run(request).await)
}

/// Per-user budget for sending direct messages.
pub async fn message_rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    user_scoped(&state, RateLimitScope::Messages, request, next).await
}

/// Per-user budget for posting tweets.
pub async fn tweet_rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    user_scoped(&state, RateLimitScope::Tweets, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn state_with(api: u32, tweets: u32) -> RateLimitState {
        RateLimitState::new(ApiConfig {
            rate_limit_api_per_window: api,
            rate_limit_tweets_per_minute: tweets,
            ..ApiConfig::default()
        })
    }

    #[test]
    fn test_budgets_are_independent_per_key_and_scope() {
        let state = state_with(2, 1);
        let alice = RateLimitKey::User("alice".to_string());
        let bob = RateLimitKey::User("bob".to_string());

        assert!(state.check(RateLimitScope::Tweets, alice.clone()).is_ok());
        assert!(state.check(RateLimitScope::Tweets, alice.clone()).is_err());
        assert!(state.check(RateLimitScope::Tweets, bob).is_ok());
        assert!(state.check(RateLimitScope::Messages, alice).is_ok());
    }

    #[test]
    fn test_prune_forgets_only_refilled_keys() {
        let state = RateLimitState::new(ApiConfig {
            rate_limit_api_per_window: 1,
            rate_limit_api_window: Duration::from_millis(50),
            rate_limit_tweets_per_minute: 1,
            ..ApiConfig::default()
        });
        let idle = RateLimitKey::Ip(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 1)));
        assert!(state.check(RateLimitScope::Api, idle).is_ok());
        std::thread::sleep(Duration::from_millis(80));

        let busy = RateLimitKey::User("alice".to_string());
        assert!(state.check(RateLimitScope::Tweets, busy.clone()).is_ok());
        assert_eq!(state.tracked_keys(), 2);

        state.prune();
        assert_eq!(state.tracked_keys(), 1);
        assert!(state.check(RateLimitScope::Tweets, busy).is_err());
    }

    #[test]
    fn test_disabled_limiter_admits_everything() {
        let state = RateLimitState::new(ApiConfig {
            rate_limit_enabled: false,
            rate_limit_tweets_per_minute: 1,
            ..ApiConfig::default()
        });
        for _ in 0..10 {
            assert!(state
                .check(RateLimitScope::Tweets, RateLimitKey::User("u".into()))
                .is_ok());
        }
    }

    #[tokio::test]
    async fn test_api_budget_returns_429_with_retry_after() -> Result<(), String> {
        let app = Router::new()
            .route("/api/ping", get(|| async { "pong" }))
            .layer(middleware::from_fn_with_state(
                state_with(2, 10),
                rate_limit_middleware,
            ));

        let mut statuses = Vec::new();
        let mut last = None;
        for _ in 0..3 {
            let request = Request::builder()
                .uri("/api/ping")
                .header("x-forwarded-for", "203.0.113.9")
                .body(Body::empty())
                .map_err(|e| e.to_string())?;
            let response = app
                .clone()
                .oneshot(request)
                .await
                .map_err(|e| format!("Request failed: {:?}", e))?;
            statuses.push(response.status());
            last = Some(response);
        }

        assert_eq!(
            statuses,
            vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
        );
        let last = last.ok_or("no response")?;
        assert!(last.headers().contains_key("retry-after"));
        Ok(())
    }

    #[test]
    fn test_forwarded_for_takes_first_address() -> Result<(), String> {
        let request = Request::builder()
            .header("x-forwarded-for", "198.51.100.1, 10.0.0.1")
            .body(Body::empty())
            .map_err(|e| e.to_string())?;
        assert_eq!(
            extract_client_ip(&request, None),
            "198.51.100.1".parse::<IpAddr>().map_err(|e| e.to_string())?
        );
        Ok(())
    }
}
