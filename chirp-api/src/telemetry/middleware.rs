//! Axum Middleware for HTTP Request Tracing and Metrics
//!
//! Wraps every request in a tracing span and records Prometheus metrics.

use axum::{extract::Request, middleware::Next, response::Response};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Instant;
use tracing::{field, info_span, Instrument};

use super::metrics::with_metrics;

static UUID_PATTERN: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
});

static NUMERIC_ID_PATTERN: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"/\d+(/|$)"));

/// `/api/v1/users/<username>` and `/api/v1/users/<username>/tweets`.
static USERNAME_PATTERN: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^(/api/v1/users)/([A-Za-z0-9_]+)(/tweets)?$"));

const USERS_FIXED_SEGMENTS: &[&str] = &["profile", "{id}"];

/// Normalize path for metrics/spans (replace ids and usernames with placeholders).
///
/// This prevents high-cardinality label explosion in Prometheus.
fn normalize_path(path: &str) -> String {
    let mut result = path.to_string();
    if let Ok(uuid) = UUID_PATTERN.as_ref() {
        result = uuid.replace_all(&result, "{id}").into_owned();
    }
    if let Ok(numeric) = NUMERIC_ID_PATTERN.as_ref() {
        result = numeric.replace_all(&result, "/{id}$1").into_owned();
    }
    if let Ok(username) = USERNAME_PATTERN.as_ref() {
        if let Some(caps) = username.captures(&result) {
            let segment = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            if !USERS_FIXED_SEGMENTS.contains(&segment) {
                let suffix = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
                result = format!("/api/v1/users/{{username}}{}", suffix);
            }
        }
    }
    result
}

/// Observability middleware for Axum.
///
/// Records a span per request, HTTP metrics and a completion log line.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let normalized_path = normalize_path(&path);

    let span = info_span!(
        "http_request",
        http.method = %method,
        http.target = %path,
        http.route = %normalized_path,
        http.status_code = field::Empty,
        user_id = field::Empty,
    );

    let response = next.run(request).instrument(span.clone()).await;

    let duration = start.elapsed();
    let status = response.status();
    span.record("http.status_code", status.as_u16());

    with_metrics(|m| {
        m.record_http_request(
            method.as_str(),
            &normalized_path,
            status.as_u16(),
            duration.as_secs_f64(),
        )
    });

    tracing::info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/tweets/0190a3c2-7b1e-7c3a-9d4f-1a2b3c4d5e6f/like";
        assert_eq!(normalize_path(path), "/api/v1/tweets/{id}/like");
    }

    #[test]
    fn test_normalize_path_numeric_id() {
        assert_eq!(normalize_path("/api/v1/items/12345"), "/api/v1/items/{id}");
    }

    #[test]
    fn test_normalize_path_username() {
        assert_eq!(
            normalize_path("/api/v1/users/alice_99"),
            "/api/v1/users/{username}"
        );
        assert_eq!(
            normalize_path("/api/v1/users/alice/tweets"),
            "/api/v1/users/{username}/tweets"
        );
        assert_eq!(normalize_path("/api/v1/users/profile"), "/api/v1/users/profile");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/notifications"), "/api/v1/notifications");
        assert_eq!(normalize_path("/health/ready"), "/health/ready");
    }
}
