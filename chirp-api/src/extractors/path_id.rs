//! Typed path extractor for entity ids.
//!
//! `PathId<TweetId>` parses the single path parameter as a UUID and wraps
//! it in the requested id type. A malformed id is answered with the usual
//! error envelope instead of axum's plain-text rejection.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use chirp_core::EntityIdType;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy)]
pub struct PathId<T: EntityIdType>(pub T);

/// Rejection for a path parameter that is not a UUID.
#[derive(Debug)]
pub struct PathIdError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for PathIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid id in '{}': {}", self.path, self.message)
    }
}

impl std::error::Error for PathIdError {}

impl IntoResponse for PathIdError {
    fn into_response(self) -> Response {
        ApiError::invalid_format("id", "a UUID")
            .with_details(serde_json::json!({ "path": self.path }))
            .into_response()
    }
}

#[async_trait]
impl<S, T> FromRequestParts<S> for PathId<T>
where
    S: Send + Sync,
    T: EntityIdType,
{
    type Rejection = PathIdError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(uuid): Path<Uuid> = Path::from_request_parts(parts, state)
            .await
            .map_err(|e| PathIdError {
                path: parts.uri.path().to_string(),
                message: e.to_string(),
            })?;
        Ok(PathId(T::new(uuid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode, routing::get, Router};
    use chirp_core::TweetId;
    use tower::ServiceExt;

    async fn echo(PathId(id): PathId<TweetId>) -> String {
        id.to_string()
    }

    #[tokio::test]
    async fn test_malformed_id_is_a_400_envelope() -> Result<(), String> {
        let app = Router::new().route("/tweets/:id", get(echo));
        let request = Request::builder()
            .uri("/tweets/not-a-uuid")
            .body(Body::empty())
            .map_err(|e| e.to_string())?;
        let response = app.oneshot(request).await.map_err(|e| e.to_string())?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        let json: serde_json::Value = serde_json::from_slice(&body).map_err(|e| e.to_string())?;
        assert_eq!(json["success"], false);
        assert_eq!(json["details"]["path"], "/tweets/not-a-uuid");
        Ok(())
    }

    #[tokio::test]
    async fn test_valid_id_is_extracted() -> Result<(), String> {
        let id = Uuid::now_v7();
        let app = Router::new().route("/tweets/:id", get(echo));
        let request = Request::builder()
            .uri(format!("/tweets/{}", id))
            .body(Body::empty())
            .map_err(|e| e.to_string())?;
        let response = app.oneshot(request).await.map_err(|e| e.to_string())?;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(&body[..], id.to_string().as_bytes());
        Ok(())
    }
}
