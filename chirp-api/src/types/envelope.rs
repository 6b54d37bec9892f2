//! Response envelope shared by every endpoint.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chirp_core::{PageRequest, Pagination, DEFAULT_LIMIT};
use serde::{Deserialize, Serialize};

/// Success envelope: `{success, message?, data?, pagination?, unreadCount?}`.
///
/// Failures use [`crate::error::ApiError`], which renders the same shape
/// with `success: false` and an `error` code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<u64>,
    #[serde(skip)]
    status: Option<u16>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            pagination: None,
            unread_count: None,
            status: None,
        }
    }

    /// A paged list.
    pub fn paged(data: T, pagination: Pagination) -> Self {
        Self::ok(data).with_pagination(pagination)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn with_unread_count(mut self, unread: u64) -> Self {
        self.unread_count = Some(unread);
        self
    }

    /// Respond with 201 instead of 200.
    pub fn created(mut self) -> Self {
        self.status = Some(StatusCode::CREATED.as_u16());
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::OK)
    }
}

impl ApiResponse<()> {
    /// Success with only a message and no payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            pagination: None,
            unread_count: None,
            status: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

// ============================================================================
// PAGING
// ============================================================================

/// `?page=&limit=` query string. Missing values fall back to the defaults
/// and `limit` is clamped to the allowed range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PageQuery {
    pub fn to_request(self) -> PageRequest {
        self.with_default_limit(DEFAULT_LIMIT)
    }

    pub fn with_default_limit(self, default_limit: u64) -> PageRequest {
        PageRequest::from_query(self.page, self.limit, default_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chirp_core::{DEFAULT_MESSAGE_LIMIT, MAX_LIMIT};

    #[test]
    fn test_envelope_omits_absent_fields() -> Result<(), String> {
        let body = serde_json::to_value(ApiResponse::message("done")).map_err(|e| e.to_string())?;
        assert_eq!(body, serde_json::json!({"success": true, "message": "done"}));
        Ok(())
    }

    #[test]
    fn test_envelope_carries_unread_count() -> Result<(), String> {
        let response = ApiResponse::paged(vec![1, 2], Pagination::new(PageRequest::new(1, 2), 5))
            .with_unread_count(3);
        let body = serde_json::to_value(&response).map_err(|e| e.to_string())?;
        assert_eq!(body["unreadCount"], 3);
        assert_eq!(body["pagination"]["total"], 5);
        assert_eq!(body["data"], serde_json::json!([1, 2]));
        Ok(())
    }

    #[test]
    fn test_created_status() {
        assert_eq!(ApiResponse::ok(1).status_code(), StatusCode::OK);
        assert_eq!(ApiResponse::ok(1).created().status_code(), StatusCode::CREATED);
    }

    #[test]
    fn test_page_query_defaults_and_clamp() {
        let request = PageQuery::default().to_request();
        assert_eq!((request.page, request.limit), (1, DEFAULT_LIMIT));

        let request = PageQuery::default().with_default_limit(DEFAULT_MESSAGE_LIMIT);
        assert_eq!(request.limit, DEFAULT_MESSAGE_LIMIT);

        let request = PageQuery {
            page: Some(0),
            limit: Some(10_000),
        }
        .to_request();
        assert_eq!((request.page, request.limit), (1, MAX_LIMIT));
    }
}
