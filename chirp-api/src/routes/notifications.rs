//! Notification REST API Routes

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use chirp_core::NotificationId;

use crate::{
    error::ApiResult,
    extractors::PathId,
    middleware::AuthExtractor,
    services::NotificationDispatcher,
    state::AppState,
    types::{ApiResponse, MarkAllReadResponse, PageQuery, UnreadCountResponse},
};

/// GET /api/v1/notifications - Newest first, with the unread total
pub async fn list_notifications(
    State(notifications): State<NotificationDispatcher>,
    AuthExtractor(auth): AuthExtractor,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = notifications.list(auth.user_id, query.to_request()).await?;
    Ok(ApiResponse::paged(page.notifications, page.pagination).with_unread_count(page.unread_count))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    State(notifications): State<NotificationDispatcher>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    let unread_count = notifications.unread_count(auth.user_id).await?;
    Ok(ApiResponse::ok(UnreadCountResponse { unread_count }))
}

/// PUT /api/v1/notifications/:id/read - Recipient only
pub async fn mark_read(
    State(notifications): State<NotificationDispatcher>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<NotificationId>,
) -> ApiResult<impl IntoResponse> {
    let notification = notifications.mark_read(id, auth.user_id).await?;
    Ok(ApiResponse::ok(notification).with_message("Notification marked as read"))
}

/// PUT /api/v1/notifications/read-all
pub async fn mark_all_read(
    State(notifications): State<NotificationDispatcher>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    let updated = notifications.mark_all_read(auth.user_id).await?;
    Ok(ApiResponse::ok(MarkAllReadResponse { updated })
        .with_message("All notifications marked as read"))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read-all", put(mark_all_read))
        .route("/:id/read", put(mark_read))
}
