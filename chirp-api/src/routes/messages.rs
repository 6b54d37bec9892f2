//! Direct Message REST API Routes
//!
//! `/:id` is the counterpart's user id for conversations and sends, and
//! the message id for read receipts. Messages sent here are delivered
//! live through the hub exactly like WebSocket sends.

use axum::{
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chirp_core::{MessageId, UserId, DEFAULT_MESSAGE_LIMIT};

use crate::{
    error::ApiResult,
    extractors::PathId,
    middleware::{message_rate_limit_middleware, AuthExtractor, RateLimitState},
    services::MessageService,
    state::AppState,
    types::{ApiResponse, PageQuery, SendMessageRequest},
};

/// GET /api/v1/messages/conversations - Latest message per counterpart
pub async fn list_conversations(
    State(messages): State<MessageService>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    Ok(ApiResponse::ok(messages.conversations(auth.user_id).await?))
}

/// GET /api/v1/messages/:userId - One page, oldest first within the page
pub async fn get_conversation(
    State(messages): State<MessageService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(other): PathId<UserId>,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = query.with_default_limit(DEFAULT_MESSAGE_LIMIT);
    let (items, pagination) = messages.conversation(auth.user_id, other, page).await?;
    Ok(ApiResponse::paged(items, pagination))
}

/// POST /api/v1/messages/:userId
pub async fn send_message(
    State(messages): State<MessageService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(receiver): PathId<UserId>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let message = messages
        .send_and_deliver(auth.user_id, receiver, &req.content)
        .await?;
    Ok(ApiResponse::ok(message)
        .with_message("Message sent successfully")
        .created())
}

/// PUT /api/v1/messages/:id/read - Receiver only
pub async fn mark_read(
    State(messages): State<MessageService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<MessageId>,
) -> ApiResult<impl IntoResponse> {
    let receipt = messages.mark_read(auth.user_id, id).await?;
    Ok(ApiResponse::ok(receipt.message).with_message("Message marked as read"))
}

/// Message routes. Sending draws from the per-user message budget.
pub fn create_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/conversations", get(list_conversations))
        .route("/:id", get(get_conversation))
        .route(
            "/:id",
            post(send_message).layer(from_fn_with_state(rate_limit, message_rate_limit_middleware)),
        )
        .route("/:id/read", put(mark_read))
}
