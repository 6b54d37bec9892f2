//! Tweet REST API Routes
//!
//! The feed and single-tweet reads are public. Authoring, likes and
//! retweets require a principal.

use axum::{
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chirp_core::TweetId;

use crate::{
    error::ApiResult,
    extractors::PathId,
    middleware::{tweet_rate_limit_middleware, AuthExtractor, RateLimitState},
    services::{FeedService, ToggleEngine},
    state::AppState,
    types::{
        ApiResponse, CreateTweetRequest, LikeResponse, PageQuery, RetweetResponse,
        UpdateTweetRequest,
    },
};

// ============================================================================
// PUBLIC HANDLERS
// ============================================================================

/// GET /api/v1/tweets - Public feed, newest first
pub async fn list_feed(
    State(feed): State<FeedService>,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let read = feed.feed(query.to_request()).await?;
    tracing::debug!(cache_hit = read.was_cache_hit(), "feed page served");
    let page = read.into_value();
    Ok(ApiResponse::paged(page.tweets, page.pagination))
}

/// GET /api/v1/tweets/:id
pub async fn get_tweet(
    State(feed): State<FeedService>,
    PathId(id): PathId<TweetId>,
) -> ApiResult<impl IntoResponse> {
    Ok(ApiResponse::ok(feed.get_tweet(id).await?))
}

// ============================================================================
// AUTHENTICATED HANDLERS
// ============================================================================

/// POST /api/v1/tweets
pub async fn create_tweet(
    State(feed): State<FeedService>,
    AuthExtractor(auth): AuthExtractor,
    Json(req): Json<CreateTweetRequest>,
) -> ApiResult<impl IntoResponse> {
    let tweet = feed.create_tweet(auth.user_id, &req.content, req.media).await?;
    Ok(ApiResponse::ok(tweet)
        .with_message("Tweet created successfully")
        .created())
}

/// PUT /api/v1/tweets/:id - Author only
pub async fn update_tweet(
    State(feed): State<FeedService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<TweetId>,
    Json(req): Json<UpdateTweetRequest>,
) -> ApiResult<impl IntoResponse> {
    let tweet = feed.update_tweet(auth.user_id, id, &req.content).await?;
    Ok(ApiResponse::ok(tweet).with_message("Tweet updated successfully"))
}

/// DELETE /api/v1/tweets/:id - Author only
pub async fn delete_tweet(
    State(feed): State<FeedService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<TweetId>,
) -> ApiResult<impl IntoResponse> {
    feed.delete_tweet(auth.user_id, id).await?;
    Ok(ApiResponse::message("Tweet deleted successfully"))
}

/// POST /api/v1/tweets/:id/like - Like or unlike
pub async fn toggle_like(
    State(toggles): State<ToggleEngine>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<TweetId>,
) -> ApiResult<impl IntoResponse> {
    let outcome = toggles.toggle_like(auth.user_id, id).await?;
    Ok(ApiResponse::ok(LikeResponse::from(outcome)))
}

/// POST /api/v1/tweets/:id/retweet - Retweet or undo; 201 when a retweet was created
pub async fn toggle_retweet(
    State(toggles): State<ToggleEngine>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<TweetId>,
) -> ApiResult<impl IntoResponse> {
    let body = RetweetResponse::from(toggles.toggle_retweet(auth.user_id, id).await?);
    let response = if body.retweeted {
        ApiResponse::ok(body).with_message("Retweeted").created()
    } else {
        ApiResponse::ok(body).with_message("Retweet removed")
    };
    Ok(response)
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Routes readable without a principal.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_feed))
        .route("/:id", get(get_tweet))
}

/// Routes that need a principal. Tweet creation draws from the per-user
/// tweet budget.
pub fn create_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(create_tweet).layer(from_fn_with_state(rate_limit, tweet_rate_limit_middleware)),
        )
        .route("/:id", axum::routing::put(update_tweet).delete(delete_tweet))
        .route("/:id/like", post(toggle_like))
        .route("/:id/retweet", post(toggle_retweet))
}
