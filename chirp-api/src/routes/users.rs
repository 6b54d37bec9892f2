//! User REST API Routes
//!
//! Profiles are addressed by username; the follow graph is addressed by
//! user id. Both share the `:user` path segment.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chirp_core::{ProfileUpdate, UserId};

use crate::{
    error::ApiResult,
    extractors::PathId,
    middleware::AuthExtractor,
    services::{FeedService, ProfileService, ToggleEngine},
    state::AppState,
    types::{ApiResponse, FollowResponse, PageQuery, ProfileResponse},
};

// ============================================================================
// PROFILE HANDLERS
// ============================================================================

/// GET /api/v1/users/profile - The caller's own profile
pub async fn get_own_profile(
    State(profiles): State<ProfileService>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    let user = profiles.get_user(auth.user_id).await?;
    Ok(ApiResponse::ok(ProfileResponse::for_viewer(&user, auth.user_id)))
}

/// PUT /api/v1/users/profile
pub async fn update_profile(
    State(profiles): State<ProfileService>,
    AuthExtractor(auth): AuthExtractor,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<impl IntoResponse> {
    let user = profiles.update_profile(auth.user_id, update).await?;
    Ok(ApiResponse::ok(ProfileResponse::for_viewer(&user, auth.user_id))
        .with_message("Profile updated successfully"))
}

/// GET /api/v1/users/:username
pub async fn get_profile(
    State(profiles): State<ProfileService>,
    AuthExtractor(auth): AuthExtractor,
    Path(username): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let read = profiles.get_profile(&username).await?;
    Ok(ApiResponse::ok(ProfileResponse::for_viewer(
        read.value(),
        auth.user_id,
    )))
}

/// GET /api/v1/users/:username/tweets
pub async fn list_user_tweets(
    State(feed): State<FeedService>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let (tweets, pagination) = feed.user_tweets(&username, query.to_request()).await?;
    Ok(ApiResponse::paged(tweets, pagination))
}

// ============================================================================
// GRAPH HANDLERS
// ============================================================================

/// POST /api/v1/users/:id/follow - Follow or unfollow
pub async fn toggle_follow(
    State(toggles): State<ToggleEngine>,
    AuthExtractor(auth): AuthExtractor,
    PathId(target): PathId<UserId>,
) -> ApiResult<impl IntoResponse> {
    let outcome = toggles.toggle_follow(auth.user_id, target).await?;
    let message = if outcome.is_following() {
        "User followed"
    } else {
        "User unfollowed"
    };
    Ok(ApiResponse::ok(FollowResponse::from(outcome)).with_message(message))
}

/// GET /api/v1/users/:id/followers
pub async fn list_followers(
    State(profiles): State<ProfileService>,
    PathId(id): PathId<UserId>,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let (users, pagination) = profiles.followers(id, query.to_request()).await?;
    Ok(ApiResponse::paged(users, pagination))
}

/// GET /api/v1/users/:id/following
pub async fn list_following(
    State(profiles): State<ProfileService>,
    PathId(id): PathId<UserId>,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let (users, pagination) = profiles.following(id, query.to_request()).await?;
    Ok(ApiResponse::paged(users, pagination))
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_own_profile).put(update_profile))
        .route("/:user", get(get_profile))
        .route("/:user/tweets", get(list_user_tweets))
        .route("/:user/follow", post(toggle_follow))
        .route("/:user/followers", get(list_followers))
        .route("/:user/following", get(list_following))
}
