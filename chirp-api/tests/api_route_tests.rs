//! HTTP Surface Tests
//!
//! Drive the full router with `oneshot`: auth boundaries, envelope shape,
//! ownership checks, path validation and the per-user budgets.


use axum::http::{Method, StatusCode};
use chirp_storage::GraphStore;
use chirp_test_utils::fixtures;
use serde_json::json;
use test_support::{request, seed_user, send, test_api_config, test_app, test_app_with};

// ============================================================================
// AUTH BOUNDARY
// ============================================================================

#[tokio::test]
async fn test_public_feed_needs_no_token() -> Result<(), String> {
    let app = test_app();
    let (author, _) = seed_user(&app, "author").await?;
    let tweet = fixtures::seed_tweet(app.store.as_ref(), author.id, "public words")
        .await
        .map_err(|e| e.to_string())?;

    let (status, body) =
        send(&app.router, request(Method::GET, "/api/v1/tweets", None, None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"][0]["content"], "public words");
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["limit"], 20);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["pagination"]["hasNext"], false);

    let uri = format!("/api/v1/tweets/{}", tweet.id);
    let (status, body) = send(&app.router, request(Method::GET, &uri, None, None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], tweet.id.to_string());
    Ok(())
}

#[tokio::test]
async fn test_protected_routes_reject_missing_or_bad_tokens() -> Result<(), String> {
    let app = test_app();
    let protected = [
        (Method::POST, "/api/v1/tweets"),
        (Method::GET, "/api/v1/users/profile"),
        (Method::GET, "/api/v1/notifications"),
        (Method::GET, "/api/v1/messages/conversations"),
    ];

    for (method, uri) in protected {
        let (status, body) = send(&app.router, request(method.clone(), uri, None, None)).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(body["success"], false);

        let (status, _) =
            send(&app.router, request(method.clone(), uri, Some("not-a-jwt"), None)).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {} with bad token", method, uri);
    }
    Ok(())
}

// ============================================================================
// TWEETS
// ============================================================================

#[tokio::test]
async fn test_tweet_lifecycle_and_ownership() -> Result<(), String> {
    let app = test_app();
    let (_, author_token) = seed_user(&app, "author").await?;
    let (_, other_token) = seed_user(&app, "other").await?;

    let (status, body) = send(
        &app.router,
        request(
            Method::POST,
            "/api/v1/tweets",
            Some(&author_token),
            Some(json!({"content": "  first #rust post  "})),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Tweet created successfully");
    assert_eq!(body["data"]["content"], "first #rust post");
    assert_eq!(body["data"]["hashtags"], json!(["rust"]));
    let uri = format!("/api/v1/tweets/{}", body["data"]["id"].as_str().ok_or("no id")?);

    let edit = Some(json!({"content": "hijacked"}));
    let (status, body) =
        send(&app.router, request(Method::PUT, &uri, Some(&other_token), edit)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");
    assert!(body["message"]
        .as_str()
        .is_some_and(|m| m.starts_with("Not authorized to")));

    let (status, _) =
        send(&app.router, request(Method::DELETE, &uri, Some(&other_token), None)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let edit = Some(json!({"content": "edited"}));
    let (status, body) =
        send(&app.router, request(Method::PUT, &uri, Some(&author_token), edit)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "edited");

    let (status, body) =
        send(&app.router, request(Method::DELETE, &uri, Some(&author_token), None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Tweet deleted successfully");

    let (status, body) = send(&app.router, request(Method::GET, &uri, None, None)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "TWEET_NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn test_tweet_content_validation() -> Result<(), String> {
    let app = test_app();
    let (_, token) = seed_user(&app, "author").await?;

    for content in [String::from("   "), "x".repeat(281)] {
        let (status, body) = send(
            &app.router,
            request(
                Method::POST,
                "/api/v1/tweets",
                Some(&token),
                Some(json!({ "content": content })),
            ),
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }
    assert_eq!(app.store.tweet_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_like_and_retweet_toggles_over_http() -> Result<(), String> {
    let app = test_app();
    let (author, _) = seed_user(&app, "author").await?;
    let (_, fan_token) = seed_user(&app, "fan").await?;
    let tweet = fixtures::seed_tweet(app.store.as_ref(), author.id, "toggle target")
        .await
        .map_err(|e| e.to_string())?;

    let like_uri = format!("/api/v1/tweets/{}/like", tweet.id);
    let (status, body) =
        send(&app.router, request(Method::POST, &like_uri, Some(&fan_token), None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"liked": true, "likeCount": 1}));
    let (_, body) =
        send(&app.router, request(Method::POST, &like_uri, Some(&fan_token), None)).await?;
    assert_eq!(body["data"], json!({"liked": false, "likeCount": 0}));

    let retweet_uri = format!("/api/v1/tweets/{}/retweet", tweet.id);
    let (status, body) =
        send(&app.router, request(Method::POST, &retweet_uri, Some(&fan_token), None)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["retweeted"], true);
    assert_eq!(body["data"]["retweetCount"], 1);
    assert_eq!(body["data"]["retweet"]["isRetweet"], true);

    let (status, body) =
        send(&app.router, request(Method::POST, &retweet_uri, Some(&fan_token), None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["retweeted"], false);
    assert_eq!(body["data"]["retweetCount"], 0);
    assert!(body["data"].get("retweet").is_none());
    Ok(())
}

#[tokio::test]
async fn test_malformed_path_id_is_bad_request() -> Result<(), String> {
    let app = test_app();
    let (_, token) = seed_user(&app, "author").await?;

    let (status, body) =
        send(&app.router, request(Method::GET, "/api/v1/tweets/not-a-uuid", None, None)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_FORMAT");

    let (status, _) = send(
        &app.router,
        request(Method::POST, "/api/v1/users/nobody/follow", Some(&token), None),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_tweet_budget_is_per_user() -> Result<(), String> {
    let mut config = test_api_config();
    config.rate_limit_tweets_per_minute = 2;
    let app = test_app_with(config);
    let (_, alice) = seed_user(&app, "alice").await?;
    let (_, bob) = seed_user(&app, "bob").await?;

    let post = |token: &str| {
        request(
            Method::POST,
            "/api/v1/tweets",
            Some(token),
            Some(json!({"content": "again"})),
        )
    };
    for _ in 0..2 {
        let (status, _) = send(&app.router, post(&alice)).await?;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, body) = send(&app.router, post(&alice)).await?;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["message"], "Too many tweets, please slow down");

    let (status, _) = send(&app.router, post(&bob)).await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

// ============================================================================
// USERS
// ============================================================================

#[tokio::test]
async fn test_profile_hides_private_fields_and_shows_follow_state() -> Result<(), String> {
    let app = test_app();
    let (alice, alice_token) = seed_user(&app, "alice").await?;
    let (bob, _) = seed_user(&app, "bob").await?;

    let follow_uri = format!("/api/v1/users/{}/follow", bob.id);
    let (status, body) =
        send(&app.router, request(Method::POST, &follow_uri, Some(&alice_token), None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"following": true, "followerCount": 1}));

    let (status, body) =
        send(&app.router, request(Method::GET, "/api/v1/users/BOB", Some(&alice_token), None))
            .await?;
    assert_eq!(status, StatusCode::OK);
    let profile = &body["data"];
    assert_eq!(profile["username"], "bob");
    assert_eq!(profile["followerCount"], 1);
    assert_eq!(profile["isFollowing"], true);
    assert!(profile.get("email").is_none());
    assert!(profile.get("followers").is_none());

    let followers_uri = format!("/api/v1/users/{}/followers", bob.id);
    let (_, body) =
        send(&app.router, request(Method::GET, &followers_uri, Some(&alice_token), None)).await?;
    assert_eq!(body["data"][0]["id"], alice.id.to_string());

    let self_follow = format!("/api/v1/users/{}/follow", alice.id);
    let (status, body) =
        send(&app.router, request(Method::POST, &self_follow, Some(&alice_token), None)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You cannot follow yourself");
    Ok(())
}

#[tokio::test]
async fn test_unknown_user_is_not_found() -> Result<(), String> {
    let app = test_app();
    let (_, token) = seed_user(&app, "alice").await?;

    let (status, body) =
        send(&app.router, request(Method::GET, "/api/v1/users/ghost", Some(&token), None))
            .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "USER_NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn test_update_own_profile() -> Result<(), String> {
    let app = test_app();
    let (_, token) = seed_user(&app, "alice").await?;

    let (status, body) = send(
        &app.router,
        request(
            Method::PUT,
            "/api/v1/users/profile",
            Some(&token),
            Some(json!({"displayName": "Alice A.", "bio": "hello"})),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["displayName"], "Alice A.");
    assert_eq!(body["data"]["bio"], "hello");

    let (status, _) = send(
        &app.router,
        request(
            Method::PUT,
            "/api/v1/users/profile",
            Some(&token),
            Some(json!({"bio": "b".repeat(161)})),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

// ============================================================================
// MESSAGES
// ============================================================================

#[tokio::test]
async fn test_message_flow_over_http() -> Result<(), String> {
    let app = test_app();
    let (alice, alice_token) = seed_user(&app, "alice").await?;
    let (bob, bob_token) = seed_user(&app, "bob").await?;

    let to_bob = format!("/api/v1/messages/{}", bob.id);
    for content in ["one", "two"] {
        let (status, body) = send(
            &app.router,
            request(Method::POST, &to_bob, Some(&alice_token), Some(json!({"content": content}))),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["content"], content);
    }

    let to_alice = format!("/api/v1/messages/{}", alice.id);
    let (status, body) =
        send(&app.router, request(Method::GET, &to_alice, Some(&bob_token), None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["content"], "one");
    assert_eq!(body["data"][1]["content"], "two");
    assert_eq!(body["pagination"]["limit"], 50);
    let message_id = body["data"][1]["id"].as_str().ok_or("no id")?.to_string();

    let read_uri = format!("/api/v1/messages/{}/read", message_id);
    let (status, _) =
        send(&app.router, request(Method::PUT, &read_uri, Some(&alice_token), None)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) =
        send(&app.router, request(Method::PUT, &read_uri, Some(&bob_token), None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["read"], true);

    let (_, body) = send(
        &app.router,
        request(Method::GET, "/api/v1/messages/conversations", Some(&bob_token), None),
    )
    .await?;
    assert_eq!(body["data"][0]["with"]["username"], "alice");
    assert_eq!(body["data"][0]["lastMessage"]["content"], "two");
    Ok(())
}

#[tokio::test]
async fn test_messaging_yourself_is_rejected() -> Result<(), String> {
    let app = test_app();
    let (alice, token) = seed_user(&app, "alice").await?;

    let uri = format!("/api/v1/messages/{}", alice.id);
    let (status, body) = send(
        &app.router,
        request(Method::POST, &uri, Some(&token), Some(json!({"content": "hi me"}))),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You cannot message yourself");
    Ok(())
}

// ============================================================================
// HEALTH
// ============================================================================

#[tokio::test]
async fn test_readiness_tracks_store_and_cache() -> Result<(), String> {
    let app = test_app();

    let (status, body) =
        send(&app.router, request(Method::GET, "/health/ready", None, None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    app.cache.set_unavailable(true);
    let (status, body) =
        send(&app.router, request(Method::GET, "/health/ready", None, None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");

    app.store.set_unavailable(true);
    let (status, _) = send(&app.router, request(Method::GET, "/health/ready", None, None)).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(&app.router, request(Method::GET, "/health/live", None, None)).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_is_public() -> Result<(), String> {
    let app = test_app();
    send(&app.router, request(Method::GET, "/api/v1/tweets", None, None)).await?;

    let response = send(&app.router, request(Method::GET, "/metrics", None, None)).await?;
    assert_eq!(response.0, StatusCode::OK);
    Ok(())
}
