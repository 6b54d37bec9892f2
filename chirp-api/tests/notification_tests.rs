//! Notification Dispatcher Tests
//!
//! Interactions create notifications for the affected user only, never for
//! self-interactions, and creation failures never fail the interaction.


use std::sync::{Arc, Mutex};

use axum::http::{Method, StatusCode};
use chirp_api::hub::ConnectionId;
use chirp_api::{NotificationDispatcher, ServerEvent};
use chirp_core::{
    ChirpError, EntityIdType, NotificationRequest, NotificationType, PageRequest, UserId,
};
use chirp_storage::{GraphStore, InMemoryGraphStore};
use chirp_test_utils::fixtures;
use test_support::{request, seed_user, send, test_app};
use tokio::sync::mpsc;

#[tokio::test]
async fn test_interactions_notify_the_affected_user() -> Result<(), String> {
    let app = test_app();
    let (author, _) = seed_user(&app, "author").await?;
    let (fan, _) = seed_user(&app, "fan").await?;
    let tweet = fixtures::seed_tweet(app.store.as_ref(), author.id, "notable")
        .await
        .map_err(|e| e.to_string())?;

    let toggles = &app.state.toggles;
    toggles.toggle_like(fan.id, tweet.id).await.map_err(|e| e.to_string())?;
    toggles.toggle_retweet(fan.id, tweet.id).await.map_err(|e| e.to_string())?;
    toggles.toggle_follow(fan.id, author.id).await.map_err(|e| e.to_string())?;

    let page = app
        .state
        .notifications
        .list(author.id, PageRequest::default())
        .await
        .map_err(|e| e.to_string())?;
    let mut types: Vec<NotificationType> =
        page.notifications.iter().map(|n| n.notification_type).collect();
    types.sort_by_key(|t| t.as_str());
    assert_eq!(
        types,
        vec![NotificationType::Follow, NotificationType::Like, NotificationType::Retweet]
    );
    assert!(page.notifications.iter().all(|n| n.sender == fan.id && !n.read));
    assert_eq!(page.unread_count, 3);

    let fan_page = app
        .state
        .notifications
        .list(fan.id, PageRequest::default())
        .await
        .map_err(|e| e.to_string())?;
    assert!(fan_page.notifications.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_removals_and_self_interactions_do_not_notify() -> Result<(), String> {
    let app = test_app();
    let (author, _) = seed_user(&app, "author").await?;
    let (fan, _) = seed_user(&app, "fan").await?;
    let tweet = fixtures::seed_tweet(app.store.as_ref(), author.id, "mine")
        .await
        .map_err(|e| e.to_string())?;

    let toggles = &app.state.toggles;
    toggles.toggle_like(author.id, tweet.id).await.map_err(|e| e.to_string())?;
    toggles.toggle_retweet(author.id, tweet.id).await.map_err(|e| e.to_string())?;
    assert_eq!(app.store.notification_total(), 0);

    // like, unlike, like: two additions, two notifications
    for _ in 0..3 {
        toggles.toggle_like(fan.id, tweet.id).await.map_err(|e| e.to_string())?;
    }
    assert_eq!(app.store.notification_total(), 2);
    Ok(())
}

#[tokio::test]
async fn test_mentions_notify_known_users_once() -> Result<(), String> {
    let app = test_app();
    let (author, _) = seed_user(&app, "author").await?;
    let (bob, _) = seed_user(&app, "bob").await?;

    app.state
        .feed
        .create_tweet(author.id, "hey @bob and @bob, also @nobody and @author", Vec::new())
        .await
        .map_err(|e| e.to_string())?;

    let page = app
        .state
        .notifications
        .list(bob.id, PageRequest::default())
        .await
        .map_err(|e| e.to_string())?;
    assert_eq!(page.notifications.len(), 1);
    assert_eq!(page.notifications[0].notification_type, NotificationType::Mention);
    assert_eq!(app.store.notification_total(), 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_creation_is_reported_not_raised() {
    let store = Arc::new(InMemoryGraphStore::new());
    store.set_unavailable(true);
    let seen: Arc<Mutex<Vec<NotificationType>>> = Arc::new(Mutex::new(Vec::new()));
    let hook_seen = seen.clone();
    let dispatcher = NotificationDispatcher::new(store).with_failure_hook(Arc::new(
        move |request: &NotificationRequest, _err: &ChirpError| {
            if let Ok(mut seen) = hook_seen.lock() {
                seen.push(request.notification_type);
            }
        },
    ));

    let created = dispatcher
        .notify(NotificationRequest::new(
            UserId::now_v7(),
            UserId::now_v7(),
            NotificationType::Follow,
        ))
        .await;

    assert!(created.is_none());
    assert_eq!(dispatcher.failure_count(), 1);
    let seen = seen.lock().map(|s| s.clone()).unwrap_or_default();
    assert_eq!(seen, vec![NotificationType::Follow]);
}

#[tokio::test]
async fn test_new_notification_is_pushed_to_live_connections() -> Result<(), String> {
    let app = test_app();
    let (author, _) = seed_user(&app, "author").await?;
    let (fan, _) = seed_user(&app, "fan").await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    app.state.registry.register(author.id, ConnectionId::new(), tx);

    app.state
        .toggles
        .toggle_follow(fan.id, author.id)
        .await
        .map_err(|e| e.to_string())?;

    match rx.try_recv() {
        Ok(ServerEvent::NotificationNew { notification }) => {
            assert_eq!(notification.recipient, author.id);
            assert_eq!(notification.sender, fan.id);
            assert_eq!(notification.notification_type, NotificationType::Follow);
        }
        other => return Err(format!("expected notification:new, got {:?}", other)),
    }
    Ok(())
}

#[tokio::test]
async fn test_read_flow_over_http() -> Result<(), String> {
    let app = test_app();
    let (author, author_token) = seed_user(&app, "author").await?;
    let (fan, fan_token) = seed_user(&app, "fan").await?;
    let tweet = fixtures::seed_tweet(app.store.as_ref(), author.id, "read me")
        .await
        .map_err(|e| e.to_string())?;
    app.state.toggles.toggle_like(fan.id, tweet.id).await.map_err(|e| e.to_string())?;
    app.state.toggles.toggle_follow(fan.id, author.id).await.map_err(|e| e.to_string())?;

    let (status, body) = send(
        &app.router,
        request(Method::GET, "/api/v1/notifications", Some(&author_token), None),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unreadCount"], 2);
    assert_eq!(body["pagination"]["total"], 2);
    let first_id = body["data"][0]["id"]
        .as_str()
        .ok_or("notification id missing")?
        .to_string();

    // Someone else cannot mark it.
    let uri = format!("/api/v1/notifications/{}/read", first_id);
    let (status, body) =
        send(&app.router, request(Method::PUT, &uri, Some(&fan_token), None)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, body) =
        send(&app.router, request(Method::PUT, &uri, Some(&author_token), None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["read"], true);

    let (_, body) = send(
        &app.router,
        request(Method::GET, "/api/v1/notifications/unread-count", Some(&author_token), None),
    )
    .await?;
    assert_eq!(body["data"]["unreadCount"], 1);

    let (status, body) = send(
        &app.router,
        request(Method::PUT, "/api/v1/notifications/read-all", Some(&author_token), None),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["updated"], 1);

    let unread = app
        .state
        .notifications
        .unread_count(author.id)
        .await
        .map_err(|e| e.to_string())?;
    assert_eq!(unread, 0);
    Ok(())
}
