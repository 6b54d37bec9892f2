//! In-memory graph store.
//!
//! Each collection sits behind its own `RwLock`, so every `*_apply` call is
//! atomic for one document. `set_unavailable` makes every call fail with
//! `StorageError::Unavailable`, which is how tests simulate a store outage.
//! `set_latency` makes every call sleep first, so callers yield between
//! store operations the way they would against a networked store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use ::async_trait::async_trait;
use chirp_core::{
    identity::EntityIdType, paginate, ChirpError, ChirpResult, EntityType, Message, MessageId,
    Notification, NotificationId, OperationError, PageRequest, StorageError, Tweet, TweetId, User,
    UserId,
};
use chrono::Utc;

use crate::store::{GraphStore, TweetMutation, UserMutation};

#[derive(Debug, Default)]
struct UserTable {
    by_id: HashMap<UserId, User>,
    by_username: HashMap<String, UserId>,
}

/// Graph store backed by process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraphStore {
    users: Arc<RwLock<UserTable>>,
    tweets: Arc<RwLock<HashMap<TweetId, Tweet>>>,
    messages: Arc<RwLock<HashMap<MessageId, Message>>>,
    notifications: Arc<RwLock<HashMap<NotificationId, Notification>>>,
    unavailable: Arc<AtomicBool>,
    latency_micros: Arc<AtomicU64>,
}

fn read<T>(lock: &RwLock<T>) -> ChirpResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| ChirpError::Storage(StorageError::LockPoisoned))
}

fn write<T>(lock: &RwLock<T>) -> ChirpResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| ChirpError::Storage(StorageError::LockPoisoned))
}

fn not_found(entity_type: EntityType, id: uuid::Uuid) -> ChirpError {
    ChirpError::Storage(StorageError::NotFound { entity_type, id })
}

/// Newest first, ties broken by id (UUIDv7 ids are creation ordered).
fn newest_first<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, K)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn apply_user_mutation(user: &mut User, mutation: UserMutation) -> ChirpResult<()> {
    match mutation {
        UserMutation::AddFollower(follower) => {
            if follower == user.id {
                return Err(OperationError::SelfFollow.into());
            }
            if user.followers.insert(follower) {
                user.follower_count += 1;
            }
        }
        UserMutation::RemoveFollower(follower) => {
            if user.followers.remove(&follower) {
                user.follower_count = user.follower_count.saturating_sub(1);
            }
        }
        UserMutation::AddFollowing(target) => {
            if target == user.id {
                return Err(OperationError::SelfFollow.into());
            }
            if user.following.insert(target) {
                user.following_count += 1;
            }
        }
        UserMutation::RemoveFollowing(target) => {
            if user.following.remove(&target) {
                user.following_count = user.following_count.saturating_sub(1);
            }
        }
        UserMutation::UpdateProfile(update) => {
            if let Some(display_name) = update.display_name {
                user.display_name = display_name;
            }
            if let Some(bio) = update.bio {
                user.bio = bio;
            }
        }
        UserMutation::ReconcileCounters => {
            user.follower_count = user.followers.len() as u64;
            user.following_count = user.following.len() as u64;
        }
    }
    user.updated_at = Utc::now();
    Ok(())
}

fn apply_tweet_mutation(tweet: &mut Tweet, mutation: TweetMutation) {
    match mutation {
        TweetMutation::AddLike(user) => {
            if tweet.likes.insert(user) {
                tweet.like_count += 1;
            }
        }
        TweetMutation::RemoveLike(user) => {
            if tweet.likes.remove(&user) {
                tweet.like_count = tweet.like_count.saturating_sub(1);
            }
        }
        TweetMutation::IncrementRetweets => tweet.retweet_count += 1,
        TweetMutation::DecrementRetweets => {
            tweet.retweet_count = tweet.retweet_count.saturating_sub(1)
        }
        TweetMutation::SetContent { content, hashtags } => {
            tweet.content = content;
            tweet.hashtags = hashtags;
        }
        TweetMutation::ReconcileCounters { retweet_count } => {
            tweet.like_count = tweet.likes.len() as u64;
            tweet.retweet_count = retweet_count;
        }
    }
    tweet.updated_at = Utc::now();
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while set, every operation fails.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every subsequent operation by `latency`. Zero turns it off.
    pub fn set_latency(&self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.latency_micros.store(micros, Ordering::SeqCst);
    }

    async fn ready(&self) -> ChirpResult<()> {
        let micros = self.latency_micros.load(Ordering::SeqCst);
        if micros > 0 {
            tokio::time::sleep(Duration::from_micros(micros)).await;
        }
        self.check_available()
    }

    fn check_available(&self) -> ChirpResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable {
                reason: "graph store is offline".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Number of stored tweets, retweets included.
    pub fn tweet_count(&self) -> usize {
        self.tweets.read().map(|t| t.len()).unwrap_or(0)
    }

    /// Number of stored notifications across all recipients.
    pub fn notification_total(&self) -> usize {
        self.notifications.read().map(|n| n.len()).unwrap_or(0)
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    // === User Operations ===

    async fn user_insert(&self, user: &User) -> ChirpResult<()> {
        self.ready().await?;
        let mut users = write(&self.users)?;
        if users.by_id.contains_key(&user.id) || users.by_username.contains_key(&user.username) {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::User,
                reason: "username or id already exists".to_string(),
            }
            .into());
        }
        if users.by_id.values().any(|u| u.email == user.email) {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::User,
                reason: "email already exists".to_string(),
            }
            .into());
        }
        users.by_username.insert(user.username.clone(), user.id);
        users.by_id.insert(user.id, user.clone());
        Ok(())
    }

    async fn user_get(&self, id: UserId) -> ChirpResult<Option<User>> {
        self.ready().await?;
        Ok(read(&self.users)?.by_id.get(&id).cloned())
    }

    async fn user_get_by_username(&self, username: &str) -> ChirpResult<Option<User>> {
        self.ready().await?;
        let users = read(&self.users)?;
        let key = username.to_lowercase();
        Ok(users
            .by_username
            .get(&key)
            .and_then(|id| users.by_id.get(id))
            .cloned())
    }

    async fn users_get_many(&self, ids: &[UserId]) -> ChirpResult<Vec<User>> {
        self.ready().await?;
        let users = read(&self.users)?;
        Ok(ids.iter().filter_map(|id| users.by_id.get(id).cloned()).collect())
    }

    async fn user_apply(&self, id: UserId, mutation: UserMutation) -> ChirpResult<User> {
        self.ready().await?;
        let mut users = write(&self.users)?;
        let user = users
            .by_id
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityType::User, id.as_uuid()))?;
        apply_user_mutation(user, mutation)?;
        Ok(user.clone())
    }

    // === Tweet Operations ===

    async fn tweet_insert(&self, tweet: &Tweet) -> ChirpResult<()> {
        self.ready().await?;
        let mut tweets = write(&self.tweets)?;
        if tweets.contains_key(&tweet.id) {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::Tweet,
                reason: "already exists".to_string(),
            }
            .into());
        }
        tweets.insert(tweet.id, tweet.clone());
        Ok(())
    }

    async fn tweet_get(&self, id: TweetId) -> ChirpResult<Option<Tweet>> {
        self.ready().await?;
        Ok(read(&self.tweets)?.get(&id).cloned())
    }

    async fn tweet_apply(&self, id: TweetId, mutation: TweetMutation) -> ChirpResult<Tweet> {
        self.ready().await?;
        let mut tweets = write(&self.tweets)?;
        let tweet = tweets
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityType::Tweet, id.as_uuid()))?;
        apply_tweet_mutation(tweet, mutation);
        Ok(tweet.clone())
    }

    async fn tweet_delete(&self, id: TweetId) -> ChirpResult<Option<Tweet>> {
        self.ready().await?;
        Ok(write(&self.tweets)?.remove(&id))
    }

    async fn tweet_find_retweet(
        &self,
        author: UserId,
        original: TweetId,
    ) -> ChirpResult<Option<Tweet>> {
        self.ready().await?;
        Ok(read(&self.tweets)?
            .values()
            .find(|t| t.is_retweet && t.author == author && t.original_tweet == Some(original))
            .cloned())
    }

    async fn tweet_list_retweets_of(&self, original: TweetId) -> ChirpResult<Vec<Tweet>> {
        self.ready().await?;
        let mut retweets: Vec<Tweet> = read(&self.tweets)?
            .values()
            .filter(|t| t.is_retweet && t.original_tweet == Some(original))
            .cloned()
            .collect();
        newest_first(&mut retweets, |t| (t.created_at, t.id));
        Ok(retweets)
    }

    async fn tweet_list_feed(&self, page: PageRequest) -> ChirpResult<Vec<Tweet>> {
        self.ready().await?;
        let mut feed: Vec<Tweet> = read(&self.tweets)?
            .values()
            .filter(|t| !t.is_retweet)
            .cloned()
            .collect();
        newest_first(&mut feed, |t| (t.created_at, t.id));
        Ok(paginate(feed, page))
    }

    async fn tweet_count_feed(&self) -> ChirpResult<u64> {
        self.ready().await?;
        Ok(read(&self.tweets)?.values().filter(|t| !t.is_retweet).count() as u64)
    }

    async fn tweet_list_by_author(
        &self,
        author: UserId,
        page: PageRequest,
    ) -> ChirpResult<Vec<Tweet>> {
        self.ready().await?;
        let mut tweets: Vec<Tweet> = read(&self.tweets)?
            .values()
            .filter(|t| t.author == author)
            .cloned()
            .collect();
        newest_first(&mut tweets, |t| (t.created_at, t.id));
        Ok(paginate(tweets, page))
    }

    async fn tweet_count_by_author(&self, author: UserId) -> ChirpResult<u64> {
        self.ready().await?;
        Ok(read(&self.tweets)?.values().filter(|t| t.author == author).count() as u64)
    }

    // === Message Operations ===

    async fn message_insert(&self, message: &Message) -> ChirpResult<()> {
        self.ready().await?;
        let mut messages = write(&self.messages)?;
        if messages.contains_key(&message.id) {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::Message,
                reason: "already exists".to_string(),
            }
            .into());
        }
        messages.insert(message.id, message.clone());
        Ok(())
    }

    async fn message_get(&self, id: MessageId) -> ChirpResult<Option<Message>> {
        self.ready().await?;
        Ok(read(&self.messages)?.get(&id).cloned())
    }

    async fn message_mark_read(&self, id: MessageId) -> ChirpResult<bool> {
        self.ready().await?;
        let mut messages = write(&self.messages)?;
        let message = messages
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityType::Message, id.as_uuid()))?;
        if message.read {
            return Ok(false);
        }
        message.read = true;
        Ok(true)
    }

    async fn message_list_conversation(
        &self,
        a: UserId,
        b: UserId,
        page: PageRequest,
    ) -> ChirpResult<Vec<Message>> {
        self.ready().await?;
        let mut conversation: Vec<Message> = read(&self.messages)?
            .values()
            .filter(|m| m.involves(a) && m.counterpart(a) == b)
            .cloned()
            .collect();
        newest_first(&mut conversation, |m| (m.created_at, m.id));
        Ok(paginate(conversation, page))
    }

    async fn message_count_conversation(&self, a: UserId, b: UserId) -> ChirpResult<u64> {
        self.ready().await?;
        Ok(read(&self.messages)?
            .values()
            .filter(|m| m.involves(a) && m.counterpart(a) == b)
            .count() as u64)
    }

    async fn message_latest_per_counterpart(&self, user: UserId) -> ChirpResult<Vec<Message>> {
        self.ready().await?;
        let messages = read(&self.messages)?;
        let mut latest: HashMap<UserId, &Message> = HashMap::new();
        for message in messages.values().filter(|m| m.involves(user)) {
            let counterpart = message.counterpart(user);
            let newer = latest
                .get(&counterpart)
                .map(|current| (message.created_at, message.id) > (current.created_at, current.id))
                .unwrap_or(true);
            if newer {
                latest.insert(counterpart, message);
            }
        }
        let mut out: Vec<Message> = latest.into_values().cloned().collect();
        newest_first(&mut out, |m| (m.created_at, m.id));
        Ok(out)
    }

    // === Notification Operations ===

    async fn notification_insert(&self, notification: &Notification) -> ChirpResult<()> {
        self.ready().await?;
        let mut notifications = write(&self.notifications)?;
        if notifications.contains_key(&notification.id) {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::Notification,
                reason: "already exists".to_string(),
            }
            .into());
        }
        notifications.insert(notification.id, notification.clone());
        Ok(())
    }

    async fn notification_list(
        &self,
        recipient: UserId,
        page: PageRequest,
    ) -> ChirpResult<Vec<Notification>> {
        self.ready().await?;
        let mut items: Vec<Notification> = read(&self.notifications)?
            .values()
            .filter(|n| n.recipient == recipient)
            .cloned()
            .collect();
        newest_first(&mut items, |n| (n.created_at, n.id));
        Ok(paginate(items, page))
    }

    async fn notification_count(&self, recipient: UserId) -> ChirpResult<u64> {
        self.ready().await?;
        Ok(read(&self.notifications)?
            .values()
            .filter(|n| n.recipient == recipient)
            .count() as u64)
    }

    async fn notification_count_unread(&self, recipient: UserId) -> ChirpResult<u64> {
        self.ready().await?;
        Ok(read(&self.notifications)?
            .values()
            .filter(|n| n.recipient == recipient && !n.read)
            .count() as u64)
    }

    async fn notification_mark_read(
        &self,
        id: NotificationId,
        recipient: UserId,
    ) -> ChirpResult<Option<Notification>> {
        self.ready().await?;
        let mut notifications = write(&self.notifications)?;
        match notifications.get_mut(&id) {
            Some(n) if n.recipient == recipient => {
                n.read = true;
                Ok(Some(n.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn notification_mark_all_read(&self, recipient: UserId) -> ChirpResult<u64> {
        self.ready().await?;
        let mut changed = 0;
        for n in write(&self.notifications)?
            .values_mut()
            .filter(|n| n.recipient == recipient && !n.read)
        {
            n.read = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn ping(&self) -> ChirpResult<()> {
        self.ready().await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chirp_core::{NotificationRequest, NotificationType, ProfileUpdate};
    use proptest::prelude::*;

    fn user(name: &str) -> User {
        match User::new(name, &format!("{name}@example.com"), name) {
            Ok(u) => u,
            Err(e) => panic!("fixture user {name}: {e}"),
        }
    }

    fn tweet(author: UserId, content: &str) -> Tweet {
        match Tweet::new(author, content, vec![]) {
            Ok(t) => t,
            Err(e) => panic!("fixture tweet: {e}"),
        }
    }

    #[tokio::test]
    async fn test_user_insert_rejects_duplicate_username() -> ChirpResult<()> {
        let store = InMemoryGraphStore::new();
        store.user_insert(&user("alice")).await?;
        let dup = user("alice");
        assert!(store.user_insert(&dup).await.is_err());
        assert!(store.user_get_by_username("ALICE").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_follow_mutations_keep_counters_in_lockstep() -> ChirpResult<()> {
        let store = InMemoryGraphStore::new();
        let a = user("alice");
        let b = user("bobby");
        store.user_insert(&a).await?;
        store.user_insert(&b).await?;

        let updated = store.user_apply(a.id, UserMutation::AddFollowing(b.id)).await?;
        assert_eq!(updated.following_count, 1);
        // Inserting again does not double count.
        let updated = store.user_apply(a.id, UserMutation::AddFollowing(b.id)).await?;
        assert_eq!(updated.following_count, 1);

        let updated = store.user_apply(a.id, UserMutation::RemoveFollowing(b.id)).await?;
        assert_eq!(updated.following_count, 0);
        let updated = store.user_apply(a.id, UserMutation::RemoveFollowing(b.id)).await?;
        assert_eq!(updated.following_count, 0);
        assert!(updated.counters_consistent());
        Ok(())
    }

    #[tokio::test]
    async fn test_self_follow_mutation_rejected() -> ChirpResult<()> {
        let store = InMemoryGraphStore::new();
        let a = user("alice");
        store.user_insert(&a).await?;
        let err = store.user_apply(a.id, UserMutation::AddFollower(a.id)).await;
        assert!(matches!(err, Err(ChirpError::Operation(OperationError::SelfFollow))));
        let unchanged = store.user_get(a.id).await?;
        assert_eq!(unchanged.map(|u| u.follower_count), Some(0));
        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_repairs_drifted_counter() -> ChirpResult<()> {
        let store = InMemoryGraphStore::new();
        let mut a = user("alice");
        a.follower_count = 7;
        store.user_insert(&a).await?;
        let fixed = store.user_apply(a.id, UserMutation::ReconcileCounters).await?;
        assert_eq!(fixed.follower_count, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_profile_update_applies_fields() -> ChirpResult<()> {
        let store = InMemoryGraphStore::new();
        let a = user("alice");
        store.user_insert(&a).await?;
        let update = ProfileUpdate {
            display_name: None,
            bio: Some("hello".to_string()),
        };
        let updated = store.user_apply(a.id, UserMutation::UpdateProfile(update)).await?;
        assert_eq!(updated.bio, "hello");
        assert_eq!(updated.display_name, "alice");
        Ok(())
    }

    #[tokio::test]
    async fn test_feed_excludes_retweets_and_orders_newest_first() -> ChirpResult<()> {
        let store = InMemoryGraphStore::new();
        let a = UserId::now_v7();
        let first = tweet(a, "first");
        let second = tweet(a, "second");
        let retweet = Tweet::retweet_of(UserId::now_v7(), &first);
        store.tweet_insert(&first).await?;
        store.tweet_insert(&second).await?;
        store.tweet_insert(&retweet).await?;

        let feed = store.tweet_list_feed(PageRequest::default()).await?;
        let ids: Vec<TweetId> = feed.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(store.tweet_count_feed().await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_find_retweet_is_exact() -> ChirpResult<()> {
        let store = InMemoryGraphStore::new();
        let author = UserId::now_v7();
        let actor = UserId::now_v7();
        let original = tweet(author, "original");
        let other = tweet(author, "other");
        store.tweet_insert(&original).await?;
        store.tweet_insert(&other).await?;

        // A plain tweet by the actor that happens to have the same content.
        store.tweet_insert(&tweet(actor, "original")).await?;
        assert!(store.tweet_find_retweet(actor, original.id).await?.is_none());

        let retweet = Tweet::retweet_of(actor, &other);
        store.tweet_insert(&retweet).await?;
        assert!(store.tweet_find_retweet(actor, original.id).await?.is_none());
        assert_eq!(
            store.tweet_find_retweet(actor, other.id).await?.map(|t| t.id),
            Some(retweet.id)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_message_mark_read_transitions_once() -> ChirpResult<()> {
        let store = InMemoryGraphStore::new();
        let msg = match Message::new(UserId::now_v7(), UserId::now_v7(), "hi") {
            Ok(m) => m,
            Err(e) => panic!("{e}"),
        };
        store.message_insert(&msg).await?;
        assert!(store.message_mark_read(msg.id).await?);
        assert!(!store.message_mark_read(msg.id).await?);
        assert_eq!(store.message_get(msg.id).await?.map(|m| m.read), Some(true));
        Ok(())
    }

    #[tokio::test]
    async fn test_latest_per_counterpart() -> ChirpResult<()> {
        let store = InMemoryGraphStore::new();
        let (a, b, c) = (UserId::now_v7(), UserId::now_v7(), UserId::now_v7());
        for (from, to, text) in [(a, b, "1"), (b, a, "2"), (a, c, "3")] {
            let msg = match Message::new(from, to, text) {
                Ok(m) => m,
                Err(e) => panic!("{e}"),
            };
            store.message_insert(&msg).await?;
        }
        let latest = store.message_latest_per_counterpart(a).await?;
        let contents: Vec<&str> = latest.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["3", "2"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_notification_unread_count_is_live() -> ChirpResult<()> {
        let store = InMemoryGraphStore::new();
        let recipient = UserId::now_v7();
        let other = UserId::now_v7();
        let n1 =
            NotificationRequest::new(recipient, other, NotificationType::Like).into_notification();
        let n2 = NotificationRequest::new(recipient, other, NotificationType::Follow)
            .into_notification();
        store.notification_insert(&n1).await?;
        store.notification_insert(&n2).await?;
        assert_eq!(store.notification_count_unread(recipient).await?, 2);

        assert!(store.notification_mark_read(n1.id, other).await?.is_none());
        assert!(store.notification_mark_read(n1.id, recipient).await?.is_some());
        assert_eq!(store.notification_count_unread(recipient).await?, 1);

        assert_eq!(store.notification_mark_all_read(recipient).await?, 1);
        assert_eq!(store.notification_count_unread(recipient).await?, 0);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_delays_each_call() -> ChirpResult<()> {
        let store = InMemoryGraphStore::new();
        store.set_latency(Duration::from_millis(40));
        let started = tokio::time::Instant::now();
        store.ping().await?;
        store.user_get(UserId::now_v7()).await?;
        assert!(started.elapsed() >= Duration::from_millis(80));

        store.set_latency(Duration::ZERO);
        let started = tokio::time::Instant::now();
        store.ping().await?;
        assert_eq!(started.elapsed(), Duration::ZERO);
        Ok(())
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() -> ChirpResult<()> {
        let store = InMemoryGraphStore::new();
        store.set_unavailable(true);
        let err = store.ping().await;
        assert!(matches!(
            err,
            Err(ChirpError::Storage(StorageError::Unavailable { .. }))
        ));
        assert!(store.user_get(UserId::now_v7()).await.is_err());
        store.set_unavailable(false);
        store.ping().await
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_like_set_and_counter_never_diverge(
            ops in proptest::collection::vec((0usize..4, any::<bool>()), 0..40)
        ) {
            let likers: Vec<UserId> = (0..4).map(|_| UserId::now_v7()).collect();
            let mut t = tweet(UserId::now_v7(), "prop");
            for (who, add) in ops {
                let mutation = if add {
                    TweetMutation::AddLike(likers[who])
                } else {
                    TweetMutation::RemoveLike(likers[who])
                };
                apply_tweet_mutation(&mut t, mutation);
                prop_assert!(t.counters_consistent());
            }
        }
    }
}
