//! Async graph store trait.
//!
//! The graph store persists users, tweets, messages and notifications.
//! Every method is a single-document operation: reads return owned
//! snapshots and `*_apply` methods perform an atomic read-modify-write on
//! exactly one document. Nothing here spans two documents, so callers that
//! touch a pair of documents (follow edges) must tolerate the gap between
//! the two writes.

use ::async_trait::async_trait;
use chirp_core::{
    ChirpResult, Message, MessageId, Notification, NotificationId, PageRequest, ProfileUpdate,
    Tweet, TweetId, User, UserId,
};

/// Atomic change to a single user document.
///
/// Set operations keep the mirrored counter in lockstep: an insert that
/// actually lands increments, a removal that actually lands decrements with
/// a floor of zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserMutation {
    AddFollower(UserId),
    RemoveFollower(UserId),
    AddFollowing(UserId),
    RemoveFollowing(UserId),
    UpdateProfile(ProfileUpdate),
    /// Recompute both counters from set cardinality.
    ReconcileCounters,
}

/// Atomic change to a single tweet document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TweetMutation {
    AddLike(UserId),
    RemoveLike(UserId),
    IncrementRetweets,
    /// Decrement with a floor of zero.
    DecrementRetweets,
    SetContent { content: String, hashtags: Vec<String> },
    /// Recompute `like_count` from the like set and set `retweet_count`.
    ReconcileCounters { retweet_count: u64 },
}

/// Async storage trait for the social graph.
#[async_trait]
pub trait GraphStore: Send + Sync {
    // ========================================================================
    // USER OPERATIONS
    // ========================================================================

    /// Insert a new user. Username and email must be unique.
    async fn user_insert(&self, user: &User) -> ChirpResult<()>;

    async fn user_get(&self, id: UserId) -> ChirpResult<Option<User>>;

    async fn user_get_by_username(&self, username: &str) -> ChirpResult<Option<User>>;

    /// Fetch several users, skipping ids that do not exist.
    async fn users_get_many(&self, ids: &[UserId]) -> ChirpResult<Vec<User>>;

    /// Apply a mutation atomically and return the updated document.
    async fn user_apply(&self, id: UserId, mutation: UserMutation) -> ChirpResult<User>;

    // ========================================================================
    // TWEET OPERATIONS
    // ========================================================================

    async fn tweet_insert(&self, tweet: &Tweet) -> ChirpResult<()>;

    async fn tweet_get(&self, id: TweetId) -> ChirpResult<Option<Tweet>>;

    /// Apply a mutation atomically and return the updated document.
    async fn tweet_apply(&self, id: TweetId, mutation: TweetMutation) -> ChirpResult<Tweet>;

    /// Delete a tweet, returning the removed document if it existed.
    async fn tweet_delete(&self, id: TweetId) -> ChirpResult<Option<Tweet>>;

    /// Exact lookup of `author`'s retweet of `original`.
    async fn tweet_find_retweet(
        &self,
        author: UserId,
        original: TweetId,
    ) -> ChirpResult<Option<Tweet>>;

    /// All live retweets referencing `original`.
    async fn tweet_list_retweets_of(&self, original: TweetId) -> ChirpResult<Vec<Tweet>>;

    /// Original tweets, newest first.
    async fn tweet_list_feed(&self, page: PageRequest) -> ChirpResult<Vec<Tweet>>;

    async fn tweet_count_feed(&self) -> ChirpResult<u64>;

    /// Tweets and retweets by `author`, newest first.
    async fn tweet_list_by_author(
        &self,
        author: UserId,
        page: PageRequest,
    ) -> ChirpResult<Vec<Tweet>>;

    async fn tweet_count_by_author(&self, author: UserId) -> ChirpResult<u64>;

    // ========================================================================
    // MESSAGE OPERATIONS
    // ========================================================================

    async fn message_insert(&self, message: &Message) -> ChirpResult<()>;

    async fn message_get(&self, id: MessageId) -> ChirpResult<Option<Message>>;

    /// Flip `read` false→true. Returns `true` only for the call that
    /// performed the transition.
    async fn message_mark_read(&self, id: MessageId) -> ChirpResult<bool>;

    /// Messages exchanged between `a` and `b`, newest first.
    async fn message_list_conversation(
        &self,
        a: UserId,
        b: UserId,
        page: PageRequest,
    ) -> ChirpResult<Vec<Message>>;

    async fn message_count_conversation(&self, a: UserId, b: UserId) -> ChirpResult<u64>;

    /// Most recent message per counterpart of `user`, newest first.
    async fn message_latest_per_counterpart(&self, user: UserId) -> ChirpResult<Vec<Message>>;

    // ========================================================================
    // NOTIFICATION OPERATIONS
    // ========================================================================

    async fn notification_insert(&self, notification: &Notification) -> ChirpResult<()>;

    /// Notifications for `recipient`, newest first.
    async fn notification_list(
        &self,
        recipient: UserId,
        page: PageRequest,
    ) -> ChirpResult<Vec<Notification>>;

    async fn notification_count(&self, recipient: UserId) -> ChirpResult<u64>;

    /// Live count of `read = false` rows for `recipient`.
    async fn notification_count_unread(&self, recipient: UserId) -> ChirpResult<u64>;

    /// Mark one notification read. Returns `None` when it does not exist
    /// or belongs to someone else.
    async fn notification_mark_read(
        &self,
        id: NotificationId,
        recipient: UserId,
    ) -> ChirpResult<Option<Notification>>;

    /// Mark every unread notification of `recipient` read, returning how many changed.
    async fn notification_mark_all_read(&self, recipient: UserId) -> ChirpResult<u64>;

    // ========================================================================
    // HEALTH
    // ========================================================================

    /// Cheap liveness probe.
    async fn ping(&self) -> ChirpResult<()>;
}
