//! Chirp Test Utilities
//!
//! Shared test infrastructure for the Chirp workspace:
//! - Proptest generators for ids, usernames, tweet text and toggle sequences
//! - Fixtures for users and tweets, plus a seeded in-memory store
//! - Assertions for counter consistency and error variants

pub use chirp_storage::{GraphStore, InMemoryCacheBackend, InMemoryGraphStore};

pub use chirp_core::{
    ChirpError, ChirpResult, EntityIdType, EntityType, Message, MessageId, Notification,
    NotificationId, NotificationType, OperationError, StorageError, Timestamp, ToggleKind, Tweet,
    TweetId, User, UserId, ValidationError,
};

use chrono::Utc;
use uuid::Uuid;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Chirp inputs.

    use super::*;
    use proptest::prelude::*;

    /// Generate a random UUID (for generic ID generation).
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        arb_uuid().prop_map(UserId::new)
    }

    pub fn arb_tweet_id() -> impl Strategy<Value = TweetId> {
        arb_uuid().prop_map(TweetId::new)
    }

    pub fn arb_message_id() -> impl Strategy<Value = MessageId> {
        arb_uuid().prop_map(MessageId::new)
    }

    /// Generate a Timestamp within 2020-2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    /// Usernames that pass normalization: 3-30 word characters.
    pub fn arb_username() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{2,29}"
    }

    /// Tweet text within the 280 character limit, never blank.
    pub fn arb_tweet_content() -> impl Strategy<Value = String> {
        "[A-Za-z0-9][A-Za-z0-9 .,!?]{0,279}"
    }

    /// Tweet text over the limit.
    pub fn arb_oversized_content() -> impl Strategy<Value = String> {
        "[a-z]{281,400}"
    }

    pub fn arb_toggle_kind() -> impl Strategy<Value = ToggleKind> {
        prop_oneof![
            Just(ToggleKind::Follow),
            Just(ToggleKind::Like),
            Just(ToggleKind::Retweet),
        ]
    }

    pub fn arb_notification_type() -> impl Strategy<Value = NotificationType> {
        prop_oneof![
            Just(NotificationType::Like),
            Just(NotificationType::Comment),
            Just(NotificationType::Follow),
            Just(NotificationType::Retweet),
            Just(NotificationType::Mention),
        ]
    }

    /// A run of toggle calls, each made by one of `actors` users.
    ///
    /// Each element is an actor index in `0..actors`.
    pub fn arb_toggle_sequence(actors: usize, max_len: usize) -> impl Strategy<Value = Vec<usize>> {
        prop::collection::vec(0..actors.max(1), 0..=max_len)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;

    /// A user named `username` with a matching email and display name.
    ///
    /// # Panics
    /// Panics if `username` does not pass normalization.
    pub fn user(username: &str) -> User {
        match User::new(username, &format!("{}@example.com", username), username) {
            Ok(user) => user,
            Err(e) => panic!("invalid fixture username {:?}: {}", username, e),
        }
    }

    /// An original tweet by `author`.
    ///
    /// # Panics
    /// Panics if `content` is blank or too long.
    pub fn tweet(author: UserId, content: &str) -> Tweet {
        match Tweet::new(author, content, Vec::new()) {
            Ok(tweet) => tweet,
            Err(e) => panic!("invalid fixture tweet content: {}", e),
        }
    }

    /// Insert one user per name into `store` and return them in order.
    pub async fn seed_users(store: &dyn GraphStore, names: &[&str]) -> ChirpResult<Vec<User>> {
        let mut users = Vec::with_capacity(names.len());
        for name in names {
            let u = user(name);
            store.user_insert(&u).await?;
            users.push(u);
        }
        Ok(users)
    }

    /// Insert a tweet by `author` into `store`.
    pub async fn seed_tweet(
        store: &dyn GraphStore,
        author: UserId,
        content: &str,
    ) -> ChirpResult<Tweet> {
        let t = tweet(author, content);
        store.tweet_insert(&t).await?;
        Ok(t)
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for Chirp-specific invariants.

    use super::*;

    /// Counters equal their backing set sizes.
    #[track_caller]
    pub fn assert_user_counters_consistent(user: &User) {
        assert!(
            user.counters_consistent(),
            "user {} counters drifted: followers {} vs {}, following {} vs {}",
            user.username,
            user.follower_count,
            user.followers.len(),
            user.following_count,
            user.following.len()
        );
    }

    #[track_caller]
    pub fn assert_tweet_counters_consistent(tweet: &Tweet) {
        assert!(
            tweet.counters_consistent(),
            "tweet {} like_count {} vs {} likes",
            tweet.id,
            tweet.like_count,
            tweet.likes.len()
        );
    }

    /// Assert that a ChirpResult is a NotFound storage error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &ChirpResult<T>, entity_type: EntityType) {
        match result {
            Err(ChirpError::Storage(StorageError::NotFound { entity_type: et, .. }))
            | Err(ChirpError::Storage(StorageError::NotFoundByKey { entity_type: et, .. })) => {
                assert_eq!(*et, entity_type, "Wrong entity type in NotFound error");
            }
            other => panic!("Expected NotFound error for {:?}, got: {:?}", entity_type, other),
        }
    }

    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &ChirpResult<T>) {
        match result {
            Err(ChirpError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that a ChirpResult is a NotPermitted operation error.
    #[track_caller]
    pub fn assert_not_permitted<T: std::fmt::Debug>(result: &ChirpResult<T>) {
        match result {
            Err(ChirpError::Operation(OperationError::NotPermitted { .. })) => {}
            other => panic!("Expected NotPermitted error, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_user_fixture_is_consistent() {
        let u = fixtures::user("alice");
        assert_eq!(u.username, "alice");
        assert_eq!(u.email, "alice@example.com");
        assertions::assert_user_counters_consistent(&u);
    }

    #[tokio::test]
    async fn test_seed_users_inserts_in_order() -> Result<(), String> {
        let store = InMemoryGraphStore::new();
        let users = fixtures::seed_users(&store, &["alice", "bob"])
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(users.len(), 2);
        let bob = store
            .user_get_by_username("bob")
            .await
            .map_err(|e| e.to_string())?
            .ok_or("bob missing")?;
        assert_eq!(bob.id, users[1].id);
        Ok(())
    }

    #[test]
    fn test_assertion_not_found() {
        let result: ChirpResult<()> = Err(ChirpError::Storage(StorageError::NotFound {
            entity_type: EntityType::Tweet,
            id: Uuid::now_v7(),
        }));
        assertions::assert_not_found(&result, EntityType::Tweet);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_generated_usernames_normalize(name in generators::arb_username()) {
            prop_assert!(User::new(&name, "x@example.com", "X").is_ok());
        }

        #[test]
        fn prop_generated_content_is_valid(content in generators::arb_tweet_content()) {
            prop_assert!(Tweet::new(UserId::now_v7(), &content, Vec::new()).is_ok());
        }

        #[test]
        fn prop_oversized_content_rejected(content in generators::arb_oversized_content()) {
            let result: ChirpResult<Tweet> =
                Tweet::new(UserId::now_v7(), &content, Vec::new()).map_err(Into::into);
            assertions::assert_validation_error(&result);
        }
    }
}
