//! Feed Service
//!
//! Tweet authoring and the public timeline. Every write that changes what
//! a feed page would show invalidates all cached feed pages.

use std::sync::Arc;

use chirp_core::{
    identity::EntityIdType,
    text::{extract_hashtags, validate_text, MAX_TWEET_CHARS},
    ChirpError, NotificationRequest, NotificationType, OperationError, PageRequest, Pagination,
    StorageError, ToggleKind, Tweet, TweetId, UserId,
};
use chirp_storage::{cache_keys, CacheRead, CoherentCache, GraphStore, TweetMutation};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::services::{NotificationDispatcher, PairLocks};

/// One cached page of the public feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub tweets: Vec<Tweet>,
    pub pagination: Pagination,
}

#[derive(Clone)]
pub struct FeedService {
    store: Arc<dyn GraphStore>,
    cache: CoherentCache,
    notifications: NotificationDispatcher,
    pair_locks: PairLocks,
}

fn not_permitted(action: &str) -> ApiError {
    OperationError::NotPermitted {
        role: "author".to_string(),
        action: action.to_string(),
    }
    .into()
}

impl FeedService {
    pub fn new(
        store: Arc<dyn GraphStore>,
        cache: CoherentCache,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            store,
            cache,
            notifications,
            pair_locks: PairLocks::default(),
        }
    }

    /// Share the toggle engine's lock table.
    pub fn with_pair_locks(mut self, pair_locks: PairLocks) -> Self {
        self.pair_locks = pair_locks;
        self
    }

    /// Publish a tweet, resolve its `@mentions` and notify the mentioned users.
    pub async fn create_tweet(
        &self,
        author: UserId,
        content: &str,
        media: Vec<String>,
    ) -> ApiResult<Tweet> {
        self.store
            .user_get(author)
            .await?
            .ok_or_else(ApiError::user_not_found)?;

        let mut tweet = Tweet::new(author, content, media)?;
        for username in tweet.mentioned_usernames() {
            match self.store.user_get_by_username(&username).await? {
                Some(user) if !tweet.mentions.contains(&user.id) => tweet.mentions.push(user.id),
                Some(_) => {}
                None => tracing::debug!(username, "mention of unknown user ignored"),
            }
        }

        self.store.tweet_insert(&tweet).await?;
        self.cache.invalidate_feed().await;
        tracing::info!(tweet_id = %tweet.id, author = %author, "tweet created");

        for mentioned in tweet.mentions.iter().filter(|id| **id != author) {
            self.notifications
                .notify(
                    NotificationRequest::new(*mentioned, author, NotificationType::Mention)
                        .with_tweet(tweet.id),
                )
                .await;
        }

        Ok(tweet)
    }

    /// Newest-first page of original tweets, served from the cache when warm.
    pub async fn feed(&self, page: PageRequest) -> ApiResult<CacheRead<FeedPage>> {
        let key = cache_keys::feed(page.page, page.limit);
        let ttl = self.cache.config().feed_ttl;
        let store = self.store.clone();
        let read = self
            .cache
            .get_or_load(&key, ttl, || async move {
                let tweets = store.tweet_list_feed(page).await?;
                let total = store.tweet_count_feed().await?;
                Ok::<_, ChirpError>(FeedPage {
                    tweets,
                    pagination: Pagination::new(page, total),
                })
            })
            .await?;
        Ok(read)
    }

    pub async fn get_tweet(&self, id: TweetId) -> ApiResult<Tweet> {
        self.store
            .tweet_get(id)
            .await?
            .ok_or_else(ApiError::tweet_not_found)
    }

    /// Replace the content of a tweet. Only its author may do so.
    pub async fn update_tweet(
        &self,
        actor: UserId,
        id: TweetId,
        content: &str,
    ) -> ApiResult<Tweet> {
        let tweet = self.get_tweet(id).await?;
        if tweet.author != actor {
            return Err(not_permitted("update this tweet"));
        }
        let content = validate_text("content", content, MAX_TWEET_CHARS)?;
        let hashtags = extract_hashtags(&content);
        let updated = self
            .store
            .tweet_apply(id, TweetMutation::SetContent { content, hashtags })
            .await?;
        self.cache.invalidate_feed().await;
        Ok(updated)
    }

    /// Delete a tweet. Only its author may do so.
    ///
    /// Deleting a retweet decrements the original's retweet counter under
    /// the same pair lock as the retweet toggle. Every retweet that points
    /// at the deleted tweet goes with it, transitively.
    pub async fn delete_tweet(&self, actor: UserId, id: TweetId) -> ApiResult<()> {
        let tweet = self.get_tweet(id).await?;
        if tweet.author != actor {
            return Err(not_permitted("delete this tweet"));
        }

        let removed = match tweet.original_tweet {
            Some(original) if tweet.is_retweet => {
                let _pair = self
                    .pair_locks
                    .acquire(ToggleKind::Retweet, tweet.author.as_uuid(), original.as_uuid())
                    .await;
                let removed = self.store.tweet_delete(id).await?;
                if removed.is_some() {
                    self.decrement_retweets(original).await?;
                }
                removed
            }
            _ => self.store.tweet_delete(id).await?,
        };
        if removed.is_none() {
            return Err(ApiError::tweet_not_found());
        }

        let cascaded = self.cascade_retweets(id).await?;
        if cascaded > 0 {
            tracing::debug!(tweet_id = %id, count = cascaded, "cascaded retweet deletion");
        }

        self.cache.invalidate_feed().await;
        tracing::info!(tweet_id = %id, author = %actor, "tweet deleted");
        Ok(())
    }

    async fn decrement_retweets(&self, original: TweetId) -> ApiResult<()> {
        match self
            .store
            .tweet_apply(original, TweetMutation::DecrementRetweets)
            .await
        {
            Ok(_) => Ok(()),
            // The original went first; nothing left to decrement.
            Err(ChirpError::Storage(StorageError::NotFound { .. })) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Delete every retweet reachable from `root`. Returns how many went.
    async fn cascade_retweets(&self, root: TweetId) -> ApiResult<usize> {
        let mut pending = vec![root];
        let mut removed = 0;
        while let Some(id) = pending.pop() {
            for retweet in self.store.tweet_list_retweets_of(id).await? {
                if self.store.tweet_delete(retweet.id).await?.is_some() {
                    removed += 1;
                }
                pending.push(retweet.id);
            }
        }
        Ok(removed)
    }

    /// Newest-first page of one user's tweets and retweets.
    pub async fn user_tweets(
        &self,
        username: &str,
        page: PageRequest,
    ) -> ApiResult<(Vec<Tweet>, Pagination)> {
        let user = self
            .store
            .user_get_by_username(&username.to_lowercase())
            .await?
            .ok_or_else(ApiError::user_not_found)?;
        let tweets = self.store.tweet_list_by_author(user.id, page).await?;
        let total = self.store.tweet_count_by_author(user.id).await?;
        Ok((tweets, Pagination::new(page, total)))
    }
}

// =============================================================================
// TESTS
// =============================================================================
