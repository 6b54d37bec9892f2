//! Toggle Service
//!
//! Follow, like and retweet are toggles: the current membership decides
//! whether the call adds or removes the relation. The membership sets are
//! the source of truth and every counter moves only when its set changed.
//!
//! Toggles on the same `(kind, actor, target)` pair are serialized inside
//! this process, so two concurrent calls from one user can never both read
//! "absent". Follow touches two user documents with two writes; a crash
//! between them leaves one side stale until `reconcile_user_counters` runs.

use std::sync::Arc;

use chirp_core::{
    identity::EntityIdType, NotificationRequest, OperationError, Tweet, TweetId, ToggleDirection,
    ToggleKind, User, UserId,
};
use chirp_storage::{CoherentCache, GraphStore, TweetMutation, UserMutation};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::services::NotificationDispatcher;
use crate::telemetry::metrics::with_metrics;

// ============================================================================
// OUTCOMES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowOutcome {
    pub direction: ToggleDirection,
    /// The acting user after the write
    pub actor: User,
    /// The followed/unfollowed user after the write
    pub target: User,
}

impl FollowOutcome {
    pub fn is_following(&self) -> bool {
        self.direction.is_added()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
    pub direction: ToggleDirection,
    pub tweet: Tweet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetweetOutcome {
    pub direction: ToggleDirection,
    /// The original tweet with its updated retweet counter
    pub original: Tweet,
    /// The retweet entity, when one was created
    pub retweet: Option<Tweet>,
}

// ============================================================================
// PAIR LOCKS
// ============================================================================

type PairKey = (ToggleKind, Uuid, Uuid);

/// Keyed async locks over `(kind, actor, target)`.
///
/// Shared with the feed service so that deleting a retweet and toggling
/// the same retweet take turns.
#[derive(Clone, Default)]
pub struct PairLocks {
    locks: Arc<DashMap<PairKey, Arc<Mutex<()>>>>,
}

/// Holds one pair lock; drops the map entry once nobody else waits on it.
pub(crate) struct PairGuard {
    key: PairKey,
    locks: Arc<DashMap<PairKey, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PairGuard {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl PairLocks {
    pub(crate) async fn acquire(&self, kind: ToggleKind, actor: Uuid, target: Uuid) -> PairGuard {
        let key = (kind, actor, target);
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        PairGuard {
            key,
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }

    fn len(&self) -> usize {
        self.locks.len()
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Applies toggles, keeps counters in step and fans out side effects
/// (cache invalidation, notifications, metrics).
#[derive(Clone)]
pub struct ToggleEngine {
    store: Arc<dyn GraphStore>,
    cache: CoherentCache,
    notifications: NotificationDispatcher,
    pair_locks: PairLocks,
}

impl ToggleEngine {
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

    /// Pair locks currently held or awaited.
    pub fn in_flight(&self) -> usize {
        self.pair_locks.len()
    }

    /// Handle to the lock table, for services that remove retweets outside a toggle.
    pub fn pair_locks(&self) -> PairLocks {
        self.pair_locks.clone()
    }

    /// Follow `target` if `actor` does not follow them yet, else unfollow.
    pub async fn toggle_follow(&self, actor: UserId, target: UserId) -> ApiResult<FollowOutcome> {
        if actor == target {
            return Err(OperationError::SelfFollow.into());
        }
        let _pair = self
            .pair_locks
            .acquire(ToggleKind::Follow, actor.as_uuid(), target.as_uuid())
            .await;

        // Existence check only; the written document is returned below.
        self.store
            .user_get(target)
            .await?
            .ok_or_else(ApiError::user_not_found)?;
        let actor_user = self
            .store
            .user_get(actor)
            .await?
            .ok_or_else(ApiError::user_not_found)?;

        let direction = ToggleDirection::from_present(actor_user.is_following(target));
        let (actor_mutation, target_mutation) = match direction {
            ToggleDirection::Added => (
                UserMutation::AddFollowing(target),
                UserMutation::AddFollower(actor),
            ),
            ToggleDirection::Removed => (
                UserMutation::RemoveFollowing(target),
                UserMutation::RemoveFollower(actor),
            ),
        };
        let actor_user = self.store.user_apply(actor, actor_mutation).await?;
        let target_user = match self.store.user_apply(target, target_mutation).await {
            Ok(user) => user,
            Err(err) => {
                tracing::error!(
                    error = %err,
                    actor = %actor,
                    target = %target,
                    "follow applied to actor only; counters need reconciliation"
                );
                self.cache.invalidate_profile(&actor_user.username).await;
                return Err(err.into());
            }
        };

        self.cache.invalidate_profile(&actor_user.username).await;
        self.cache.invalidate_profile(&target_user.username).await;
        self.record(ToggleKind::Follow, direction);

        if direction.is_added() {
            self.notifications
                .notify(NotificationRequest::new(
                    target,
                    actor,
                    ToggleKind::Follow.notification_type(),
                ))
                .await;
        }

        Ok(FollowOutcome {
            direction,
            actor: actor_user,
            target: target_user,
        })
    }

    /// Like `tweet_id` if `actor` has not liked it yet, else unlike.
    pub async fn toggle_like(&self, actor: UserId, tweet_id: TweetId) -> ApiResult<LikeOutcome> {
        let _pair = self
            .pair_locks
            .acquire(ToggleKind::Like, actor.as_uuid(), tweet_id.as_uuid())
            .await;

        let tweet = self
            .store
            .tweet_get(tweet_id)
            .await?
            .ok_or_else(ApiError::tweet_not_found)?;
        let direction = ToggleDirection::from_present(tweet.is_liked_by(actor));
        let mutation = match direction {
            ToggleDirection::Added => TweetMutation::AddLike(actor),
            ToggleDirection::Removed => TweetMutation::RemoveLike(actor),
        };
        let tweet = self.store.tweet_apply(tweet_id, mutation).await?;

        self.cache.invalidate_feed().await;
        self.record(ToggleKind::Like, direction);

        if direction.is_added() && tweet.author != actor {
            self.notifications
                .notify(
                    NotificationRequest::new(
                        tweet.author,
                        actor,
                        ToggleKind::Like.notification_type(),
                    )
                    .with_tweet(tweet_id),
                )
                .await;
        }

        Ok(LikeOutcome { direction, tweet })
    }

    /// Retweet `tweet_id` if `actor` has no live retweet of it, else delete
    /// that retweet.
    pub async fn toggle_retweet(
        &self,
        actor: UserId,
        tweet_id: TweetId,
    ) -> ApiResult<RetweetOutcome> {
        let _pair = self
            .pair_locks
            .acquire(ToggleKind::Retweet, actor.as_uuid(), tweet_id.as_uuid())
            .await;

        let original = self
            .store
            .tweet_get(tweet_id)
            .await?
            .ok_or_else(ApiError::tweet_not_found)?;
        let existing = self.store.tweet_find_retweet(actor, tweet_id).await?;

        let outcome = match existing {
            Some(retweet) => {
                let original = match self.store.tweet_delete(retweet.id).await? {
                    Some(_) => {
                        self.store
                            .tweet_apply(tweet_id, TweetMutation::DecrementRetweets)
                            .await?
                    }
                    // Already removed by someone else, who also decremented.
                    None => original,
                };
                RetweetOutcome {
                    direction: ToggleDirection::Removed,
                    original,
                    retweet: None,
                }
            }
            None => {
                let retweet = Tweet::retweet_of(actor, &original);
                self.store.tweet_insert(&retweet).await?;
                let original = self
                    .store
                    .tweet_apply(tweet_id, TweetMutation::IncrementRetweets)
                    .await?;
                RetweetOutcome {
                    direction: ToggleDirection::Added,
                    original,
                    retweet: Some(retweet),
                }
            }
        };

        self.cache.invalidate_feed().await;
        self.record(ToggleKind::Retweet, outcome.direction);

        if outcome.direction.is_added() && outcome.original.author != actor {
            self.notifications
                .notify(
                    NotificationRequest::new(
                        outcome.original.author,
                        actor,
                        ToggleKind::Retweet.notification_type(),
                    )
                    .with_tweet(tweet_id),
                )
                .await;
        }

        Ok(outcome)
    }

    // ========================================================================
    // RECONCILIATION
    // ========================================================================

    /// Reset a user's follow counters to their set sizes.
    pub async fn reconcile_user_counters(&self, user: UserId) -> ApiResult<User> {
        let before = self
            .store
            .user_get(user)
            .await?
            .ok_or_else(ApiError::user_not_found)?;
        let after = self
            .store
            .user_apply(user, UserMutation::ReconcileCounters)
            .await?;
        if before.follower_count != after.follower_count
            || before.following_count != after.following_count
        {
            tracing::warn!(
                user = %user,
                followers_before = before.follower_count,
                followers_after = after.follower_count,
                following_before = before.following_count,
                following_after = after.following_count,
                "repaired follow counters"
            );
            self.cache.invalidate_profile(&after.username).await;
        }
        Ok(after)
    }

    /// Reset a tweet's like counter to its set size and its retweet
    /// counter to the number of live retweets.
    pub async fn reconcile_tweet_counters(&self, tweet_id: TweetId) -> ApiResult<Tweet> {
        let before = self
            .store
            .tweet_get(tweet_id)
            .await?
            .ok_or_else(ApiError::tweet_not_found)?;
        let retweet_count = self.store.tweet_list_retweets_of(tweet_id).await?.len() as u64;
        let after = self
            .store
            .tweet_apply(tweet_id, TweetMutation::ReconcileCounters { retweet_count })
            .await?;
        if before.like_count != after.like_count || before.retweet_count != after.retweet_count {
            tracing::warn!(
                tweet = %tweet_id,
                likes_before = before.like_count,
                likes_after = after.like_count,
                retweets_before = before.retweet_count,
                retweets_after = after.retweet_count,
                "repaired tweet counters"
            );
            self.cache.invalidate_feed().await;
        }
        Ok(after)
    }

    fn record(&self, kind: ToggleKind, direction: ToggleDirection) {
        with_metrics(|m| m.record_toggle(kind, direction));
        tracing::debug!(kind = %kind, direction = %direction, "toggle applied");
    }
}

// =============================================================================
// TESTS
// =============================================================================
