//! Tweet-related API types.

use chirp_core::Tweet;
use serde::{Deserialize, Serialize};

use crate::services::{LikeOutcome, RetweetOutcome};

/// Body of `POST /tweets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTweetRequest {
    pub content: String,
    /// Media URLs attached to the tweet
    #[serde(default)]
    pub media: Vec<String>,
}

/// Body of `PUT /tweets/:id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTweetRequest {
    pub content: String,
}

/// Result of a like toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub liked: bool,
    pub like_count: u64,
}

impl From<LikeOutcome> for LikeResponse {
    fn from(outcome: LikeOutcome) -> Self {
        Self {
            liked: outcome.direction.is_added(),
            like_count: outcome.tweet.like_count,
        }
    }
}

/// Result of a retweet toggle. `retweet` is present only when one was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetweetResponse {
    pub retweeted: bool,
    pub retweet_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retweet: Option<Tweet>,
}

impl From<RetweetOutcome> for RetweetResponse {
    fn from(outcome: RetweetOutcome) -> Self {
        Self {
            retweeted: outcome.direction.is_added(),
            retweet_count: outcome.original.retweet_count,
            retweet: outcome.retweet,
        }
    }
}
