//! User-related API types.

use chirp_core::{Timestamp, User, UserId};
use serde::{Deserialize, Serialize};

use crate::services::FollowOutcome;

/// Public profile as returned by `GET /users/:username`.
///
/// The follower sets stay server-side; clients get the counters and
/// whether the viewer follows this user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub profile_picture: String,
    pub cover_photo: String,
    pub is_verified: bool,
    pub follower_count: u64,
    pub following_count: u64,
    pub is_following: bool,
    pub created_at: Timestamp,
}

impl ProfileResponse {
    pub fn for_viewer(user: &User, viewer: UserId) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            bio: user.bio.clone(),
            profile_picture: user.profile_picture.clone(),
            cover_photo: user.cover_photo.clone(),
            is_verified: user.is_verified,
            follower_count: user.follower_count,
            following_count: user.following_count,
            is_following: user.followers.contains(&viewer),
            created_at: user.created_at,
        }
    }
}

/// Result of a follow toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub following: bool,
    /// Followers of the target after the toggle
    pub follower_count: u64,
}

impl From<FollowOutcome> for FollowResponse {
    fn from(outcome: FollowOutcome) -> Self {
        Self {
            following: outcome.is_following(),
            follower_count: outcome.target.follower_count,
        }
    }
}
