//! Core entity structures

use crate::{
    identity::EntityIdType,
    text::{
        extract_hashtags, extract_mentions, normalize_username, validate_optional_text,
        validate_text, MAX_BIO_CHARS, MAX_DISPLAY_NAME_CHARS, MAX_MESSAGE_CHARS, MAX_TWEET_CHARS,
    },
    CommentId, MessageId, NotificationId, NotificationType, Timestamp, TweetId, UserId,
    ValidationError,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// User account with its follow graph.
///
/// `followers`/`following` are the source of truth; the counters mirror
/// their cardinality after every completed mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub bio: String,
    pub profile_picture: String,
    pub cover_photo: String,
    pub is_verified: bool,
    pub followers: BTreeSet<UserId>,
    pub following: BTreeSet<UserId>,
    pub follower_count: u64,
    pub following_count: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// Create a user with a validated username and display name.
    pub fn new(
        username: &str,
        email: &str,
        display_name: &str,
    ) -> Result<Self, ValidationError> {
        let username = normalize_username(username)?;
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(ValidationError::InvalidValue {
                field: "email".to_string(),
                reason: "must be a valid email address".to_string(),
            });
        }
        let display_name = validate_text("displayName", display_name, MAX_DISPLAY_NAME_CHARS)?;
        let now = Utc::now();
        Ok(Self {
            id: UserId::now_v7(),
            username,
            email,
            display_name,
            bio: String::new(),
            profile_picture: String::new(),
            cover_photo: String::new(),
            is_verified: false,
            followers: BTreeSet::new(),
            following: BTreeSet::new(),
            follower_count: 0,
            following_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_following(&self, other: UserId) -> bool {
        self.following.contains(&other)
    }

    /// True when both counters equal their backing set sizes.
    pub fn counters_consistent(&self) -> bool {
        self.follower_count == self.followers.len() as u64
            && self.following_count == self.following.len() as u64
    }

    /// Lightweight view used when listing followers/following.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            profile_picture: self.profile_picture.clone(),
            bio: self.bio.clone(),
            is_verified: self.is_verified,
        }
    }
}

/// Public projection of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub profile_picture: String,
    pub bio: String,
    pub is_verified: bool,
}

/// Profile fields a user may edit. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
}

impl ProfileUpdate {
    /// Validate and normalize. An empty display name means "keep current".
    pub fn validated(self) -> Result<Self, ValidationError> {
        let display_name = match self.display_name {
            Some(name) if !name.trim().is_empty() => Some(validate_text(
                "displayName",
                &name,
                MAX_DISPLAY_NAME_CHARS,
            )?),
            _ => None,
        };
        let bio = match self.bio {
            Some(bio) => Some(validate_optional_text("bio", &bio, MAX_BIO_CHARS)?),
            None => None,
        };
        Ok(Self { display_name, bio })
    }

    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.bio.is_none()
    }
}

/// A tweet or a retweet.
///
/// A retweet is its own entity with `is_retweet = true` and
/// `original_tweet` pointing at the tweet it repeats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub id: TweetId,
    pub author: UserId,
    pub content: String,
    pub media: Vec<String>,
    pub likes: BTreeSet<UserId>,
    pub like_count: u64,
    pub comment_count: u64,
    pub retweet_count: u64,
    pub original_tweet: Option<TweetId>,
    pub is_retweet: bool,
    pub mentions: Vec<UserId>,
    pub hashtags: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Tweet {
    /// Create an original tweet. Content is trimmed and hashtags extracted.
    pub fn new(author: UserId, content: &str, media: Vec<String>) -> Result<Self, ValidationError> {
        let content = validate_text("content", content, MAX_TWEET_CHARS)?;
        let hashtags = extract_hashtags(&content);
        let now = Utc::now();
        Ok(Self {
            id: TweetId::now_v7(),
            author,
            content,
            media,
            likes: BTreeSet::new(),
            like_count: 0,
            comment_count: 0,
            retweet_count: 0,
            original_tweet: None,
            is_retweet: false,
            mentions: Vec::new(),
            hashtags,
            created_at: now,
            updated_at: now,
        })
    }

    /// Create the retweet entity `actor` publishes for `original`.
    pub fn retweet_of(actor: UserId, original: &Tweet) -> Self {
        let now = Utc::now();
        Self {
            id: TweetId::now_v7(),
            author: actor,
            content: original.content.clone(),
            media: original.media.clone(),
            likes: BTreeSet::new(),
            like_count: 0,
            comment_count: 0,
            retweet_count: 0,
            original_tweet: Some(original.id),
            is_retweet: true,
            mentions: Vec::new(),
            hashtags: original.hashtags.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// `@username` tokens in the content, for mention resolution.
    pub fn mentioned_usernames(&self) -> Vec<String> {
        extract_mentions(&self.content)
    }

    pub fn is_liked_by(&self, user: UserId) -> bool {
        self.likes.contains(&user)
    }

    /// True when `like_count` equals the like set size.
    pub fn counters_consistent(&self) -> bool {
        self.like_count == self.likes.len() as u64
    }
}

/// Direct message between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender: UserId,
    pub receiver: UserId,
    pub content: String,
    pub read: bool,
    pub created_at: Timestamp,
}

impl Message {
    pub fn new(sender: UserId, receiver: UserId, content: &str) -> Result<Self, ValidationError> {
        let content = validate_text("content", content, MAX_MESSAGE_CHARS)?;
        Ok(Self {
            id: MessageId::now_v7(),
            sender,
            receiver,
            content,
            read: false,
            created_at: Utc::now(),
        })
    }

    /// The other participant from `user`'s point of view.
    pub fn counterpart(&self, user: UserId) -> UserId {
        if self.sender == user {
            self.receiver
        } else {
            self.sender
        }
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.sender == user || self.receiver == user
    }
}

/// Notification created as a side effect of an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    pub sender: UserId,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweet: Option<TweetId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<CommentId>,
    pub read: bool,
    pub created_at: Timestamp,
}

/// Input to notification creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationRequest {
    pub recipient: UserId,
    pub sender: UserId,
    pub notification_type: NotificationType,
    pub tweet: Option<TweetId>,
    pub comment: Option<CommentId>,
}

impl NotificationRequest {
    pub fn new(recipient: UserId, sender: UserId, notification_type: NotificationType) -> Self {
        Self {
            recipient,
            sender,
            notification_type,
            tweet: None,
            comment: None,
        }
    }

    pub fn with_tweet(mut self, tweet: TweetId) -> Self {
        self.tweet = Some(tweet);
        self
    }

    pub fn with_comment(mut self, comment: CommentId) -> Self {
        self.comment = Some(comment);
        self
    }

    /// Materialize the request as an unread notification.
    pub fn into_notification(self) -> Notification {
        Notification {
            id: NotificationId::now_v7(),
            recipient: self.recipient,
            sender: self.sender,
            notification_type: self.notification_type,
            tweet: self.tweet,
            comment: self.comment,
            read: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_normalizes_and_starts_empty() -> Result<(), ValidationError> {
        let user = User::new("Alice", "Alice@Example.com", "Alice A")?;
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert!(user.followers.is_empty());
        assert!(user.counters_consistent());
        Ok(())
    }

    #[test]
    fn test_new_user_rejects_bad_email() {
        assert!(User::new("alice", "not-an-email", "Alice").is_err());
    }

    #[test]
    fn test_tweet_extracts_hashtags() -> Result<(), ValidationError> {
        let tweet = Tweet::new(UserId::now_v7(), "  Hello #World #rust  ", vec![])?;
        assert_eq!(tweet.content, "Hello #World #rust");
        assert_eq!(tweet.hashtags, vec!["world".to_string(), "rust".to_string()]);
        assert!(!tweet.is_retweet);
        Ok(())
    }

    #[test]
    fn test_tweet_rejects_overlong_content() {
        let content = "a".repeat(281);
        assert!(Tweet::new(UserId::now_v7(), &content, vec![]).is_err());
    }

    #[test]
    fn test_retweet_references_original() -> Result<(), ValidationError> {
        let original = Tweet::new(UserId::now_v7(), "original", vec![])?;
        let actor = UserId::now_v7();
        let retweet = Tweet::retweet_of(actor, &original);
        assert!(retweet.is_retweet);
        assert_eq!(retweet.original_tweet, Some(original.id));
        assert_eq!(retweet.author, actor);
        assert_eq!(retweet.content, original.content);
        assert_ne!(retweet.id, original.id);
        Ok(())
    }

    #[test]
    fn test_message_counterpart() -> Result<(), ValidationError> {
        let a = UserId::now_v7();
        let b = UserId::now_v7();
        let msg = Message::new(a, b, "hi")?;
        assert_eq!(msg.counterpart(a), b);
        assert_eq!(msg.counterpart(b), a);
        assert!(!msg.read);
        Ok(())
    }

    #[test]
    fn test_notification_serializes_type_field() -> Result<(), serde_json::Error> {
        let n = NotificationRequest::new(UserId::nil(), UserId::nil(), NotificationType::Like)
            .with_tweet(TweetId::nil())
            .into_notification();
        let json = serde_json::to_value(&n)?;
        assert_eq!(json["type"], "like");
        assert_eq!(json["read"], false);
        assert!(json.get("comment").is_none());
        Ok(())
    }

    #[test]
    fn test_profile_update_validation() -> Result<(), ValidationError> {
        let update = ProfileUpdate {
            display_name: Some("  ".to_string()),
            bio: Some(" hello ".to_string()),
        }
        .validated()?;
        assert_eq!(update.display_name, None);
        assert_eq!(update.bio, Some("hello".to_string()));

        let too_long = ProfileUpdate {
            display_name: None,
            bio: Some("b".repeat(161)),
        };
        assert!(too_long.validated().is_err());
        Ok(())
    }
}
