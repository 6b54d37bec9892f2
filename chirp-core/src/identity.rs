//! Identity types for Chirp entities

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Common behaviour of the strongly typed entity identifiers.
///
/// Every id wraps a UUIDv7 so ids sort by creation time, which the
/// in-memory store relies on for "newest first" ordering ties.
pub trait EntityIdType: Copy + Eq + Ord + std::hash::Hash + std::fmt::Display {
    /// Wrap an existing UUID.
    fn new(uuid: Uuid) -> Self;

    /// Borrow the underlying UUID.
    fn as_uuid(&self) -> Uuid;

    /// Generate a fresh timestamp-sortable id.
    fn now_v7() -> Self {
        Self::new(Uuid::now_v7())
    }

    /// The nil id, used by tests and placeholders.
    fn nil() -> Self {
        Self::new(Uuid::nil())
    }
}

/// Defines a newtype id around `Uuid` with serde, display and parsing.
#[macro_export]
macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $crate::identity::EntityIdType for $name {
            fn new(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            fn as_uuid(&self) -> uuid::Uuid {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

define_entity_id!(
    /// Identifies a user account.
    UserId
);
define_entity_id!(
    /// Identifies a tweet, retweets included.
    TweetId
);
define_entity_id!(
    /// Identifies a direct message.
    MessageId
);
define_entity_id!(
    /// Identifies a notification.
    NotificationId
);
define_entity_id!(
    /// Identifies a comment on a tweet.
    CommentId
);
