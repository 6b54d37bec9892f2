//! Enum types for Chirp entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity type discriminator, used by errors and cache metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    User,
    Tweet,
    Message,
    Notification,
    Comment,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            EntityType::User => "User",
            EntityType::Tweet => "Tweet",
            EntityType::Message => "Message",
            EntityType::Notification => "Notification",
            EntityType::Comment => "Comment",
        };
        write!(f, "{}", value)
    }
}

/// Kind of notification delivered to a recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Like,
    Comment,
    Follow,
    Retweet,
    Mention,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Like => "like",
            NotificationType::Comment => "comment",
            NotificationType::Follow => "follow",
            NotificationType::Retweet => "retweet",
            NotificationType::Mention => "mention",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid notification type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTypeParseError(pub String);

impl fmt::Display for NotificationTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid notification type: {}", self.0)
    }
}

impl std::error::Error for NotificationTypeParseError {}

impl FromStr for NotificationType {
    type Err = NotificationTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "like" => Ok(NotificationType::Like),
            "comment" => Ok(NotificationType::Comment),
            "follow" => Ok(NotificationType::Follow),
            "retweet" => Ok(NotificationType::Retweet),
            "mention" => Ok(NotificationType::Mention),
            _ => Err(NotificationTypeParseError(s.to_string())),
        }
    }
}

/// Which relation a toggle operation flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleKind {
    Follow,
    Like,
    Retweet,
}

impl ToggleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToggleKind::Follow => "follow",
            ToggleKind::Like => "like",
            ToggleKind::Retweet => "retweet",
        }
    }

    /// Notification emitted when this toggle lands on `Added`.
    pub fn notification_type(&self) -> NotificationType {
        match self {
            ToggleKind::Follow => NotificationType::Follow,
            ToggleKind::Like => NotificationType::Like,
            ToggleKind::Retweet => NotificationType::Retweet,
        }
    }
}

impl fmt::Display for ToggleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction a toggle was applied in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleDirection {
    Added,
    Removed,
}

impl ToggleDirection {
    /// Direction that a toggle takes given whether the relation currently holds.
    pub fn from_present(present: bool) -> Self {
        if present {
            ToggleDirection::Removed
        } else {
            ToggleDirection::Added
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, ToggleDirection::Added)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToggleDirection::Added => "added",
            ToggleDirection::Removed => "removed",
        }
    }
}

impl fmt::Display for ToggleDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_type_wire_format() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&NotificationType::Retweet)?, "\"retweet\"");
        let parsed: NotificationType = serde_json::from_str("\"mention\"")?;
        assert_eq!(parsed, NotificationType::Mention);
        Ok(())
    }

    #[test]
    fn test_notification_type_from_str_is_case_insensitive() {
        assert_eq!("LIKE".parse::<NotificationType>(), Ok(NotificationType::Like));
        assert!("poke".parse::<NotificationType>().is_err());
    }

    #[test]
    fn test_toggle_direction_from_present() {
        assert_eq!(ToggleDirection::from_present(true), ToggleDirection::Removed);
        assert_eq!(ToggleDirection::from_present(false), ToggleDirection::Added);
        assert!(ToggleDirection::Added.is_added());
    }

    #[test]
    fn test_toggle_kind_maps_to_notification() {
        assert_eq!(ToggleKind::Follow.notification_type(), NotificationType::Follow);
        assert_eq!(ToggleKind::Like.notification_type(), NotificationType::Like);
        assert_eq!(ToggleKind::Retweet.notification_type(), NotificationType::Retweet);
    }
}
