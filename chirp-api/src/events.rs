//! WebSocket Event Types
//!
//! Every frame on the socket is a JSON object `{"event": <name>, "data": <payload>}`.
//! `ClientEvent` is what clients may send; `ServerEvent` is what the hub
//! pushes to them.

use chirp_core::{Message, MessageId, Notification, UserId};
use serde::{Deserialize, Serialize};

/// Events a connected client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Send a direct message.
    #[serde(rename = "message:send", rename_all = "camelCase")]
    MessageSend { receiver_id: UserId, content: String },

    #[serde(rename = "typing:start", rename_all = "camelCase")]
    TypingStart { receiver_id: UserId },

    #[serde(rename = "typing:stop", rename_all = "camelCase")]
    TypingStop { receiver_id: UserId },

    /// Mark a received message read.
    #[serde(rename = "message:read", rename_all = "camelCase")]
    MessageRead { message_id: MessageId },
}

impl ClientEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::MessageSend { .. } => "message:send",
            ClientEvent::TypingStart { .. } => "typing:start",
            ClientEvent::TypingStop { .. } => "typing:stop",
            ClientEvent::MessageRead { .. } => "message:read",
        }
    }
}

/// Events the hub pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    // ========================================================================
    // PRESENCE
    // ========================================================================
    /// A user's first connection opened.
    #[serde(rename = "presence:online", rename_all = "camelCase")]
    PresenceOnline { user_id: UserId },

    /// A user's last connection closed.
    #[serde(rename = "presence:offline", rename_all = "camelCase")]
    PresenceOffline { user_id: UserId },

    // ========================================================================
    // MESSAGING
    // ========================================================================
    /// A message arrived for the receiving user.
    #[serde(rename = "message:receive")]
    MessageReceive(Message),

    /// Echo of a sent message to the originating connection.
    #[serde(rename = "message:sent")]
    MessageSent(Message),

    /// The receiver read a message; sent to the original sender.
    #[serde(rename = "message:read", rename_all = "camelCase")]
    MessageRead { message_id: MessageId, read_by: UserId },

    #[serde(rename = "message:error")]
    MessageError { message: String },

    // ========================================================================
    // TYPING
    // ========================================================================
    #[serde(rename = "typing:start", rename_all = "camelCase")]
    TypingStart { sender_id: UserId, username: String },

    #[serde(rename = "typing:stop", rename_all = "camelCase")]
    TypingStop { sender_id: UserId },

    // ========================================================================
    // NOTIFICATIONS
    // ========================================================================
    #[serde(rename = "notification:new")]
    NotificationNew { notification: Notification },

    /// Protocol-level failure (malformed frame, unknown event).
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerEvent {
    /// Wire name of the event, used for logging and metrics labels.
    pub fn event_type(&self) -> &'static str {
        match self {
            ServerEvent::PresenceOnline { .. } => "presence:online",
            ServerEvent::PresenceOffline { .. } => "presence:offline",
            ServerEvent::MessageReceive(_) => "message:receive",
            ServerEvent::MessageSent(_) => "message:sent",
            ServerEvent::MessageRead { .. } => "message:read",
            ServerEvent::MessageError { .. } => "message:error",
            ServerEvent::TypingStart { .. } => "typing:start",
            ServerEvent::TypingStop { .. } => "typing:stop",
            ServerEvent::NotificationNew { .. } => "notification:new",
            ServerEvent::Error { .. } => "error",
        }
    }

    pub fn is_presence(&self) -> bool {
        matches!(
            self,
            ServerEvent::PresenceOnline { .. } | ServerEvent::PresenceOffline { .. }
        )
    }
}
