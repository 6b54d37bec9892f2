//! Message Service
//!
//! Direct messages between two users. Persistence happens here; live
//! delivery goes through the presence registry so REST and WebSocket
//! senders share one path.

use std::collections::HashMap;
use std::sync::Arc;

use chirp_core::{Message, MessageId, OperationError, PageRequest, Pagination, UserId, UserSummary};
use chirp_storage::GraphStore;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::events::ServerEvent;
use crate::hub::PresenceRegistry;

/// Result of a read receipt. `transitioned` is true only for the call
/// that actually flipped the message from unread to read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub message: Message,
    pub transitioned: bool,
}

/// Latest message exchanged with one counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub with: UserSummary,
    pub last_message: Message,
}

#[derive(Clone)]
pub struct MessageService {
    store: Arc<dyn GraphStore>,
    registry: PresenceRegistry,
}

impl MessageService {
    pub fn new(store: Arc<dyn GraphStore>, registry: PresenceRegistry) -> Self {
        Self { store, registry }
    }

    /// Validate and persist a message from `sender` to `receiver`.
    pub async fn send(
        &self,
        sender: UserId,
        receiver: UserId,
        content: &str,
    ) -> ApiResult<Message> {
        if sender == receiver {
            return Err(OperationError::SelfMessage.into());
        }
        self.store
            .user_get(receiver)
            .await?
            .ok_or_else(ApiError::user_not_found)?;

        let message = Message::new(sender, receiver, content)?;
        self.store.message_insert(&message).await?;
        tracing::debug!(
            message_id = %message.id,
            sender = %sender,
            receiver = %receiver,
            "message stored"
        );
        Ok(message)
    }

    /// Push `message:receive` to every live connection of the receiver.
    /// Returns how many connections got it.
    pub fn deliver(&self, message: &Message) -> usize {
        self.registry
            .send_to_user(message.receiver, ServerEvent::MessageReceive(message.clone()))
    }

    /// Persist and deliver in one step.
    pub async fn send_and_deliver(
        &self,
        sender: UserId,
        receiver: UserId,
        content: &str,
    ) -> ApiResult<Message> {
        let message = self.send(sender, receiver, content).await?;
        self.deliver(&message);
        Ok(message)
    }

    /// Mark a message read on behalf of `reader`, who must be its receiver.
    ///
    /// The sender is told via `message:read` only by the call that made
    /// the transition, so repeated receipts notify once.
    pub async fn mark_read(&self, reader: UserId, id: MessageId) -> ApiResult<ReadReceipt> {
        let message = self
            .store
            .message_get(id)
            .await?
            .filter(|m| m.receiver == reader)
            .ok_or_else(ApiError::message_not_found)?;

        let transitioned = self.store.message_mark_read(id).await?;
        if transitioned {
            self.registry.send_to_user(
                message.sender,
                ServerEvent::MessageRead {
                    message_id: id,
                    read_by: reader,
                },
            );
        }
        Ok(ReadReceipt {
            message: Message {
                read: true,
                ..message
            },
            transitioned,
        })
    }

    /// Page of the conversation between `user` and `other`, oldest first
    /// within the page. Page 1 holds the most recent messages.
    pub async fn conversation(
        &self,
        user: UserId,
        other: UserId,
        page: PageRequest,
    ) -> ApiResult<(Vec<Message>, Pagination)> {
        let mut messages = self.store.message_list_conversation(user, other, page).await?;
        messages.reverse();
        let total = self.store.message_count_conversation(user, other).await?;
        Ok((messages, Pagination::new(page, total)))
    }

    /// One entry per counterpart, most recent conversation first.
    pub async fn conversations(&self, user: UserId) -> ApiResult<Vec<ConversationSummary>> {
        let latest = self.store.message_latest_per_counterpart(user).await?;
        let ids: Vec<UserId> = latest.iter().map(|m| m.counterpart(user)).collect();
        let people: HashMap<UserId, UserSummary> = self
            .store
            .users_get_many(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.summary()))
            .collect();

        Ok(latest
            .into_iter()
            .filter_map(|message| {
                let with = people.get(&message.counterpart(user))?.clone();
                Some(ConversationSummary {
                    with,
                    last_message: message,
                })
            })
            .collect())
    }
}
