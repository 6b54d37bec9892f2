//! Presence Registry
//!
//! Maps each user to the set of their live connections. A user is online
//! while that set is non-empty. The online/offline broadcast is sent while
//! the user's entry is locked, so a connect racing a disconnect for the
//! same user can never publish the two transitions out of order.

use std::collections::HashMap;
use std::sync::Arc;

use chirp_core::{Notification, UserId};
use dashmap::{mapref::entry::Entry, DashMap};
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::events::ServerEvent;
use crate::services::NotificationSink;
use crate::telemetry::metrics::with_metrics;

/// Identifies one socket of one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outbound queue of one connection.
pub type ConnectionSender = mpsc::UnboundedSender<ServerEvent>;

/// Process-local registry of live connections.
#[derive(Clone)]
pub struct PresenceRegistry {
    connections: Arc<DashMap<UserId, HashMap<ConnectionId, ConnectionSender>>>,
    presence_tx: broadcast::Sender<ServerEvent>,
}

impl std::fmt::Debug for PresenceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceRegistry")
            .field("online_users", &self.online_user_count())
            .finish()
    }
}

impl PresenceRegistry {
    /// `capacity` bounds how many presence events a slow subscriber may
    /// fall behind before it starts missing them.
    pub fn new(capacity: usize) -> Self {
        let (presence_tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            connections: Arc::new(DashMap::new()),
            presence_tx,
        }
    }

    /// Receive every future presence transition.
    pub fn subscribe_presence(&self) -> broadcast::Receiver<ServerEvent> {
        self.presence_tx.subscribe()
    }

    /// Add a connection. Returns true when it is the user's first, in
    /// which case `presence:online` has been broadcast.
    pub fn register(
        &self,
        user: UserId,
        connection: ConnectionId,
        sender: ConnectionSender,
    ) -> bool {
        let first = match self.connections.entry(user) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().insert(connection, sender);
                false
            }
            Entry::Vacant(entry) => {
                let mut handles = HashMap::new();
                handles.insert(connection, sender);
                let _guard = entry.insert(handles);
                self.publish_presence(ServerEvent::PresenceOnline { user_id: user });
                true
            }
        };
        self.record_online();
        tracing::debug!(
            user_id = %user,
            connection = %connection,
            first,
            "connection registered"
        );
        first
    }

    /// Remove a connection. Returns true when it was the user's last, in
    /// which case `presence:offline` has been broadcast. Unknown handles
    /// are ignored.
    pub fn unregister(&self, user: UserId, connection: ConnectionId) -> bool {
        let last = match self.connections.entry(user) {
            Entry::Occupied(mut entry) => {
                if entry.get_mut().remove(&connection).is_none() {
                    false
                } else if entry.get().is_empty() {
                    self.publish_presence(ServerEvent::PresenceOffline { user_id: user });
                    entry.remove();
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(_) => false,
        };
        self.record_online();
        tracing::debug!(
            user_id = %user,
            connection = %connection,
            last,
            "connection unregistered"
        );
        last
    }

    /// Push `event` to every connection of `user`. Returns how many
    /// connections accepted it; zero means the user is offline and the
    /// event was dropped.
    pub fn send_to_user(&self, user: UserId, event: ServerEvent) -> usize {
        let event_type = event.event_type();
        let delivered = match self.connections.get(&user) {
            Some(handles) => handles
                .values()
                .filter(|sender| sender.send(event.clone()).is_ok())
                .count(),
            None => 0,
        };
        if delivered > 0 {
            with_metrics(|m| m.record_hub_event(event_type));
        } else {
            tracing::trace!(user_id = %user, event_type, "event dropped, user offline");
        }
        delivered
    }

    /// Push `event` to one specific connection.
    pub fn send_to_connection(
        &self,
        user: UserId,
        connection: ConnectionId,
        event: ServerEvent,
    ) -> bool {
        let event_type = event.event_type();
        let sent = self
            .connections
            .get(&user)
            .and_then(|handles| handles.get(&connection).map(|s| s.send(event).is_ok()))
            .unwrap_or(false);
        if sent {
            with_metrics(|m| m.record_hub_event(event_type));
        }
        sent
    }

    pub fn is_online(&self, user: UserId) -> bool {
        self.connections.contains_key(&user)
    }

    pub fn online_user_count(&self) -> usize {
        self.connections.len()
    }

    /// Live connections of one user.
    pub fn connection_count(&self, user: UserId) -> usize {
        self.connections.get(&user).map(|h| h.len()).unwrap_or(0)
    }

    fn publish_presence(&self, event: ServerEvent) {
        let event_type = event.event_type();
        // No subscribers simply means nobody is listening yet.
        let receivers = self.presence_tx.send(event).unwrap_or(0);
        with_metrics(|m| m.record_hub_event(event_type));
        tracing::debug!(event_type, receivers, "presence broadcast");
    }

    fn record_online(&self) {
        let online = self.connections.len();
        with_metrics(|m| m.set_online_users(online));
    }
}

impl NotificationSink for PresenceRegistry {
    fn deliver(&self, notification: &Notification) {
        self.send_to_user(
            notification.recipient,
            ServerEvent::NotificationNew {
                notification: notification.clone(),
            },
        );
    }
}
