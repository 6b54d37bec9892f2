//! Delivery Hub
//!
//! Owns the lifecycle of one WebSocket connection and dispatches the
//! events it sends. Frames from one connection are handled one at a time,
//! so whatever they trigger reaches its targets in the order sent.

use chirp_core::UserId;
use tokio::sync::{broadcast, mpsc};

use crate::auth::{authenticate_token, AuthConfig, AuthContext};
use crate::error::{ApiError, ApiResult};
use crate::events::{ClientEvent, ServerEvent};
use crate::hub::{ConnectionId, PresenceRegistry};
use crate::services::MessageService;

// ============================================================================
// CONNECTION STATE
// ============================================================================

/// Connection lifecycle: `Connecting -> Authenticated -> Active -> Disconnected`.
///
/// A connection that fails authentication goes straight to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Authenticated,
    Active,
    Disconnected,
}

impl ConnectionState {
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Authenticated)
                | (Connecting, Disconnected)
                | (Authenticated, Active)
                | (Authenticated, Disconnected)
                | (Active, Disconnected)
        )
    }
}

/// One WebSocket connection of an authenticated user.
#[derive(Debug, Clone)]
pub struct Session {
    id: ConnectionId,
    principal: AuthContext,
    state: ConnectionState,
}

impl Session {
    /// Verify the handshake token and open a session for its principal.
    ///
    /// Every failure is reported as the same `Authentication error`.
    pub fn authenticate(config: &AuthConfig, token: Option<&str>) -> ApiResult<Self> {
        let rejected = || ApiError::unauthorized("Authentication error");
        let token = token.filter(|t| !t.is_empty()).ok_or_else(rejected)?;
        let principal = authenticate_token(config, token).map_err(|err| {
            tracing::debug!(error = %err, "websocket authentication failed");
            rejected()
        })?;
        let mut session = Self {
            id: ConnectionId::new(),
            principal,
            state: ConnectionState::Connecting,
        };
        session.transition(ConnectionState::Authenticated)?;
        Ok(session)
    }

    /// A session for a principal verified elsewhere.
    pub fn authenticated(principal: AuthContext) -> Self {
        Self {
            id: ConnectionId::new(),
            principal,
            state: ConnectionState::Authenticated,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn username(&self) -> &str {
        &self.principal.username
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    fn transition(&mut self, next: ConnectionState) -> ApiResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(ApiError::invalid_operation(format!(
                "Illegal connection transition {:?} -> {:?}",
                self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }
}

// ============================================================================
// HUB
// ============================================================================

#[derive(Clone)]
pub struct DeliveryHub {
    registry: PresenceRegistry,
    messages: MessageService,
}

impl DeliveryHub {
    pub fn new(registry: PresenceRegistry, messages: MessageService) -> Self {
        Self { registry, messages }
    }

    pub fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }

    pub fn subscribe_presence(&self) -> broadcast::Receiver<ServerEvent> {
        self.registry.subscribe_presence()
    }

    /// Register the session and return its outbound queue.
    pub fn activate(
        &self,
        session: &mut Session,
    ) -> ApiResult<mpsc::UnboundedReceiver<ServerEvent>> {
        session.transition(ConnectionState::Active)?;
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry.register(session.user_id(), session.id(), tx);
        tracing::info!(
            user_id = %session.user_id(),
            connection = %session.id(),
            "websocket session active"
        );
        Ok(rx)
    }

    /// Unregister the session. Safe to call more than once.
    pub fn disconnect(&self, session: &mut Session) {
        if session.state == ConnectionState::Disconnected {
            return;
        }
        let was_active = session.state == ConnectionState::Active;
        session.state = ConnectionState::Disconnected;
        if was_active {
            self.registry.unregister(session.user_id(), session.id());
        }
        tracing::info!(
            user_id = %session.user_id(),
            connection = %session.id(),
            "websocket session closed"
        );
    }

    /// Parse and handle one text frame. Malformed frames are answered
    /// with an `error` event on the same connection.
    pub async fn handle_frame(&self, session: &Session, frame: &str) {
        match serde_json::from_str::<ClientEvent>(frame) {
            Ok(event) => self.handle_client_event(session, event).await,
            Err(err) => {
                tracing::debug!(connection = %session.id(), error = %err, "malformed frame");
                self.reply(
                    session,
                    ServerEvent::Error {
                        message: format!("Invalid event: {}", err),
                    },
                );
            }
        }
    }

    pub async fn handle_client_event(&self, session: &Session, event: ClientEvent) {
        if session.state != ConnectionState::Active {
            tracing::warn!(
                connection = %session.id(),
                state = ?session.state,
                event_type = event.event_type(),
                "event on inactive session ignored"
            );
            return;
        }

        match event {
            ClientEvent::MessageSend {
                receiver_id,
                content,
            } => match self.messages.send(session.user_id(), receiver_id, &content).await {
                Ok(message) => {
                    self.messages.deliver(&message);
                    self.reply(session, ServerEvent::MessageSent(message));
                }
                Err(err) => {
                    self.reply(session, ServerEvent::MessageError { message: err.message })
                }
            },
            ClientEvent::TypingStart { receiver_id } => {
                self.registry.send_to_user(
                    receiver_id,
                    ServerEvent::TypingStart {
                        sender_id: session.user_id(),
                        username: session.username().to_string(),
                    },
                );
            }
            ClientEvent::TypingStop { receiver_id } => {
                self.registry.send_to_user(
                    receiver_id,
                    ServerEvent::TypingStop {
                        sender_id: session.user_id(),
                    },
                );
            }
            ClientEvent::MessageRead { message_id } => {
                if let Err(err) = self.messages.mark_read(session.user_id(), message_id).await {
                    self.reply(session, ServerEvent::MessageError { message: err.message });
                }
            }
        }
    }

    fn reply(&self, session: &Session, event: ServerEvent) {
        self.registry
            .send_to_connection(session.user_id(), session.id(), event);
    }
}
