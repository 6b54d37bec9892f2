//! Chirp API - Social Backend Core
//!
//! REST endpoints (Axum) and a WebSocket delivery hub on top of the
//! graph store and cache in `chirp-storage`.
//!
//! - `services`: toggle and counter engine, feed, profiles, messages and
//!   the notification dispatcher
//! - `hub`: presence registry and per-connection sessions
//! - `routes`: the HTTP surface and its security stack

#[macro_use]
mod macros;

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod extractors;
pub mod hub;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod ws;

// Re-export commonly used types
pub use auth::{
    authenticate, authenticate_token, generate_jwt_token, validate_jwt_token, AuthConfig,
    AuthContext, Claims,
};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use events::{ClientEvent, ServerEvent};
pub use hub::{DeliveryHub, PresenceRegistry, Session};
pub use middleware::{auth_middleware, AuthExtractor, AuthMiddlewareState};
pub use routes::create_api_router;
pub use services::{
    FeedService, MessageService, NotificationDispatcher, ProfileService, ToggleEngine,
};
pub use state::AppState;
pub use types::*;
pub use ws::WsState;
