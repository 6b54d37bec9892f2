//! Service Layer
//!
//! Business logic behind the REST routes and the WebSocket hub. Services
//! own validation, ownership checks and side effects (cache invalidation,
//! notifications, live delivery); handlers only translate HTTP.

mod feed_service;
mod message_service;
mod notification_service;
mod profile_service;
mod toggle_service;

pub use feed_service::*;
pub use message_service::*;
pub use notification_service::*;
pub use profile_service::*;
pub use toggle_service::*;
