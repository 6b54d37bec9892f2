//! Presence & Delivery Hub
//!
//! - `registry`: which users are online and through which connections
//! - `session`: per-connection lifecycle and client event dispatch
//!
//! The registry is process-local. Running several API instances needs a
//! shared registry (or a pub/sub fan-out) in front of it.

mod registry;
mod session;

pub use registry::{ConnectionId, ConnectionSender, PresenceRegistry};
pub use session::{ConnectionState, DeliveryHub, Session};
