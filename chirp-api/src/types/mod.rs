//! API Request and Response Types
//!
//! Request bodies, query strings and response payloads for the REST
//! endpoints. Every response goes out wrapped in [`ApiResponse`].

// Response envelope and paging
mod envelope;
pub use envelope::*;

// Tweet types
mod tweet;
pub use tweet::*;

// User types
mod user;
pub use user::*;

// Message types
mod message;
pub use message::*;

// Notification types
mod notification;
pub use notification::*;
