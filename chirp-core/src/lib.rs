//! Chirp Core - Entity Types
//!
//! Pure data structures shared by every other crate: users, tweets,
//! messages, notifications, their ids, pagination and the error taxonomy.
//! No I/O lives here.

pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;
pub mod pagination;
pub mod text;

pub use entities::*;
pub use enums::*;
pub use error::*;
pub use identity::*;
pub use pagination::*;
