//! Direct message API types.

use serde::{Deserialize, Serialize};

/// Body of `POST /messages/:userId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}
