//! Error types for Chirp operations

use crate::EntityType;
use thiserror::Error;
use uuid::Uuid;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type:?} with id {id}")]
    NotFound { entity_type: EntityType, id: Uuid },

    #[error("Entity not found: {entity_type:?} with key {key}")]
    NotFoundByKey { entity_type: EntityType, key: String },

    #[error("Insert failed for {entity_type:?}: {reason}")]
    InsertFailed { entity_type: EntityType, reason: String },

    #[error("Update failed for {entity_type:?} with id {id}: {reason}")]
    UpdateFailed {
        entity_type: EntityType,
        id: Uuid,
        reason: String,
    },

    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Cache layer errors. Callers degrade to the store on any of these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache serialization failed for key {key}: {reason}")]
    Serialization { key: String, reason: String },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Field {field} exceeds {max} characters")]
    TooLong { field: String, max: usize },
}

/// Operations that are well-formed but not allowed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OperationError {
    #[error("You cannot follow yourself")]
    SelfFollow,

    #[error("You cannot message yourself")]
    SelfMessage,

    #[error("Only the {role} may {action}")]
    NotPermitted { role: String, action: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Chirp errors.
#[derive(Debug, Clone, Error)]
pub enum ChirpError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid operation: {0}")]
    Operation(#[from] OperationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Chirp operations.
pub type ChirpResult<T> = Result<T, ChirpError>;

impl StorageError {
    /// True for failures that a retry could fix.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Unavailable { .. } | StorageError::LockPoisoned)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display_not_found() {
        let err = StorageError::NotFound {
            entity_type: EntityType::Tweet,
            id: Uuid::nil(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Entity not found"));
        assert!(msg.contains("Tweet"));
        assert!(msg.contains("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn test_storage_error_transience() {
        assert!(StorageError::Unavailable { reason: "down".into() }.is_transient());
        assert!(StorageError::LockPoisoned.is_transient());
        assert!(!StorageError::NotFound {
            entity_type: EntityType::User,
            id: Uuid::nil()
        }
        .is_transient());
    }

    #[test]
    fn test_operation_error_display() {
        assert_eq!(OperationError::SelfFollow.to_string(), "You cannot follow yourself");
        let err = OperationError::NotPermitted {
            role: "receiver".into(),
            action: "mark this message as read".into(),
        };
        assert_eq!(err.to_string(), "Only the receiver may mark this message as read");
    }

    #[test]
    fn test_master_error_from_conversions() {
        let err: ChirpError = ValidationError::TooLong {
            field: "content".into(),
            max: 280,
        }
        .into();
        assert!(matches!(err, ChirpError::Validation(_)));
        assert!(err.to_string().contains("280"));

        let err: ChirpError = OperationError::SelfMessage.into();
        assert!(matches!(err, ChirpError::Operation(_)));
    }
}
