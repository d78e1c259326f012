//! Error types for the migration pipeline
//!
//! Three failure levels, matching how failures are contained:
//! request-level (missing references — the request is dropped), batch-level
//! (storage errors — one batch rolls back, siblings proceed), and anything
//! else surfacing to the worker loop (caught and audited, loop continues).
//! No error crosses the queue boundary back to a producer; outcomes are
//! observable only through the audit trail.

use thiserror::Error;
use uuid::Uuid;

use crate::crypto::EncryptionError;
use crate::store::StoreError;

/// Main error type for the migration pipeline.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Request-level, non-retryable: the request is dropped.
    #[error("product {0} not found")]
    ProductNotFound(Uuid),

    /// Request-level, non-retryable: the request is dropped.
    #[error("no teller configured for branch {0}")]
    TellerNotFound(Uuid),

    /// Batch-level: the affected batch rolls back, siblings are unaffected.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("balance encryption failed: {0}")]
    Encryption(#[from] EncryptionError),

    #[error("migration request has no account seeds")]
    EmptySeedList,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_converts() {
        let err: MigrationError = StoreError::Backend("connection reset".into()).into();
        assert!(matches!(err, MigrationError::Store(_)));
        assert_eq!(err.to_string(), "storage error: connection reset");
    }

    #[test]
    fn test_not_found_messages_name_the_id() {
        let id = Uuid::new_v4();
        assert!(MigrationError::ProductNotFound(id)
            .to_string()
            .contains(&id.to_string()));
    }
}
