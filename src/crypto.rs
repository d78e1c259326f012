//! Balance encryption seam
//!
//! The pipeline stores an encrypted representation of each balance next to
//! the plaintext value. The algorithm is an opaque collaborator owned
//! elsewhere in the platform; the engine only needs `encrypt`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct EncryptionError(pub String);

/// Opaque balance encryptor. Implementations must be cheap to call per
/// account row; the engine invokes it once per seed inside batch bodies.
pub trait BalanceEncryptor: Send + Sync {
    fn encrypt(&self, plaintext: &str, key: &str) -> Result<String, EncryptionError>;
}
