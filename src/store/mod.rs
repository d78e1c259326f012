//! Storage seam for account and transaction rows
//!
//! The engine never talks to a database directly. Each batch asks the
//! [`LedgerStore`] for one transaction scope, issues its deletes before any
//! insert (stale and fresh rows share account numbers, so ordering matters),
//! then commits or rolls back the whole scope. Callers own the transaction
//! lifetime; nothing here retries.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Account, AccountTransaction, MemberReference};

#[cfg(feature = "database")]
pub mod postgres;

/// Storage backend failure. Carries the backend's own message; the pipeline
/// treats all variants as batch-level and non-retryable.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Backend(String),
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

/// Factory for per-batch transaction scopes.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError>;
}

/// One atomic storage transaction. All methods take effect inside the same
/// scope; nothing is visible to other batches until `commit`.
#[async_trait]
pub trait LedgerTx: Send {
    /// Delete existing transaction rows for the given product and member
    /// references. Returns the number of rows removed.
    async fn delete_transactions(
        &mut self,
        product_id: Uuid,
        members: &[MemberReference],
    ) -> Result<u64, StoreError>;

    /// Delete existing account rows for the given product and member
    /// references. Returns the number of rows removed.
    async fn delete_accounts(
        &mut self,
        product_id: Uuid,
        members: &[MemberReference],
    ) -> Result<u64, StoreError>;

    async fn insert_accounts(&mut self, accounts: &[Account]) -> Result<(), StoreError>;

    async fn insert_transactions(
        &mut self,
        transactions: &[AccountTransaction],
    ) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
