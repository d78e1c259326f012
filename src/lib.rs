//! Account-balance migration pipeline
//!
//! Background job pipeline for bulk re-seeding member accounts with new
//! opening balances. Producers enqueue [`model::MigrationRequest`]s on the
//! in-process [`queue::MigrationRequestQueue`]; a single
//! [`worker::MigrationWorker`] drains the queue, resolves product and
//! teller references, and hands each request to the
//! [`engine::BatchMigrationEngine`], which partitions the request into
//! bounded batches and replaces account/transaction rows one atomic
//! storage transaction per batch.
//!
//! All outcomes (including partial success) are observable only through
//! the [`audit::AuditSink`] trail; producers get no synchronous result.
//! The queue is not durable across restarts.

pub mod audit;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod model;
pub mod queue;
pub mod resolver;
pub mod store;
pub mod worker;

pub use audit::{AuditAction, AuditEvent, AuditLevel, AuditSink, TracingAuditSink};
pub use config::MigrationConfig;
pub use crypto::{BalanceEncryptor, EncryptionError};
pub use engine::BatchMigrationEngine;
pub use error::MigrationError;
pub use model::{
    Account, AccountSeed, AccountTransaction, MemberReference, MigrationRequest, MigrationResult,
    Product, Teller,
};
pub use queue::MigrationRequestQueue;
pub use resolver::ReferenceResolver;
pub use store::{LedgerStore, LedgerTx, StoreError};
pub use worker::{MigrationWorker, WorkerHandle};
