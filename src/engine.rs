//! Batch Migration Engine
//!
//! Transactionally replaces all account/transaction state for the member
//! references named in one request. Seeds are partitioned into consecutive
//! batches, batches fan out on a bounded worker pool, and each batch runs
//! inside its own storage transaction: delete stale transaction rows, delete
//! stale account rows, then insert the freshly computed replacements. One
//! batch failing rolls back only itself; siblings commit and the aggregate
//! result reports the partial outcome.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::audit::{AuditAction, AuditEvent, AuditLevel, AuditSink};
use crate::config::MigrationConfig;
use crate::crypto::BalanceEncryptor;
use crate::error::MigrationError;
use crate::model::{
    compute_account_number, Account, AccountSeed, AccountStatus, AccountTransaction,
    MemberReference, MigrationRequest, MigrationResult, Product, Teller, TransactionOperation,
    TransactionStatus, TransactionType,
};
use crate::store::{LedgerStore, LedgerTx, StoreError};

/// Per-request context shared by all batch tasks: the collaborators plus
/// the resolved references that attribute generated rows.
struct BatchContext {
    store: Arc<dyn LedgerStore>,
    encryptor: Arc<dyn BalanceEncryptor>,
    audit: Arc<dyn AuditSink>,
    encryption_key: String,
    product_id: Uuid,
    product_code: String,
    teller: Teller,
    initiated_by: String,
    correlation_id: Uuid,
}

/// Outcome of one committed batch.
struct BatchStats {
    created: u64,
    deleted: u64,
}

#[derive(Default)]
struct Counters {
    new_accounts: AtomicU64,
    existing_accounts: AtomicU64,
    failed_batches: AtomicU32,
}

pub struct BatchMigrationEngine {
    store: Arc<dyn LedgerStore>,
    encryptor: Arc<dyn BalanceEncryptor>,
    audit: Arc<dyn AuditSink>,
    config: MigrationConfig,
}

impl BatchMigrationEngine {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        encryptor: Arc<dyn BalanceEncryptor>,
        audit: Arc<dyn AuditSink>,
        config: MigrationConfig,
    ) -> Self {
        Self {
            store,
            encryptor,
            audit,
            config,
        }
    }

    /// Run one migration request to completion and report the aggregate.
    ///
    /// Never returns an error: batch failures are contained, audited, and
    /// surfaced through `failed_batches` on the result.
    pub async fn run(
        &self,
        request: &MigrationRequest,
        product: &Product,
        teller: &Teller,
    ) -> MigrationResult {
        let started_at = Utc::now();

        // Zero batches, zero result, no storage access.
        if request.seeds.is_empty() {
            return MigrationResult {
                new_accounts: 0,
                existing_accounts: 0,
                failed_batches: 0,
                started_at,
                finished_at: Utc::now(),
            };
        }

        let batch_size = self.config.batch_size_for(request.seeds.len());
        let batches = partition(&request.seeds, batch_size);
        let batch_count = batches.len();

        self.audit
            .log(
                AuditEvent::new(
                    request.initiated_by.as_str(),
                    AuditAction::MigrationStarted,
                    format!(
                        "Migration started: {} seeds in {} batches",
                        request.seeds.len(),
                        batch_count
                    ),
                )
                .with_payload(serde_json::json!({
                    "seed_count": request.seeds.len(),
                    "batch_size": batch_size,
                    "batch_count": batch_count,
                    "product_code": product.product_code,
                }))
                .with_correlation(request.correlation_id),
            )
            .await;

        let ctx = Arc::new(BatchContext {
            store: Arc::clone(&self.store),
            encryptor: Arc::clone(&self.encryptor),
            audit: Arc::clone(&self.audit),
            encryption_key: self.config.encryption_key.clone(),
            product_id: request.product_id,
            product_code: product.product_code.clone(),
            teller: teller.clone(),
            initiated_by: request.initiated_by.clone(),
            correlation_id: request.correlation_id,
        });
        let counters = Arc::new(Counters::default());
        let limiter = Arc::new(Semaphore::new(self.config.max_concurrent_batches));

        let mut tasks: JoinSet<()> = JoinSet::new();
        for seeds in batches {
            let ctx = Arc::clone(&ctx);
            let counters = Arc::clone(&counters);
            let limiter = Arc::clone(&limiter);
            tasks.spawn(async move {
                let batch_size = seeds.len();
                // The limiter lives as long as this request and is never
                // closed; if acquisition still fails, the batch lands in the
                // same audited failure path as a storage error.
                let outcome = match limiter.acquire_owned().await {
                    Ok(_permit) => ctx.run_batch(seeds).await,
                    Err(_) => Err(MigrationError::Store(StoreError::Backend(
                        "batch worker pool closed".into(),
                    ))),
                };
                match outcome {
                    Ok(stats) => {
                        counters
                            .new_accounts
                            .fetch_add(stats.created, Ordering::Relaxed);
                        counters
                            .existing_accounts
                            .fetch_add(stats.deleted, Ordering::Relaxed);
                    }
                    Err(e) => {
                        counters.failed_batches.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            correlation_id = %ctx.correlation_id,
                            batch_size,
                            error = %e,
                            "Migration batch failed and was rolled back"
                        );
                        ctx.audit
                            .log(
                                AuditEvent::new(
                                    ctx.initiated_by.as_str(),
                                    AuditAction::BatchFailed,
                                    format!("Migration batch of {} failed: {}", batch_size, e),
                                )
                                .with_level(AuditLevel::Error)
                                .with_status(500)
                                .with_payload(serde_json::json!({
                                    "batch_size": batch_size,
                                    "error": e.to_string(),
                                }))
                                .with_correlation(ctx.correlation_id),
                            )
                            .await;
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                // A panicking batch still counts as failed; its transaction
                // was never committed.
                counters.failed_batches.fetch_add(1, Ordering::Relaxed);
                error!(
                    correlation_id = %request.correlation_id,
                    error = %e,
                    "Migration batch task aborted"
                );
            }
        }

        let finished_at = Utc::now();
        let result = MigrationResult {
            new_accounts: counters.new_accounts.load(Ordering::Relaxed),
            existing_accounts: counters.existing_accounts.load(Ordering::Relaxed),
            failed_batches: counters.failed_batches.load(Ordering::Relaxed),
            started_at,
            finished_at,
        };

        let level = if result.is_partial() {
            AuditLevel::Warning
        } else {
            AuditLevel::Info
        };
        self.audit
            .log(
                AuditEvent::new(
                    request.initiated_by.as_str(),
                    AuditAction::MigrationCompleted,
                    format!(
                        "Migration finished: {} created, {} replaced, {} of {} batches failed",
                        result.new_accounts, result.existing_accounts, result.failed_batches,
                        batch_count
                    ),
                )
                .with_level(level)
                .with_payload(serde_json::json!({
                    "new_accounts": result.new_accounts,
                    "existing_accounts": result.existing_accounts,
                    "failed_batches": result.failed_batches,
                    "batch_count": batch_count,
                    "duration_ms": result.duration().num_milliseconds(),
                }))
                .with_correlation(request.correlation_id),
            )
            .await;

        result
    }
}

impl BatchContext {
    /// One batch, one storage transaction. Commits on success, rolls back
    /// on any error along the way.
    async fn run_batch(&self, seeds: Vec<AccountSeed>) -> Result<BatchStats, MigrationError> {
        let members: Vec<MemberReference> =
            seeds.iter().map(AccountSeed::member_reference).collect();

        let mut tx = self.store.begin().await?;
        match self.apply_batch(&mut *tx, &seeds, &members).await {
            Ok(stats) => {
                tx.commit().await?;
                debug!(
                    correlation_id = %self.correlation_id,
                    created = stats.created,
                    replaced = stats.deleted,
                    "Migration batch committed"
                );
                Ok(stats)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(
                        correlation_id = %self.correlation_id,
                        error = %rollback_err,
                        "Rollback failed after batch error"
                    );
                }
                Err(e)
            }
        }
    }

    /// Batch body: deletes first (stale and fresh rows share account
    /// numbers), then the bulk inserts, all inside the caller's transaction.
    async fn apply_batch(
        &self,
        tx: &mut dyn LedgerTx,
        seeds: &[AccountSeed],
        members: &[MemberReference],
    ) -> Result<BatchStats, MigrationError> {
        let deleted_transactions = tx.delete_transactions(self.product_id, members).await?;
        let deleted_accounts = tx.delete_accounts(self.product_id, members).await?;

        let mut accounts = Vec::with_capacity(seeds.len());
        let mut transactions = Vec::with_capacity(seeds.len());
        for seed in seeds {
            let account = self.build_account(seed)?;
            let transaction = self.build_opening_transaction(&account);
            accounts.push(account);
            transactions.push(transaction);
        }

        tx.insert_accounts(&accounts).await?;
        tx.insert_transactions(&transactions).await?;

        debug!(
            correlation_id = %self.correlation_id,
            deleted_transactions,
            deleted_accounts,
            inserted = accounts.len(),
            "Migration batch applied"
        );

        Ok(BatchStats {
            created: accounts.len() as u64,
            deleted: deleted_accounts,
        })
    }

    fn build_account(&self, seed: &AccountSeed) -> Result<Account, MigrationError> {
        let member = seed.member_reference();
        let encrypted_balance = self
            .encryptor
            .encrypt(&seed.opening_balance.to_string(), &self.encryption_key)?;
        let now = Utc::now();
        Ok(Account {
            account_id: Uuid::new_v4(),
            account_number: compute_account_number(&self.product_code, &member),
            product_id: self.product_id,
            branch_code: seed.branch_code.clone(),
            customer_id: seed.customer_id,
            customer_name: seed.customer_name.clone(),
            balance: seed.opening_balance,
            encrypted_balance,
            status: AccountStatus::Active,
            created_by: self.initiated_by.clone(),
            created_at: now,
            modified_by: self.initiated_by.clone(),
            modified_at: now,
        })
    }

    /// Opening-balance transaction paired with a freshly built account,
    /// attributed to the branch's resolved teller context.
    fn build_opening_transaction(&self, account: &Account) -> AccountTransaction {
        AccountTransaction {
            transaction_id: Uuid::new_v4(),
            account_id: account.account_id,
            account_number: account.account_number.clone(),
            operation: TransactionOperation::Deposit,
            transaction_type: TransactionType::Migration,
            status: TransactionStatus::Completed,
            amount: account.balance,
            branch_code: account.branch_code.clone(),
            teller_id: self.teller.teller_id,
            cash_drawer: self.teller.cash_drawer.clone(),
            narration: format!("Opening balance migration for {}", account.account_number),
            correlation_id: self.correlation_id,
            created_at: account.created_at,
        }
    }
}

/// Consecutive, non-overlapping partitions of the seed list. Each seed
/// appears in exactly one batch, so batches operate on disjoint member
/// reference sets (assuming no duplicate seeds within a request; duplicates
/// are not deduplicated here).
fn partition(seeds: &[AccountSeed], batch_size: usize) -> Vec<Vec<AccountSeed>> {
    seeds.chunks(batch_size).map(|c| c.to_vec()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn seeds(n: usize) -> Vec<AccountSeed> {
        (0..n)
            .map(|i| AccountSeed {
                customer_id: Uuid::new_v4(),
                customer_name: format!("member-{}", i),
                branch_code: "BR001".to_string(),
                opening_balance: dec!(10),
            })
            .collect()
    }

    #[test]
    fn test_partition_counts() {
        assert_eq!(partition(&seeds(25), 10).len(), 3);
        assert_eq!(partition(&seeds(30), 10).len(), 3);
        assert_eq!(partition(&seeds(1), 10).len(), 1);
        assert!(partition(&seeds(0), 10).is_empty());
    }

    #[test]
    fn test_partition_is_consecutive_and_complete() {
        let all = seeds(25);
        let batches = partition(&all, 10);
        assert_eq!(batches[0].len(), 10);
        assert_eq!(batches[1].len(), 10);
        assert_eq!(batches[2].len(), 5);
        let flattened: Vec<Uuid> = batches.iter().flatten().map(|s| s.customer_id).collect();
        let original: Vec<Uuid> = all.iter().map(|s| s.customer_id).collect();
        assert_eq!(flattened, original);
    }

    #[test]
    fn test_partition_ceil_property() {
        for (count, size) in [(25usize, 10usize), (1000, 10), (1001, 20), (7, 3)] {
            let expected = count.div_ceil(size);
            assert_eq!(partition(&seeds(count), size).len(), expected);
        }
    }
}
