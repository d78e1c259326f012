//! Postgres ledger store
//!
//! sqlx-backed implementation of the storage seam. Each batch gets one
//! `Transaction<'static, Postgres>`; deletes and inserts execute eagerly so
//! the delete/insert ordering the engine relies on holds inside the scope.
//!
//! NOTE: All queries use runtime-checked sqlx::query() instead of
//! compile-time macros because the tables are created by migrations that
//! may not exist at compile time.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::model::{Account, AccountTransaction, MemberReference};

use super::{LedgerStore, LedgerTx, StoreError};

/// Ledger store over a shared Postgres pool.
#[derive(Clone, Debug)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTx { tx }))
    }
}

struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

fn member_keys(members: &[MemberReference]) -> Vec<String> {
    members.iter().map(|m| m.key()).collect()
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn delete_transactions(
        &mut self,
        product_id: Uuid,
        members: &[MemberReference],
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM corebank.account_transactions t
            USING corebank.accounts a
            WHERE t.account_id = a.account_id
              AND a.product_id = $1
              AND (a.branch_code || ':' || a.customer_id::text) = ANY($2)
            "#,
        )
        .bind(product_id)
        .bind(member_keys(members))
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_accounts(
        &mut self,
        product_id: Uuid,
        members: &[MemberReference],
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM corebank.accounts
            WHERE product_id = $1
              AND (branch_code || ':' || customer_id::text) = ANY($2)
            "#,
        )
        .bind(product_id)
        .bind(member_keys(members))
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_accounts(&mut self, accounts: &[Account]) -> Result<(), StoreError> {
        for account in accounts {
            sqlx::query(
                r#"
                INSERT INTO corebank.accounts
                    (account_id, account_number, product_id, branch_code,
                     customer_id, customer_name, balance, encrypted_balance,
                     status, created_by, created_at, modified_by, modified_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(account.account_id)
            .bind(&account.account_number)
            .bind(account.product_id)
            .bind(&account.branch_code)
            .bind(account.customer_id)
            .bind(&account.customer_name)
            .bind(account.balance)
            .bind(&account.encrypted_balance)
            .bind(account.status.as_str())
            .bind(&account.created_by)
            .bind(account.created_at)
            .bind(&account.modified_by)
            .bind(account.modified_at)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn insert_transactions(
        &mut self,
        transactions: &[AccountTransaction],
    ) -> Result<(), StoreError> {
        for txn in transactions {
            sqlx::query(
                r#"
                INSERT INTO corebank.account_transactions
                    (transaction_id, account_id, account_number, operation,
                     transaction_type, status, amount, branch_code, teller_id,
                     cash_drawer, narration, correlation_id, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(txn.transaction_id)
            .bind(txn.account_id)
            .bind(&txn.account_number)
            .bind(txn.operation.as_str())
            .bind(txn.transaction_type.as_str())
            .bind(txn.status.as_str())
            .bind(txn.amount)
            .bind(&txn.branch_code)
            .bind(txn.teller_id)
            .bind(&txn.cash_drawer)
            .bind(&txn.narration)
            .bind(txn.correlation_id)
            .bind(txn.created_at)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
