//! Migration Pipeline Types
//!
//! Domain types for the account-balance migration pipeline. A producer
//! builds a [`MigrationRequest`] from externally supplied opening balances,
//! the worker drains it from the queue, and the batch engine turns each
//! seed into one [`Account`] plus one paired opening-balance
//! [`AccountTransaction`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MigrationError;

/// One member account to (re)seed with a new opening balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSeed {
    pub customer_id: Uuid,
    pub customer_name: String,
    pub branch_code: String,
    pub opening_balance: Decimal,
}

impl AccountSeed {
    /// Composite key locating any pre-existing rows for this member.
    pub fn member_reference(&self) -> MemberReference {
        MemberReference {
            branch_code: self.branch_code.clone(),
            customer_id: self.customer_id,
        }
    }
}

/// Composite key (branch code + customer id) identifying an account owner
/// across account and transaction records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberReference {
    pub branch_code: String,
    pub customer_id: Uuid,
}

impl MemberReference {
    /// Canonical text form, used as the storage-side delete key.
    pub fn key(&self) -> String {
        format!("{}:{}", self.branch_code, self.customer_id)
    }
}

impl std::fmt::Display for MemberReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.branch_code, self.customer_id)
    }
}

/// Bulk re-seed request. Immutable after construction; enqueued once and
/// dequeued at most once by the single worker.
///
/// The non-empty `seeds` invariant is enforced by [`MigrationRequest::new`]
/// only. Values built by struct literal or deserialization bypass it; the
/// batch engine independently short-circuits an empty seed list to a
/// zero-valued result with no storage access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRequest {
    pub product_id: Uuid,
    pub branch_id: Uuid,
    pub branch_code: String,
    pub bank_id: Uuid,
    pub seeds: Vec<AccountSeed>,
    /// Identity (name or token) of whoever triggered the migration.
    pub initiated_by: String,
    pub correlation_id: Uuid,
    pub enqueued_at: DateTime<Utc>,
}

impl MigrationRequest {
    /// Build a request, stamping correlation id and enqueue time.
    ///
    /// Rejects an empty seed list: a request with nothing to migrate is a
    /// producer bug, not a valid no-op.
    pub fn new(
        product_id: Uuid,
        branch_id: Uuid,
        branch_code: impl Into<String>,
        bank_id: Uuid,
        seeds: Vec<AccountSeed>,
        initiated_by: impl Into<String>,
    ) -> Result<Self, MigrationError> {
        if seeds.is_empty() {
            return Err(MigrationError::EmptySeedList);
        }
        Ok(Self {
            product_id,
            branch_id,
            branch_code: branch_code.into(),
            bank_id,
            seeds,
            initiated_by: initiated_by.into(),
            correlation_id: Uuid::new_v4(),
            enqueued_at: Utc::now(),
        })
    }
}

/// Status of a produced account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Dormant,
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Dormant => "dormant",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ledger operation of a transaction row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionOperation {
    Deposit,
    Withdrawal,
}

impl TransactionOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdrawal => "WITHDRAWAL",
        }
    }
}

impl std::fmt::Display for TransactionOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Origin of a transaction row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Standard,
    Migration,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Migration => "migration",
        }
    }
}

/// Settlement status of a transaction row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Unknown transaction status: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account row produced by the migration engine.
///
/// Rows are transient on the Rust side: built, flushed and released within
/// one storage transaction per batch. Only the stored effect persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_id: Uuid,
    pub account_number: String,
    pub product_id: Uuid,
    pub branch_code: String,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub balance: Decimal,
    pub encrypted_balance: String,
    pub status: AccountStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub modified_by: String,
    pub modified_at: DateTime<Utc>,
}

impl Account {
    pub fn member_reference(&self) -> MemberReference {
        MemberReference {
            branch_code: self.branch_code.clone(),
            customer_id: self.customer_id,
        }
    }
}

/// Opening-balance transaction paired 1:1 with a produced [`Account`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountTransaction {
    pub transaction_id: Uuid,
    pub account_id: Uuid,
    pub account_number: String,
    pub operation: TransactionOperation,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub amount: Decimal,
    pub branch_code: String,
    pub teller_id: Uuid,
    pub cash_drawer: String,
    pub narration: String,
    pub correlation_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Resolved product definition (external reference data).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub product_id: Uuid,
    pub product_code: String,
    pub name: String,
    pub is_active: bool,
}

/// Branch-scoped teller / cash-drawer context used to attribute generated
/// transactions to a financial origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teller {
    pub teller_id: Uuid,
    pub branch_id: Uuid,
    pub name: String,
    pub cash_drawer: String,
}

/// Aggregate outcome of one migration request, accumulated across all of
/// its batches. Partial success is a valid, reportable outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MigrationResult {
    pub new_accounts: u64,
    pub existing_accounts: u64,
    pub failed_batches: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl MigrationResult {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn is_partial(&self) -> bool {
        self.failed_batches > 0
    }
}

/// Deterministic account number derived from product and member reference.
///
/// Format: product code, branch code, then the first 8 hex digits of the
/// customer id, uppercased. Stable across runs so a re-seeded account keeps
/// the number its predecessor had (the row identity changes, the number
/// does not).
pub fn compute_account_number(product_code: &str, member: &MemberReference) -> String {
    let customer_hex: String = member
        .customer_id
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect();
    format!(
        "{}{}{}",
        product_code,
        member.branch_code,
        customer_hex.to_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn seed(branch: &str) -> AccountSeed {
        AccountSeed {
            customer_id: Uuid::new_v4(),
            customer_name: "Ada Obi".to_string(),
            branch_code: branch.to_string(),
            opening_balance: dec!(1500.25),
        }
    }

    #[test]
    fn test_request_rejects_empty_seed_list() {
        let err = MigrationRequest::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "BR001",
            Uuid::new_v4(),
            vec![],
            "ops-admin",
        )
        .unwrap_err();
        assert!(matches!(err, MigrationError::EmptySeedList));
    }

    #[test]
    fn test_request_stamps_correlation_and_time() {
        let req = MigrationRequest::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "BR001",
            Uuid::new_v4(),
            vec![seed("BR001")],
            "ops-admin",
        )
        .unwrap();
        assert!(!req.correlation_id.is_nil());
        assert_eq!(req.seeds.len(), 1);
    }

    #[test]
    fn test_member_reference_key() {
        let s = seed("BR042");
        let member = s.member_reference();
        assert_eq!(member.key(), format!("BR042:{}", s.customer_id));
        assert_eq!(member.to_string(), member.key());
    }

    #[test]
    fn test_account_number_is_deterministic() {
        let s = seed("BR001");
        let member = s.member_reference();
        let a = compute_account_number("SAV", &member);
        let b = compute_account_number("SAV", &member);
        assert_eq!(a, b);
        assert!(a.starts_with("SAVBR001"));
        assert_eq!(a.len(), "SAVBR001".len() + 8);
    }

    #[test]
    fn test_account_number_differs_per_member() {
        let a = compute_account_number("SAV", &seed("BR001").member_reference());
        let b = compute_account_number("SAV", &seed("BR001").member_reference());
        assert_ne!(a, b);
    }

    #[test]
    fn test_transaction_status_parsing() {
        assert_eq!(
            "COMPLETED".parse::<TransactionStatus>(),
            Ok(TransactionStatus::Completed)
        );
        assert_eq!(
            "FAILED".parse::<TransactionStatus>(),
            Ok(TransactionStatus::Failed)
        );
        assert!("settled".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn test_operation_wire_form() {
        assert_eq!(TransactionOperation::Deposit.as_str(), "DEPOSIT");
        assert_eq!(TransactionStatus::Completed.as_str(), "COMPLETED");
        assert_eq!(TransactionType::Migration.as_str(), "migration");
    }
}
