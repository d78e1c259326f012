//! Reference resolution seam
//!
//! Before the engine runs, the worker resolves a request's product
//! definition and its branch's teller context. "Not found" is an expected
//! value here, not an error: the worker drops the request and audits it as
//! non-retryable. `Err` is reserved for backend failures.

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{Product, Teller};
use crate::store::StoreError;

#[async_trait]
pub trait ReferenceResolver: Send + Sync {
    async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>, StoreError>;

    async fn find_teller(&self, branch_id: Uuid) -> Result<Option<Teller>, StoreError>;
}
