use async_trait::async_trait;
use thiserror::Error;

use stockledger_core::ProductId;
use stockledger_inventory::{
    CategoryStock, DateRange, Movement, MovementKind, MovementReportRow, Product, ProductFields,
    TopSeller,
};

/// Store operation error.
///
/// These are **infrastructure errors** (connectivity, constraints, corrupt
/// rows) as opposed to ledger errors (validation, not found, insufficient
/// stock). The engine decides how each one surfaces to callers.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Persistent product + movement store.
///
/// The read methods are single statements and need no transaction. Every
/// write goes through [`LedgerTransaction`], obtained from [`begin`].
///
/// ## Implementation Requirements
///
/// - transactions are all-or-nothing: dropping one without `commit` discards
///   every write made through it
/// - `decrement_stock_if_sufficient` is one atomic conditional write against
///   the stored row, never a read followed by a write
/// - movement ids are assigned monotonically and timestamps come from the
///   store's clock
///
/// [`begin`]: LedgerStore::begin
#[async_trait]
pub trait LedgerStore: Send + Sync {
    type Tx: LedgerTransaction;

    /// Open a transaction.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Lowest-id product carrying exactly this name.
    async fn product_by_name(&self, name: &str) -> Result<Option<Product>, StoreError>;

    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    /// Products with `stock < threshold`, ordered by id.
    async fn products_below(&self, threshold: i64) -> Result<Vec<Product>, StoreError>;

    /// Movements of one product, newest first.
    async fn movements_for_product(&self, id: ProductId) -> Result<Vec<Movement>, StoreError>;

    /// Movements recorded on a day inside `range`, newest first, joined with
    /// the owning product's name and category.
    async fn movements_between(
        &self,
        range: DateRange,
    ) -> Result<Vec<MovementReportRow>, StoreError>;

    async fn sum_by_product_and_kind(
        &self,
        id: ProductId,
        kind: MovementKind,
    ) -> Result<i64, StoreError>;

    /// Products ranked by total EXIT quantity (zero for none), descending,
    /// ties by id ascending.
    async fn top_selling(&self, limit: i64) -> Result<Vec<TopSeller>, StoreError>;

    /// Product count and stock sum per category, by total stock descending.
    async fn stock_by_category(&self) -> Result<Vec<CategoryStock>, StoreError>;
}

/// Write primitives available only inside a transaction.
///
/// Row-count returns mirror SQL `UPDATE`/`DELETE` semantics: zero means no
/// row matched the predicate.
#[async_trait]
pub trait LedgerTransaction: Send + Sized {
    /// `max(existing ids) + 1`, or 1 when there are no products.
    async fn next_product_id(&mut self) -> Result<ProductId, StoreError>;

    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError>;

    async fn update_product_fields(
        &mut self,
        id: ProductId,
        fields: &ProductFields,
    ) -> Result<u64, StoreError>;

    async fn current_stock(&mut self, id: ProductId) -> Result<Option<i64>, StoreError>;

    /// `stock = stock + quantity WHERE id = ?`.
    async fn increment_stock(&mut self, id: ProductId, quantity: i64) -> Result<u64, StoreError>;

    /// `stock = stock - quantity WHERE id = ? AND stock >= quantity`.
    async fn decrement_stock_if_sufficient(
        &mut self,
        id: ProductId,
        quantity: i64,
    ) -> Result<u64, StoreError>;

    /// Append to the ledger. Kind and quantity are validated by the caller.
    async fn append_movement(
        &mut self,
        id: ProductId,
        kind: MovementKind,
        quantity: i64,
    ) -> Result<Movement, StoreError>;

    async fn delete_movements_for(&mut self, id: ProductId) -> Result<u64, StoreError>;

    async fn delete_product(&mut self, id: ProductId) -> Result<u64, StoreError>;

    async fn delete_all_movements(&mut self) -> Result<u64, StoreError>;

    async fn delete_all_products(&mut self) -> Result<u64, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}
