//! Product Registry: product identity, metadata and current stock snapshot.
//!
//! The registry never changes stock after creation; that is the engine's job.
//! Deletion is only reachable through the engine's cascading delete.

use tracing::instrument;

use stockledger_core::{LedgerError, LedgerResult, ProductId};
use stockledger_inventory::{NewProduct, Product, ProductFields};

use crate::store::{LedgerStore, LedgerTransaction};
use crate::transaction::{begin, finish, step_failed};

#[derive(Debug, Clone)]
pub struct ProductRegistry<S> {
    store: S,
}

impl<S: LedgerStore> ProductRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create a product under `max(id) + 1` (or 1 on an empty registry).
    ///
    /// The initial stock is the baseline; no movement is recorded for it.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create(&self, product: NewProduct) -> LedgerResult<ProductId> {
        product.validate()?;

        let mut tx = begin(&self.store, "create_product").await?;
        let outcome = create_steps(&mut tx, product).await;
        let id = finish(tx, "create_product", outcome).await?;

        tracing::info!(product_id = %id, "product created");
        Ok(id)
    }

    pub async fn find_by_id(&self, id: ProductId) -> LedgerResult<Product> {
        self.store
            .product_by_id(id)
            .await
            .map_err(LedgerError::storage)?
            .ok_or_else(|| LedgerError::product_not_found(id))
    }

    /// Exact-name lookup; the lowest id wins when names collide.
    pub async fn find_by_name(&self, name: &str) -> LedgerResult<Product> {
        self.store
            .product_by_name(name)
            .await
            .map_err(LedgerError::storage)?
            .ok_or_else(|| LedgerError::product_not_found(name))
    }

    /// Every product. Callers must not rely on the order.
    pub async fn list_all(&self) -> LedgerResult<Vec<Product>> {
        self.store.list_products().await.map_err(LedgerError::storage)
    }

    /// Replace name, category and price. Stock and the ledger are untouched.
    #[instrument(skip(self, fields))]
    pub async fn update_fields(&self, id: ProductId, fields: ProductFields) -> LedgerResult<()> {
        fields.validate()?;

        let mut tx = begin(&self.store, "update_fields").await?;
        let outcome = update_fields_within(&mut tx, id, &fields).await;
        finish(tx, "update_fields", outcome).await?;

        tracing::info!(product_id = %id, "product fields updated");
        Ok(())
    }
}

async fn create_steps<Tx: LedgerTransaction>(
    tx: &mut Tx,
    product: NewProduct,
) -> LedgerResult<ProductId> {
    let id = tx
        .next_product_id()
        .await
        .map_err(step_failed("create_product"))?;
    let product = product.into_product(id)?;
    tx.insert_product(&product)
        .await
        .map_err(step_failed("create_product"))?;
    Ok(id)
}

/// Metadata update inside a caller-owned transaction.
pub(crate) async fn update_fields_within<Tx: LedgerTransaction>(
    tx: &mut Tx,
    id: ProductId,
    fields: &ProductFields,
) -> LedgerResult<()> {
    let updated = tx
        .update_product_fields(id, fields)
        .await
        .map_err(step_failed("update_fields"))?;
    if updated == 0 {
        return Err(LedgerError::product_not_found(id));
    }
    Ok(())
}

/// Remove the product row. Only valid inside the engine's cascade, after
/// every movement of the product has been deleted in the same transaction.
pub(crate) async fn delete_within<Tx: LedgerTransaction>(
    tx: &mut Tx,
    id: ProductId,
) -> LedgerResult<()> {
    let deleted = tx
        .delete_product(id)
        .await
        .map_err(step_failed("delete_product_cascade"))?;
    if deleted == 0 {
        return Err(LedgerError::product_not_found(id));
    }
    Ok(())
}
