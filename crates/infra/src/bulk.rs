//! Bulk replace capability.
//!
//! These writers load products with literal ids and stock levels and record
//! no movements. They bypass the Stock Ledger Engine on purpose and are the
//! only non-engine writers of stock; conservation between stock and the
//! ledger does not hold for the rows they touch.

use tracing::instrument;

use stockledger_core::LedgerResult;
use stockledger_inventory::Product;

use crate::store::{LedgerStore, LedgerTransaction};
use crate::transaction::{begin, finish, step_failed};

/// What a bulk load changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkLoadReport {
    pub products_inserted: usize,
    pub products_removed: u64,
    pub movements_removed: u64,
}

#[derive(Debug, Clone)]
pub struct BulkLoader<S> {
    store: S,
}

impl<S: LedgerStore> BulkLoader<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Insert every product as given, in one transaction.
    ///
    /// A clashing id aborts the whole batch.
    #[instrument(skip(self, products), fields(rows = products.len()))]
    pub async fn append_products(&self, products: Vec<Product>) -> LedgerResult<BulkLoadReport> {
        tracing::warn!(rows = products.len(), "bulk append bypasses the stock ledger");

        let mut tx = begin(&self.store, "bulk_append").await?;
        let outcome = insert_all(&mut tx, &products, "bulk_append").await;
        let report = finish(tx, "bulk_append", outcome).await?;

        tracing::info!(inserted = report.products_inserted, "bulk append committed");
        Ok(report)
    }

    /// Wipe every movement and product, then insert `products`, in one
    /// transaction. Movement history is lost.
    #[instrument(skip(self, products), fields(rows = products.len()))]
    pub async fn replace_all(&self, products: Vec<Product>) -> LedgerResult<BulkLoadReport> {
        tracing::warn!(
            rows = products.len(),
            "bulk replace bypasses the stock ledger and discards movement history"
        );

        let mut tx = begin(&self.store, "bulk_replace").await?;
        let outcome = replace_within(&mut tx, &products).await;
        let report = finish(tx, "bulk_replace", outcome).await?;

        tracing::info!(
            inserted = report.products_inserted,
            removed = report.products_removed,
            movements_removed = report.movements_removed,
            "bulk replace committed"
        );
        Ok(report)
    }
}

async fn insert_all<Tx: LedgerTransaction>(
    tx: &mut Tx,
    products: &[Product],
    operation: &'static str,
) -> LedgerResult<BulkLoadReport> {
    for product in products {
        tx.insert_product(product)
            .await
            .map_err(step_failed(operation))?;
    }
    Ok(BulkLoadReport {
        products_inserted: products.len(),
        ..BulkLoadReport::default()
    })
}

async fn replace_within<Tx: LedgerTransaction>(
    tx: &mut Tx,
    products: &[Product],
) -> LedgerResult<BulkLoadReport> {
    let movements_removed = tx
        .delete_all_movements()
        .await
        .map_err(step_failed("bulk_replace"))?;
    let products_removed = tx
        .delete_all_products()
        .await
        .map_err(step_failed("bulk_replace"))?;
    let inserted = insert_all(tx, products, "bulk_replace").await?;

    Ok(BulkLoadReport {
        products_removed,
        movements_removed,
        ..inserted
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StockLedgerEngine;
    use crate::registry::ProductRegistry;
    use crate::store::InMemoryLedgerStore;
    use stockledger_core::{LedgerError, ProductId};
    use stockledger_inventory::{NewProduct, Price};

    fn product(id: i64, name: &str, stock: i64) -> Product {
        Product::new(ProductId::new(id), name, "Tools", Price::new("1.00"), stock).unwrap()
    }

    #[tokio::test]
    async fn append_keeps_literal_ids_and_records_nothing() {
        let store = InMemoryLedgerStore::new();
        let loader = BulkLoader::new(store.clone());
        let report = loader
            .append_products(vec![product(10, "Nail", 500), product(20, "Screw", 300)])
            .await
            .unwrap();
        assert_eq!(report.products_inserted, 2);

        let registry = ProductRegistry::new(store.clone());
        assert_eq!(registry.find_by_id(ProductId::new(20)).await.unwrap().stock(), 300);
        assert!(store.movements_for_product(ProductId::new(10)).await.unwrap().is_empty());

        // Next engine-assigned id follows the highest literal id.
        let next = registry
            .create(NewProduct::new("Bolt", "Tools", "0.50", 1))
            .await
            .unwrap();
        assert_eq!(next, ProductId::new(21));
    }

    #[tokio::test]
    async fn append_with_clashing_id_inserts_nothing() {
        let store = InMemoryLedgerStore::new();
        let loader = BulkLoader::new(store.clone());
        loader.append_products(vec![product(1, "Nail", 5)]).await.unwrap();

        let err = loader
            .append_products(vec![product(2, "Screw", 3), product(1, "Nail again", 9)])
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::TransactionFailure { operation: "bulk_append", .. }));
        assert_eq!(store.list_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn replace_all_wipes_history() {
        let store = InMemoryLedgerStore::new();
        let id = ProductRegistry::new(store.clone())
            .create(NewProduct::new("Widget", "Tools", "9.99", 10))
            .await
            .unwrap();
        StockLedgerEngine::new(store.clone())
            .apply_exit(id, 4)
            .await
            .unwrap();

        let report = BulkLoader::new(store.clone())
            .replace_all(vec![product(7, "Gear", 2)])
            .await
            .unwrap();
        assert_eq!(
            report,
            BulkLoadReport {
                products_inserted: 1,
                products_removed: 1,
                movements_removed: 1,
            }
        );

        let products = store.list_products().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id_typed(), ProductId::new(7));
        assert!(store.movements_for_product(id).await.unwrap().is_empty());
    }
}
