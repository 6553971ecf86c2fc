//! Query Layer: aggregate reports over products and the movement ledger.

use stockledger_core::{LedgerError, LedgerResult, ProductId};
use stockledger_inventory::{CategoryStock, LedgerBalance, MovementKind, Product, TopSeller};

use crate::store::LedgerStore;

#[derive(Debug, Clone)]
pub struct QueryLayer<S> {
    store: S,
}

impl<S: LedgerStore> QueryLayer<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Products ranked by total EXIT quantity, at most `limit` rows.
    ///
    /// Products without exits rank with zero; ties go to the lower id.
    pub async fn top_selling_products(&self, limit: i64) -> LedgerResult<Vec<TopSeller>> {
        if limit <= 0 {
            return Err(LedgerError::InvalidLimit(limit));
        }
        self.store
            .top_selling(limit)
            .await
            .map_err(LedgerError::storage)
    }

    /// Product count and total stock per category, largest stock first.
    pub async fn stock_by_category(&self) -> LedgerResult<Vec<CategoryStock>> {
        self.store
            .stock_by_category()
            .await
            .map_err(LedgerError::storage)
    }

    /// ENTRY and EXIT totals of one product.
    pub async fn ledger_balance(&self, product_id: ProductId) -> LedgerResult<LedgerBalance> {
        let entries = self
            .store
            .sum_by_product_and_kind(product_id, MovementKind::Entry)
            .await
            .map_err(LedgerError::storage)?;
        let exits = self
            .store
            .sum_by_product_and_kind(product_id, MovementKind::Exit)
            .await
            .map_err(LedgerError::storage)?;
        Ok(LedgerBalance { entries, exits })
    }

    /// Products with `stock < threshold`, ordered by id.
    pub async fn low_stock(&self, threshold: i64) -> LedgerResult<Vec<Product>> {
        self.store
            .products_below(threshold)
            .await
            .map_err(LedgerError::storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StockLedgerEngine;
    use crate::registry::ProductRegistry;
    use crate::store::InMemoryLedgerStore;
    use stockledger_inventory::NewProduct;

    #[tokio::test]
    async fn non_positive_limit_is_rejected() {
        let query = QueryLayer::new(InMemoryLedgerStore::new());
        assert_eq!(
            query.top_selling_products(0).await.unwrap_err(),
            LedgerError::InvalidLimit(0)
        );
        assert_eq!(
            query.top_selling_products(-2).await.unwrap_err(),
            LedgerError::InvalidLimit(-2)
        );
    }

    #[tokio::test]
    async fn categories_balance_and_low_stock() {
        let store = InMemoryLedgerStore::new();
        let registry = ProductRegistry::new(store.clone());
        let hammer = registry
            .create(NewProduct::new("Hammer", "Tools", "12.00", 4))
            .await
            .unwrap();
        registry
            .create(NewProduct::new("Saw", "Tools", "20.00", 6))
            .await
            .unwrap();
        registry
            .create(NewProduct::new("Ball", "Toys", "3.00", 30))
            .await
            .unwrap();

        let engine = StockLedgerEngine::new(store.clone());
        engine.apply_entry(hammer, 6).await.unwrap();
        engine.apply_exit(hammer, 9).await.unwrap();

        let query = QueryLayer::new(store);
        let categories = query.stock_by_category().await.unwrap();
        assert_eq!(categories[0].category, "Toys");
        assert_eq!(categories[0].total_stock, 30);
        assert_eq!(categories[1].category, "Tools");
        assert_eq!(categories[1].product_count, 2);
        assert_eq!(categories[1].total_stock, 7);

        let balance = query.ledger_balance(hammer).await.unwrap();
        assert_eq!(balance, LedgerBalance { entries: 6, exits: 9 });
        assert_eq!(balance.net(), -3);

        let low = query.low_stock(5).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id_typed(), hammer);
    }
}
