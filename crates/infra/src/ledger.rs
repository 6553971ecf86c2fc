//! Movement Ledger: read-only views over the append-only movement log.
//!
//! Appends happen only inside engine transactions (see `engine`).

use stockledger_core::{LedgerError, LedgerResult, ProductId};
use stockledger_inventory::{DateRange, Movement, MovementKind, MovementReportRow};

use crate::store::LedgerStore;

#[derive(Debug, Clone)]
pub struct MovementLedger<S> {
    store: S,
}

impl<S: LedgerStore> MovementLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Movements of one product, newest first. Empty for unknown products.
    pub async fn query_by_product(&self, product_id: ProductId) -> LedgerResult<Vec<Movement>> {
        self.store
            .movements_for_product(product_id)
            .await
            .map_err(LedgerError::storage)
    }

    /// Movements recorded between two `YYYY-MM-DD` dates (both inclusive),
    /// newest first, with the product's name and category.
    ///
    /// The dates are parsed before the store is queried.
    pub async fn query_by_date_range(
        &self,
        start: &str,
        end: &str,
    ) -> LedgerResult<Vec<MovementReportRow>> {
        let range = DateRange::parse(start, end)?;
        if range.start > range.end {
            return Ok(Vec::new());
        }
        self.store
            .movements_between(range)
            .await
            .map_err(LedgerError::storage)
    }

    /// Total quantity of one kind recorded for a product (0 when none).
    pub async fn sum_by_product_and_kind(
        &self,
        product_id: ProductId,
        kind: MovementKind,
    ) -> LedgerResult<i64> {
        self.store
            .sum_by_product_and_kind(product_id, kind)
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
    use chrono::Utc;
    use stockledger_inventory::NewProduct;

    #[tokio::test]
    async fn malformed_dates_are_rejected() {
        let ledger = MovementLedger::new(InMemoryLedgerStore::new());
        for (start, end) in [("2024-1-01", "2024-01-31"), ("2024-02-30", "2024-03-01"), ("", "x")] {
            let err = ledger.query_by_date_range(start, end).await.unwrap_err();
            assert!(matches!(err, LedgerError::InvalidDateFormat(_)), "{start}..{end}");
        }
    }

    #[tokio::test]
    async fn history_is_newest_first_and_today_is_in_range() {
        let store = InMemoryLedgerStore::new();
        let id = ProductRegistry::new(store.clone())
            .create(NewProduct::new("Widget", "Tools", "9.99", 10))
            .await
            .unwrap();
        let engine = StockLedgerEngine::new(store.clone());
        let first = engine.apply_entry(id, 5).await.unwrap();
        let second = engine.apply_exit(id, 3).await.unwrap();

        let ledger = MovementLedger::new(store);
        let history = ledger.query_by_product(id).await.unwrap();
        assert_eq!(
            history.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );

        let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        let rows = ledger.query_by_date_range(&today, &today).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].product_name, "Widget");
        assert_eq!(rows[0].category, "Tools");

        assert_eq!(
            ledger.sum_by_product_and_kind(id, MovementKind::Exit).await.unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn reversed_range_is_empty() {
        let ledger = MovementLedger::new(InMemoryLedgerStore::new());
        let rows = ledger
            .query_by_date_range("2024-12-31", "2024-01-01")
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}
