use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use stockledger_core::{MovementId, ProductId};
use stockledger_inventory::{
    CategoryStock, DateRange, Movement, MovementKind, MovementReportRow, Product, ProductFields,
    TopSeller,
};

use super::r#trait::{LedgerStore, LedgerTransaction, StoreError};

#[derive(Debug, Clone, Default)]
struct LedgerState {
    products: BTreeMap<ProductId, Product>,
    movements: Vec<Movement>,
    last_movement_id: i64,
}

impl LedgerState {
    fn newest_first(&self) -> impl Iterator<Item = &Movement> {
        // Appends are chronological; reversing gives timestamp desc, id desc.
        self.movements.iter().rev()
    }
}

/// In-memory ledger store.
///
/// Intended for tests/dev. A transaction owns the state lock for its whole
/// lifetime and works on a private copy that replaces the shared state only on
/// commit, so transactions are serializable and dropping one is a rollback.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Transaction over [`InMemoryLedgerStore`].
#[derive(Debug)]
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<LedgerState>,
    working: LedgerState,
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTransaction { guard, working })
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.products.get(&id).cloned())
    }

    async fn product_by_name(&self, name: &str) -> Result<Option<Product>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.products.values().find(|p| p.name() == name).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.products.values().cloned().collect())
    }

    async fn products_below(&self, threshold: i64) -> Result<Vec<Product>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .products
            .values()
            .filter(|p| p.stock() < threshold)
            .cloned()
            .collect())
    }

    async fn movements_for_product(&self, id: ProductId) -> Result<Vec<Movement>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .newest_first()
            .filter(|m| m.product_id == id)
            .cloned()
            .collect())
    }

    async fn movements_between(
        &self,
        range: DateRange,
    ) -> Result<Vec<MovementReportRow>, StoreError> {
        let state = self.state.lock().await;
        let mut rows = Vec::new();
        for movement in state.newest_first().filter(|m| range.contains(m.recorded_at)) {
            let product = state.products.get(&movement.product_id).ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "movement {} references missing product {}",
                    movement.id, movement.product_id
                ))
            })?;
            rows.push(MovementReportRow {
                movement: movement.clone(),
                product_name: product.name().to_string(),
                category: product.category().to_string(),
            });
        }
        Ok(rows)
    }

    async fn sum_by_product_and_kind(
        &self,
        id: ProductId,
        kind: MovementKind,
    ) -> Result<i64, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .movements
            .iter()
            .filter(|m| m.product_id == id && m.kind == kind)
            .map(|m| m.quantity)
            .sum())
    }

    async fn top_selling(&self, limit: i64) -> Result<Vec<TopSeller>, StoreError> {
        let state = self.state.lock().await;
        let mut ranking: Vec<TopSeller> = state
            .products
            .values()
            .map(|p| TopSeller {
                product_id: p.id_typed(),
                name: p.name().to_string(),
                category: p.category().to_string(),
                price: p.price().clone(),
                total_sold: state
                    .movements
                    .iter()
                    .filter(|m| m.product_id == p.id_typed() && m.kind == MovementKind::Exit)
                    .map(|m| m.quantity)
                    .sum(),
            })
            .collect();
        // Stable sort keeps the id-ascending order of the BTreeMap for ties.
        ranking.sort_by(|a, b| b.total_sold.cmp(&a.total_sold));
        ranking.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(ranking)
    }

    async fn stock_by_category(&self) -> Result<Vec<CategoryStock>, StoreError> {
        let state = self.state.lock().await;
        let mut groups: BTreeMap<&str, CategoryStock> = BTreeMap::new();
        for p in state.products.values() {
            let entry = groups.entry(p.category()).or_insert_with(|| CategoryStock {
                category: p.category().to_string(),
                product_count: 0,
                total_stock: 0,
            });
            entry.product_count += 1;
            entry.total_stock += p.stock();
        }
        let mut rows: Vec<CategoryStock> = groups.into_values().collect();
        rows.sort_by(|a, b| b.total_stock.cmp(&a.total_stock));
        Ok(rows)
    }
}

impl InMemoryTransaction {
    fn product(&self, id: ProductId) -> Option<&Product> {
        self.working.products.get(&id)
    }

    fn replace_product(&mut self, product: Product) {
        self.working.products.insert(product.id_typed(), product);
    }

    fn with_stock(product: &Product, stock: i64) -> Result<Product, StoreError> {
        Product::new(
            product.id_typed(),
            product.name(),
            product.category(),
            product.price().clone(),
            stock,
        )
        .map_err(|e| StoreError::Constraint(e.to_string()))
    }
}

#[async_trait]
impl LedgerTransaction for InMemoryTransaction {
    async fn next_product_id(&mut self) -> Result<ProductId, StoreError> {
        Ok(self
            .working
            .products
            .keys()
            .next_back()
            .map(|max| max.next())
            .unwrap_or(ProductId::FIRST))
    }

    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError> {
        if self.working.products.contains_key(&product.id_typed()) {
            return Err(StoreError::Constraint(format!(
                "duplicate product id {}",
                product.id_typed()
            )));
        }
        self.replace_product(product.clone());
        Ok(())
    }

    async fn update_product_fields(
        &mut self,
        id: ProductId,
        fields: &ProductFields,
    ) -> Result<u64, StoreError> {
        let Some(current) = self.working.products.get(&id) else {
            return Ok(0);
        };
        let updated = Product::new(
            id,
            fields.name.clone(),
            fields.category.clone(),
            fields.price.clone(),
            current.stock(),
        )
        .map_err(|e| StoreError::Constraint(e.to_string()))?;
        self.replace_product(updated);
        Ok(1)
    }

    async fn current_stock(&mut self, id: ProductId) -> Result<Option<i64>, StoreError> {
        Ok(self.working.products.get(&id).map(Product::stock))
    }

    async fn increment_stock(&mut self, id: ProductId, quantity: i64) -> Result<u64, StoreError> {
        let Some(product) = self.product(id) else {
            return Ok(0);
        };
        let stock = product
            .stock()
            .checked_add(quantity)
            .ok_or_else(|| StoreError::Constraint(format!("stock overflow on product {id}")))?;
        let updated = Self::with_stock(product, stock)?;
        self.replace_product(updated);
        Ok(1)
    }

    async fn decrement_stock_if_sufficient(
        &mut self,
        id: ProductId,
        quantity: i64,
    ) -> Result<u64, StoreError> {
        let Some(product) = self.product(id) else {
            return Ok(0);
        };
        if product.stock() < quantity {
            return Ok(0);
        }
        let updated = Self::with_stock(product, product.stock() - quantity)?;
        self.replace_product(updated);
        Ok(1)
    }

    async fn append_movement(
        &mut self,
        id: ProductId,
        kind: MovementKind,
        quantity: i64,
    ) -> Result<Movement, StoreError> {
        if !self.working.products.contains_key(&id) {
            return Err(StoreError::Constraint(format!(
                "movement references missing product {id}"
            )));
        }
        if quantity <= 0 {
            return Err(StoreError::Constraint(format!(
                "movement quantity must be positive (got {quantity})"
            )));
        }
        self.working.last_movement_id += 1;
        let movement = Movement {
            id: MovementId::new(self.working.last_movement_id),
            product_id: id,
            kind,
            quantity,
            recorded_at: Utc::now(),
        };
        self.working.movements.push(movement.clone());
        Ok(movement)
    }

    async fn delete_movements_for(&mut self, id: ProductId) -> Result<u64, StoreError> {
        let before = self.working.movements.len();
        self.working.movements.retain(|m| m.product_id != id);
        Ok((before - self.working.movements.len()) as u64)
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<u64, StoreError> {
        if self.working.movements.iter().any(|m| m.product_id == id) {
            return Err(StoreError::Constraint(format!(
                "product {id} is still referenced by movements"
            )));
        }
        Ok(u64::from(self.working.products.remove(&id).is_some()))
    }

    async fn delete_all_movements(&mut self) -> Result<u64, StoreError> {
        let removed = self.working.movements.len() as u64;
        self.working.movements.clear();
        Ok(removed)
    }

    async fn delete_all_products(&mut self) -> Result<u64, StoreError> {
        if !self.working.movements.is_empty() {
            return Err(StoreError::Constraint(
                "products are still referenced by movements".to_string(),
            ));
        }
        let removed = self.working.products.len() as u64;
        self.working.products.clear();
        Ok(removed)
    }

    async fn commit(self) -> Result<(), StoreError> {
        let InMemoryTransaction { mut guard, working } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
