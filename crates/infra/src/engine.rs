//! Stock Ledger Engine.
//!
//! The only component allowed to change a product's stock after creation.
//! Every operation runs as one transaction: the stock write and the matching
//! movement append commit together or not at all.
//!
//! ## Concurrency
//!
//! Exits never read-then-write. The stock check and the decrement are a single
//! conditional write (`decrement_stock_if_sufficient`), so concurrent exits on
//! the same product serialize on the store and stock cannot go negative.

use tracing::instrument;

use stockledger_core::{LedgerError, LedgerResult, ProductId};
use stockledger_inventory::{Movement, MovementKind, ProductFields, Quantity};

use crate::registry;
use crate::store::{LedgerStore, LedgerTransaction};
use crate::transaction::{begin, finish, step_failed};

/// Result of [`StockLedgerEngine::reconcile_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub previous_stock: i64,
    pub new_stock: i64,
    /// `None` when the stock already matched.
    pub movement: Option<Movement>,
}

/// Result of [`StockLedgerEngine::delete_product_cascade`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeDeletion {
    pub product_id: ProductId,
    pub movements_deleted: u64,
}

#[derive(Debug, Clone)]
pub struct StockLedgerEngine<S> {
    store: S,
}

impl<S: LedgerStore> StockLedgerEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Increase stock by `quantity` and record an ENTRY.
    #[instrument(skip(self))]
    pub async fn apply_entry(&self, product_id: ProductId, quantity: i64) -> LedgerResult<Movement> {
        let quantity = Quantity::new(quantity)?;

        let mut tx = begin(&self.store, "apply_entry").await?;
        let outcome = entry_within(&mut tx, product_id, quantity, "apply_entry").await;
        let movement = finish(tx, "apply_entry", outcome).await;

        log_outcome("apply_entry", product_id, &movement);
        movement
    }

    /// Decrease stock by `quantity` and record an EXIT.
    ///
    /// Fails with `InsufficientStockOrNotFound` when the guarded decrement
    /// matches no row; stock is then unchanged and nothing is recorded.
    #[instrument(skip(self))]
    pub async fn apply_exit(&self, product_id: ProductId, quantity: i64) -> LedgerResult<Movement> {
        let quantity = Quantity::new(quantity)?;

        let mut tx = begin(&self.store, "apply_exit").await?;
        let outcome = exit_within(&mut tx, product_id, quantity, "apply_exit").await;
        let movement = finish(tx, "apply_exit", outcome).await;

        log_outcome("apply_exit", product_id, &movement);
        movement
    }

    /// Bring stock to `desired_stock` through a single ENTRY or EXIT.
    ///
    /// Raising stock never fails on a race. Lowering it can, when concurrent
    /// exits have consumed stock since it was read; the caller must re-read
    /// and retry or give up.
    #[instrument(skip(self))]
    pub async fn reconcile_to(
        &self,
        product_id: ProductId,
        desired_stock: i64,
    ) -> LedgerResult<Reconciliation> {
        validate_desired_stock(desired_stock)?;

        let mut tx = begin(&self.store, "reconcile_to").await?;
        let outcome = reconcile_within(&mut tx, product_id, desired_stock).await;
        let reconciliation = finish(tx, "reconcile_to", outcome).await;

        log_outcome("reconcile_to", product_id, &reconciliation);
        reconciliation
    }

    /// Replace name, category and price and optionally reconcile the stock,
    /// all in one transaction.
    #[instrument(skip(self, fields))]
    pub async fn edit_product(
        &self,
        product_id: ProductId,
        fields: ProductFields,
        desired_stock: Option<i64>,
    ) -> LedgerResult<Option<Reconciliation>> {
        fields.validate()?;
        if let Some(desired) = desired_stock {
            validate_desired_stock(desired)?;
        }

        let mut tx = begin(&self.store, "edit_product").await?;
        let outcome = edit_within(&mut tx, product_id, &fields, desired_stock).await;
        let edited = finish(tx, "edit_product", outcome).await;

        log_outcome("edit_product", product_id, &edited);
        edited
    }

    /// Delete every movement of the product, then the product itself.
    #[instrument(skip(self))]
    pub async fn delete_product_cascade(&self, product_id: ProductId) -> LedgerResult<CascadeDeletion> {
        let mut tx = begin(&self.store, "delete_product_cascade").await?;
        let outcome = cascade_within(&mut tx, product_id).await;
        let deletion = finish(tx, "delete_product_cascade", outcome).await;

        log_outcome("delete_product_cascade", product_id, &deletion);
        deletion
    }
}

fn validate_desired_stock(desired_stock: i64) -> LedgerResult<()> {
    if desired_stock < 0 {
        return Err(LedgerError::invalid_product(format!(
            "desired stock must not be negative (got {desired_stock})"
        )));
    }
    Ok(())
}

fn is_rejection(err: &LedgerError) -> bool {
    err.is_validation()
        || matches!(
            err,
            LedgerError::InsufficientStockOrNotFound { .. } | LedgerError::ProductNotFound(_)
        )
}

fn log_outcome<T>(operation: &'static str, product_id: ProductId, outcome: &LedgerResult<T>) {
    match outcome {
        Ok(_) => tracing::info!(operation, product_id = %product_id, "stock operation committed"),
        Err(err) if is_rejection(err) => {
            tracing::warn!(operation, product_id = %product_id, error = %err, "stock operation rejected")
        }
        Err(err) => {
            tracing::error!(operation, product_id = %product_id, error = %err, "stock operation failed")
        }
    }
}

async fn entry_within<Tx: LedgerTransaction>(
    tx: &mut Tx,
    product_id: ProductId,
    quantity: Quantity,
    operation: &'static str,
) -> LedgerResult<Movement> {
    let updated = tx
        .increment_stock(product_id, quantity.get())
        .await
        .map_err(step_failed(operation))?;
    if updated == 0 {
        return Err(LedgerError::product_not_found(product_id));
    }
    tx.append_movement(product_id, MovementKind::Entry, quantity.get())
        .await
        .map_err(step_failed(operation))
}

async fn exit_within<Tx: LedgerTransaction>(
    tx: &mut Tx,
    product_id: ProductId,
    quantity: Quantity,
    operation: &'static str,
) -> LedgerResult<Movement> {
    let updated = tx
        .decrement_stock_if_sufficient(product_id, quantity.get())
        .await
        .map_err(step_failed(operation))?;
    if updated == 0 {
        return Err(LedgerError::InsufficientStockOrNotFound {
            product_id,
            requested: quantity.get(),
        });
    }
    tx.append_movement(product_id, MovementKind::Exit, quantity.get())
        .await
        .map_err(step_failed(operation))
}

async fn reconcile_within<Tx: LedgerTransaction>(
    tx: &mut Tx,
    product_id: ProductId,
    desired_stock: i64,
) -> LedgerResult<Reconciliation> {
    let previous_stock = tx
        .current_stock(product_id)
        .await
        .map_err(step_failed("reconcile_to"))?
        .ok_or_else(|| LedgerError::product_not_found(product_id))?;

    let delta = desired_stock - previous_stock;
    let movement = match delta {
        0 => None,
        d if d > 0 => {
            Some(entry_within(tx, product_id, Quantity::new(d)?, "reconcile_to").await?)
        }
        d => Some(exit_within(tx, product_id, Quantity::new(-d)?, "reconcile_to").await?),
    };

    Ok(Reconciliation {
        previous_stock,
        new_stock: desired_stock,
        movement,
    })
}

async fn edit_within<Tx: LedgerTransaction>(
    tx: &mut Tx,
    product_id: ProductId,
    fields: &ProductFields,
    desired_stock: Option<i64>,
) -> LedgerResult<Option<Reconciliation>> {
    registry::update_fields_within(tx, product_id, fields).await?;
    match desired_stock {
        Some(desired) => Ok(Some(reconcile_within(tx, product_id, desired).await?)),
        None => Ok(None),
    }
}

async fn cascade_within<Tx: LedgerTransaction>(
    tx: &mut Tx,
    product_id: ProductId,
) -> LedgerResult<CascadeDeletion> {
    // Children first: the product row is still referenced until this runs.
    let movements_deleted = tx
        .delete_movements_for(product_id)
        .await
        .map_err(step_failed("delete_product_cascade"))?;
    registry::delete_within(tx, product_id).await?;

    Ok(CascadeDeletion {
        product_id,
        movements_deleted,
    })
}
