//! Transaction boundary shared by every multi-step writer.
//!
//! A writer opens a transaction with [`begin`], runs its steps against it and
//! hands the outcome to [`finish`]: `Ok` commits once, `Err` rolls back and
//! returns the original error. Store failures raised by a step are mapped with
//! [`step_failed`] so callers always see `TransactionFailure` for them.

use stockledger_core::{LedgerError, LedgerResult};

use crate::store::{LedgerStore, LedgerTransaction, StoreError};

pub(crate) async fn begin<S: LedgerStore>(
    store: &S,
    operation: &'static str,
) -> LedgerResult<S::Tx> {
    store
        .begin()
        .await
        .map_err(|e| LedgerError::transaction(operation, e))
}

pub(crate) fn step_failed(operation: &'static str) -> impl Fn(StoreError) -> LedgerError {
    move |e| LedgerError::transaction(operation, e)
}

pub(crate) async fn finish<Tx, T>(
    tx: Tx,
    operation: &'static str,
    outcome: LedgerResult<T>,
) -> LedgerResult<T>
where
    Tx: LedgerTransaction,
{
    match outcome {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| LedgerError::transaction(operation, e))?;
            tracing::debug!(operation, "transaction committed");
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                // The store discards uncommitted work on its own; report and move on.
                tracing::error!(operation, error = %rollback_err, "rollback failed");
            }
            tracing::debug!(operation, error = %err, "transaction rolled back");
            Err(err)
        }
    }
}
