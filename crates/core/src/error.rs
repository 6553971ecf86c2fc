//! Ledger error model.

use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger-level error.
///
/// Validation variants (`InvalidQuantity`, `InvalidDateFormat`, `InvalidLimit`,
/// `InvalidProduct`) are raised before any store interaction. Every
/// stock-mutating operation that fails with any variant has been rolled back.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A movement quantity was zero or negative.
    #[error("invalid quantity {0}: quantity must be greater than 0")]
    InvalidQuantity(i64),

    /// No product matched the identifier (or name).
    #[error("product not found: {0}")]
    ProductNotFound(String),

    /// A guarded decrement matched no row.
    ///
    /// The store cannot tell a missing product from a short stock level, and
    /// the ledger does not try to.
    #[error("insufficient stock or product not found (product {product_id}, requested {requested})")]
    InsufficientStockOrNotFound {
        product_id: ProductId,
        requested: i64,
    },

    /// A date was not a well-formed `YYYY-MM-DD` calendar date.
    #[error("invalid date format '{0}': use YYYY-MM-DD")]
    InvalidDateFormat(String),

    /// A ranking limit was zero or negative.
    #[error("invalid limit {0}: limit must be greater than 0")]
    InvalidLimit(i64),

    /// Product fields failed validation (empty name, negative stock, ...).
    #[error("invalid product: {0}")]
    InvalidProduct(String),

    /// The store failed during a multi-step operation; nothing was applied.
    #[error("transaction failed during {operation}: {message}")]
    TransactionFailure {
        operation: &'static str,
        message: String,
    },

    /// The store failed while serving a single read.
    #[error("storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn product_not_found(id: impl core::fmt::Display) -> Self {
        Self::ProductNotFound(id.to_string())
    }

    pub fn invalid_product(msg: impl Into<String>) -> Self {
        Self::InvalidProduct(msg.into())
    }

    pub fn transaction(operation: &'static str, cause: impl core::fmt::Display) -> Self {
        Self::TransactionFailure {
            operation,
            message: cause.to_string(),
        }
    }

    pub fn storage(cause: impl core::fmt::Display) -> Self {
        Self::Storage(cause.to_string())
    }

    /// True for errors detected before the store was touched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuantity(_)
                | Self::InvalidDateFormat(_)
                | Self::InvalidLimit(_)
                | Self::InvalidProduct(_)
        )
    }
}
