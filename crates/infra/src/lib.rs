//! Infrastructure layer: stores, ledger components, configuration.
//!
//! Components are plain structs generic over a [`store::LedgerStore`]
//! injected at construction; there is no process-wide connection state.

/// Store boundary and backends (in-memory, SQLite).
pub mod store;

pub mod bulk;
pub mod config;
pub mod engine;
pub mod ledger;
pub mod query;
pub mod registry;
pub mod service;

mod transaction;


pub use bulk::{BulkLoadReport, BulkLoader};
pub use config::{ConfigError, LedgerConfig};
pub use engine::{CascadeDeletion, Reconciliation, StockLedgerEngine};
pub use ledger::MovementLedger;
pub use query::QueryLayer;
pub use registry::ProductRegistry;
pub use service::LedgerServices;
pub use store::{InMemoryLedgerStore, LedgerStore, LedgerTransaction, SqliteLedgerStore, StoreError};
