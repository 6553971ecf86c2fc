//! Transactional product + movement store boundary.
//!
//! The ledger engine only ever talks to [`LedgerStore`] and
//! [`LedgerTransaction`]; the in-memory store backs tests and dev runs, the
//! SQLite store backs the binary.

pub mod in_memory;
pub mod sqlite;
pub mod r#trait;

pub use in_memory::{InMemoryLedgerStore, InMemoryTransaction};
pub use r#trait::{LedgerStore, LedgerTransaction, StoreError};
pub use sqlite::{SqliteLedgerStore, SqliteTransaction};
