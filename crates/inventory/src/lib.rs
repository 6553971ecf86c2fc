//! Inventory domain module.
//!
//! Products, stock movements and the report shapes read back from the ledger,
//! implemented as plain validated data (no IO, no storage).

pub mod movement;
pub mod product;
pub mod report;

pub use movement::{Movement, MovementKind, Quantity};
pub use product::{NewProduct, Price, Product, ProductFields};
pub use report::{CategoryStock, DateRange, LedgerBalance, MovementReportRow, TopSeller};
