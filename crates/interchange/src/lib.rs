//! File interchange adapters: CSV batch load, JSON low-stock export, XML
//! inventory export and full-replace import.
//!
//! The loaders write through [`stockledger_infra::BulkLoader`] and therefore
//! bypass the stock ledger.

pub mod csv;
pub mod error;
pub mod json;
pub mod xml;

pub use csv::{CsvImporter, CsvRowError, ERROR_LOG_SEPARATOR};
pub use error::{InterchangeError, InterchangeResult};
pub use json::LowStockExporter;
pub use xml::{XmlExporter, XmlImporter};
