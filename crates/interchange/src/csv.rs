//! Semicolon-separated product batch loader.
//!
//! Layout: `id_producto;nombre;categoria;precio;stock`, header first. The
//! whole file is validated before anything is written; every malformed line
//! is appended to an error log and a single bad line rejects the batch.

use std::io::Write;
use std::path::Path;

use tokio::io::AsyncWriteExt;

use stockledger_core::ProductId;
use stockledger_infra::{BulkLoadReport, BulkLoader, LedgerStore};
use stockledger_inventory::{Price, Product};

use crate::error::{InterchangeError, InterchangeResult};

pub const COLUMNS: usize = 5;
pub const DELIMITER: char = ';';

/// Line written after each error-log entry.
pub const ERROR_LOG_SEPARATOR: &str = "--------------------------------------------------";

/// One rejected line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRowError {
    /// 1-based, header included.
    pub line: usize,
    pub reason: String,
    pub content: String,
}

impl CsvRowError {
    fn new(line: usize, reason: impl Into<String>, content: &str) -> Self {
        Self {
            line,
            reason: reason.into(),
            content: content.to_string(),
        }
    }
}

/// Validate a whole batch. Returns the products of every data line, or every
/// line error found.
pub fn parse_products(input: &str) -> Result<Vec<Product>, Vec<CsvRowError>> {
    let mut products = Vec::new();
    let mut errors = Vec::new();

    for (index, raw) in input.lines().enumerate() {
        let line = index + 1;
        let columns: Vec<&str> = raw.split(DELIMITER).collect();
        if columns.len() != COLUMNS {
            errors.push(CsvRowError::new(
                line,
                format!("expected {COLUMNS} columns, found {}", columns.len()),
                raw,
            ));
            continue;
        }
        if line == 1 {
            continue;
        }
        match parse_row(&columns) {
            Ok(product) => products.push(product),
            Err(reason) => errors.push(CsvRowError::new(line, reason, raw)),
        }
    }

    if errors.is_empty() {
        Ok(products)
    } else {
        Err(errors)
    }
}

fn parse_row(columns: &[&str]) -> Result<Product, String> {
    let id = columns[0]
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("id '{}' is not an integer", columns[0].trim()))?;
    let stock = columns[4]
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("stock '{}' is not an integer", columns[4].trim()))?;
    if stock < 0 {
        return Err(format!("stock {stock} is negative"));
    }
    Product::new(
        ProductId::new(id),
        columns[1].trim(),
        columns[2].trim(),
        Price::new(columns[3].trim()),
        stock,
    )
    .map_err(|e| e.to_string())
}

/// Write one log entry per error: position and reason, raw content, separator.
pub fn write_error_log<W: Write>(mut out: W, errors: &[CsvRowError]) -> std::io::Result<()> {
    for error in errors {
        writeln!(out, "error on line {}: {}", error.line, error.reason)?;
        writeln!(out, "content: {}", error.content)?;
        writeln!(out, "{ERROR_LOG_SEPARATOR}")?;
    }
    out.flush()
}

/// Loads validated CSV batches through the bulk-append path.
#[derive(Debug, Clone)]
pub struct CsvImporter<S> {
    loader: BulkLoader<S>,
}

impl<S: LedgerStore> CsvImporter<S> {
    pub fn new(loader: BulkLoader<S>) -> Self {
        Self { loader }
    }

    /// Validate `input` and append its products in one transaction.
    ///
    /// On any malformed line the errors go to `error_log` and nothing is
    /// written to the store.
    pub async fn import_str<W: Write>(
        &self,
        input: &str,
        error_log: W,
    ) -> InterchangeResult<BulkLoadReport> {
        match parse_products(input) {
            Ok(products) => Ok(self.loader.append_products(products).await?),
            Err(errors) => {
                tracing::warn!(rows = errors.len(), "csv batch rejected");
                write_error_log(error_log, &errors)?;
                Err(InterchangeError::InvalidCsv { rows: errors.len() })
            }
        }
    }

    /// Same as [`import_str`](Self::import_str) over files; the error log is
    /// opened in append mode (and created) only when there is something to log.
    pub async fn import_file(
        &self,
        csv_path: &Path,
        error_log_path: &Path,
    ) -> InterchangeResult<BulkLoadReport> {
        let input = tokio::fs::read_to_string(csv_path).await?;

        let mut log = Vec::new();
        let outcome = self.import_str(&input, &mut log).await;

        if !log.is_empty() {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(error_log_path)
                .await?;
            file.write_all(&log).await?;
            file.flush().await?;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockledger_core::LedgerError;
    use stockledger_infra::{InMemoryLedgerStore, LedgerServices};

    const HEADER: &str = "id_producto;nombre;categoria;precio;stock";

    fn importer(store: &InMemoryLedgerStore) -> CsvImporter<InMemoryLedgerStore> {
        CsvImporter::new(LedgerServices::new(store.clone()).bulk)
    }

    #[test]
    fn parses_data_lines_after_the_header() {
        let input = format!("{HEADER}\n1; Nail ;Hardware;0.10;500\n2;Screw;Hardware;0.20;0\n");
        let products = parse_products(&input).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].id_typed(), ProductId::new(1));
        assert_eq!(products[0].name(), "Nail");
        assert_eq!(products[1].stock(), 0);
    }

    #[test]
    fn reports_every_bad_line_with_its_number() {
        let input = format!("{HEADER}\nx;Nail;Hardware;0.10;5\n2;Screw;Hardware;0.20\n3;Bolt;Hardware;1;-4\n");
        let errors = parse_products(&input).unwrap_err();
        assert_eq!(
            errors.iter().map(|e| e.line).collect::<Vec<_>>(),
            vec![2, 3, 4]
        );
        assert_eq!(errors[0].reason, "id 'x' is not an integer");
        assert_eq!(errors[1].reason, "expected 5 columns, found 4");
        assert_eq!(errors[1].content, "2;Screw;Hardware;0.20");
        assert_eq!(errors[2].reason, "stock -4 is negative");
    }

    #[test]
    fn header_column_count_is_checked() {
        let errors = parse_products("id;nombre\n").unwrap_err();
        assert_eq!(errors[0].line, 1);
    }

    #[test]
    fn error_log_entries_end_with_separator() {
        let mut out = Vec::new();
        write_error_log(&mut out, &[CsvRowError::new(3, "bad", "a;b")]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            format!("error on line 3: bad\ncontent: a;b\n{ERROR_LOG_SEPARATOR}\n")
        );
    }

    #[tokio::test]
    async fn bad_batch_writes_nothing_to_the_store() {
        let store = InMemoryLedgerStore::new();
        let mut log = Vec::new();
        let err = importer(&store)
            .import_str(&format!("{HEADER}\n1;Nail;Hardware;0.10;5\n2;;;\n"), &mut log)
            .await
            .unwrap_err();
        assert!(matches!(err, InterchangeError::InvalidCsv { rows: 1 }));
        assert!(!log.is_empty());
        assert!(store.list_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_ids_abort_the_batch() {
        let store = InMemoryLedgerStore::new();
        let err = importer(&store)
            .import_str(
                &format!("{HEADER}\n1;Nail;Hardware;0.10;5\n1;Nail;Hardware;0.10;5\n"),
                std::io::sink(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InterchangeError::Ledger(LedgerError::TransactionFailure { .. })
        ));
        assert!(store.list_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn import_file_appends_to_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("inventario.csv");
        let log_path = dir.path().join("errors.log");
        std::fs::write(&log_path, "previous\n").unwrap();
        std::fs::write(&csv_path, format!("{HEADER}\n1;Nail;Hardware\n")).unwrap();

        let store = InMemoryLedgerStore::new();
        importer(&store)
            .import_file(&csv_path, &log_path)
            .await
            .unwrap_err();

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.starts_with("previous\nerror on line 2:"));

        std::fs::write(&csv_path, format!("{HEADER}\n1;Nail;Hardware;0.10;5\n")).unwrap();
        let report = importer(&store)
            .import_file(&csv_path, &log_path)
            .await
            .unwrap();
        assert_eq!(report.products_inserted, 1);
    }
}
