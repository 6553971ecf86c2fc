use thiserror::Error;

use stockledger_core::LedgerError;

pub type InterchangeResult<T> = Result<T, InterchangeError>;

#[derive(Debug, Error)]
pub enum InterchangeError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The CSV batch had malformed lines; nothing was loaded.
    #[error("csv file has {rows} malformed line(s); see the error log")]
    InvalidCsv { rows: usize },

    /// The XML document does not match the inventory layout.
    #[error("invalid inventory xml: {0}")]
    InvalidXml(String),

    #[error("xml write failed: {0}")]
    XmlWrite(String),
}

impl InterchangeError {
    pub(crate) fn invalid_xml(msg: impl Into<String>) -> Self {
        Self::InvalidXml(msg.into())
    }
}
