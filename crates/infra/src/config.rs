//! Process configuration read from `STOCKLEDGER_*` environment variables.

use std::path::PathBuf;

use thiserror::Error;

use stockledger_observability::LogFormat;

pub const DATABASE_URL_VAR: &str = "STOCKLEDGER_DATABASE_URL";
pub const MAX_CONNECTIONS_VAR: &str = "STOCKLEDGER_MAX_CONNECTIONS";
pub const CSV_ERROR_LOG_VAR: &str = "STOCKLEDGER_CSV_ERROR_LOG";
pub const LOG_FORMAT_VAR: &str = "STOCKLEDGER_LOG_FORMAT";

pub const DEFAULT_DATABASE_URL: &str = "sqlite://stockledger.db?mode=rwc";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_CSV_ERROR_LOG: &str = "import_errors.log";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(var: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub csv_error_log: PathBuf,
    pub log_format: LogFormat,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            csv_error_log: PathBuf::from(DEFAULT_CSV_ERROR_LOG),
            log_format: LogFormat::default(),
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or blank keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get(DATABASE_URL_VAR) {
            config.database_url = url.trim().to_string();
        }

        if let Some(raw) = get(MAX_CONNECTIONS_VAR) {
            let max = raw
                .trim()
                .parse::<u32>()
                .map_err(|e| ConfigError::invalid(MAX_CONNECTIONS_VAR, e.to_string()))?;
            if max == 0 {
                return Err(ConfigError::invalid(MAX_CONNECTIONS_VAR, "must be at least 1"));
            }
            config.max_connections = max;
        }

        if let Some(path) = get(CSV_ERROR_LOG_VAR) {
            config.csv_error_log = PathBuf::from(path.trim());
        }

        if let Some(raw) = get(LOG_FORMAT_VAR) {
            config.log_format = raw
                .parse()
                .map_err(|e: stockledger_observability::ParseLogFormatError| {
                    ConfigError::invalid(LOG_FORMAT_VAR, e.to_string())
                })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = LedgerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.database_url, "sqlite://stockledger.db?mode=rwc");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn values_override_defaults() {
        let config = LedgerConfig::from_lookup(lookup(&[
            (DATABASE_URL_VAR, "sqlite::memory:"),
            (MAX_CONNECTIONS_VAR, " 2 "),
            (CSV_ERROR_LOG_VAR, "/tmp/errors.log"),
            (LOG_FORMAT_VAR, "pretty"),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.csv_error_log, PathBuf::from("/tmp/errors.log"));
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = LedgerConfig::from_lookup(lookup(&[(DATABASE_URL_VAR, "  ")])).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn malformed_values_name_the_variable() {
        let err = LedgerConfig::from_lookup(lookup(&[(MAX_CONNECTIONS_VAR, "many")])).unwrap_err();
        assert!(err.to_string().starts_with("STOCKLEDGER_MAX_CONNECTIONS is invalid"));

        let err = LedgerConfig::from_lookup(lookup(&[(MAX_CONNECTIONS_VAR, "0")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: MAX_CONNECTIONS_VAR,
                reason: "must be at least 1".to_string()
            }
        );

        let err = LedgerConfig::from_lookup(lookup(&[(LOG_FORMAT_VAR, "yaml")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: LOG_FORMAT_VAR, .. }));
    }
}
