//! `stockledger` - command-line front end for the stock ledger.
//!
//! Every subcommand is a single call into the ledger components. Connection
//! settings come from `STOCKLEDGER_*` environment variables.

mod commands;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use stockledger_infra::{LedgerConfig, LedgerServices};

#[derive(Parser)]
#[command(name = "stockledger")]
#[command(author, version, about = "Transactional product stock ledger")]
struct Cli {
    /// Database URL (overrides STOCKLEDGER_DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new product
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        price: String,
        /// Starting stock (not recorded as a movement)
        #[arg(long, default_value_t = 0)]
        stock: i64,
    },

    /// List every product
    List,

    /// Show one product by id or by exact name
    Show {
        id: Option<i64>,
        #[arg(long, conflicts_with = "id")]
        name: Option<String>,
    },

    /// Change product fields; a new stock level is reconciled through the ledger
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        stock: Option<i64>,
    },

    /// Record incoming stock
    Entry { id: i64, quantity: i64 },

    /// Record outgoing stock
    Exit { id: i64, quantity: i64 },

    /// Bring stock to an exact level with a single movement
    SetStock { id: i64, stock: i64 },

    /// Delete a product together with its movement history
    Delete {
        id: i64,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Movement history of one product, newest first
    History { id: i64 },

    /// Movements between two dates (YYYY-MM-DD, inclusive)
    Report {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },

    /// Best-selling products by total exits
    Top {
        #[arg(short, long, default_value_t = 5)]
        limit: i64,
    },

    /// Stock per category
    Categories,

    /// Ledger totals of one product
    Balance { id: i64 },

    /// Append products from a semicolon-separated file (bypasses the ledger)
    ImportCsv {
        #[arg(default_value = "inventario.csv")]
        file: PathBuf,
        /// Error log (overrides STOCKLEDGER_CSV_ERROR_LOG)
        #[arg(long)]
        error_log: Option<PathBuf>,
    },

    /// Export products below a stock threshold as JSON
    ExportJson {
        #[arg(long)]
        threshold: i64,
        #[arg(short, long, default_value = "stock_bajo.json")]
        output: PathBuf,
    },

    /// Export the whole inventory as XML
    ExportXml {
        #[arg(short, long, default_value = "inventario.xml")]
        output: PathBuf,
    },

    /// Replace the whole inventory from XML (drops all movement history)
    ImportXml {
        file: PathBuf,
        /// Confirm the replacement
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = LedgerConfig::from_env().context("invalid configuration")?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    stockledger_observability::init(config.log_format);

    let services = LedgerServices::connect(&config)
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;

    let outcome = commands::run(&services, &config, cli.command).await;
    services.store().close().await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn destructive_commands_default_to_unconfirmed() {
        let cli = Cli::try_parse_from(["stockledger", "delete", "3"]).unwrap();
        assert!(matches!(cli.command, Commands::Delete { id: 3, yes: false }));

        let cli = Cli::try_parse_from(["stockledger", "import-xml", "inv.xml", "--yes"]).unwrap();
        assert!(matches!(cli.command, Commands::ImportXml { yes: true, .. }));
    }

    #[test]
    fn show_takes_an_id_or_a_name_but_not_both() {
        assert!(Cli::try_parse_from(["stockledger", "show", "--name", "Widget"]).is_ok());
        assert!(Cli::try_parse_from(["stockledger", "show", "1", "--name", "Widget"]).is_err());
    }
}
