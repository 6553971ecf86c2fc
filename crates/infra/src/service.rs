//! Wiring: one store handle shared by every ledger component.

use stockledger_core::{LedgerError, LedgerResult};

use crate::bulk::BulkLoader;
use crate::config::LedgerConfig;
use crate::engine::StockLedgerEngine;
use crate::ledger::MovementLedger;
use crate::query::QueryLayer;
use crate::registry::ProductRegistry;
use crate::store::{LedgerStore, SqliteLedgerStore};

/// Every component constructed over the same injected store.
#[derive(Debug, Clone)]
pub struct LedgerServices<S> {
    pub registry: ProductRegistry<S>,
    pub engine: StockLedgerEngine<S>,
    pub ledger: MovementLedger<S>,
    pub query: QueryLayer<S>,
    pub bulk: BulkLoader<S>,
    store: S,
}

impl<S: LedgerStore + Clone> LedgerServices<S> {
    pub fn new(store: S) -> Self {
        Self {
            registry: ProductRegistry::new(store.clone()),
            engine: StockLedgerEngine::new(store.clone()),
            ledger: MovementLedger::new(store.clone()),
            query: QueryLayer::new(store.clone()),
            bulk: BulkLoader::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl LedgerServices<SqliteLedgerStore> {
    /// Open (and provision) the configured SQLite database.
    pub async fn connect(config: &LedgerConfig) -> LedgerResult<Self> {
        let store = SqliteLedgerStore::connect(&config.database_url, config.max_connections)
            .await
            .map_err(LedgerError::storage)?;
        tracing::info!(
            database_url = %config.database_url,
            max_connections = config.max_connections,
            "ledger store connected"
        );
        Ok(Self::new(store))
    }
}
