//! Monitored gateways and the stores behind them

pub mod site;

use std::collections::HashMap;
use std::sync::Arc;

use crate::alerts::{PipelineError, StoreKind};
use crate::config::AppConfig;
use crate::storage::postgres::connect_lazy;
use crate::storage::{LinkHealthStore, PgLinkStore, PgTerminalStore, TerminalStatusStore};

pub use site::SiteDirectory;

/// One monitored gateway
pub struct Gateway {
    id: String,
    display_name: String,
    link_store: Option<Arc<dyn LinkHealthStore>>,
    terminal_store: Option<Arc<dyn TerminalStatusStore>>,
}

impl Gateway {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            link_store: None,
            terminal_store: None,
        }
    }

    pub fn with_link_store(mut self, store: Arc<dyn LinkHealthStore>) -> Self {
        self.link_store = Some(store);
        self
    }

    pub fn with_terminal_store(mut self, store: Arc<dyn TerminalStatusStore>) -> Self {
        self.terminal_store = Some(store);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Link health store, if configured and connected
    pub fn link_store(&self) -> Result<&Arc<dyn LinkHealthStore>, PipelineError> {
        match self.link_store {
            Some(ref store) if store.is_connected() => Ok(store),
            Some(_) => Err(self.unavailable(StoreKind::LinkHealth, "connection is down")),
            None => Err(self.unavailable(StoreKind::LinkHealth, "store is not configured")),
        }
    }

    /// Terminal status store, if configured and connected
    pub fn terminal_store(&self) -> Result<&Arc<dyn TerminalStatusStore>, PipelineError> {
        match self.terminal_store {
            Some(ref store) if store.is_connected() => Ok(store),
            Some(_) => Err(self.unavailable(StoreKind::TerminalStatus, "connection is down")),
            None => Err(self.unavailable(StoreKind::TerminalStatus, "store is not configured")),
        }
    }

    fn unavailable(&self, store: StoreKind, reason: &str) -> PipelineError {
        PipelineError::StoreUnavailable {
            gateway: self.id.clone(),
            store,
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("link_store", &self.link_store.is_some())
            .field("terminal_store", &self.terminal_store.is_some())
            .finish()
    }
}

/// Fixed set of monitored gateways, in configuration order
#[derive(Debug, Default)]
pub struct GatewayRegistry {
    gateways: Vec<Arc<Gateway>>,
    index: HashMap<String, usize>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a gateway; identifiers must be non-empty and unique
    pub fn register(&mut self, gateway: Gateway) -> Result<(), RegistryError> {
        if gateway.id.trim().is_empty() {
            return Err(RegistryError::EmptyId);
        }
        if self.index.contains_key(&gateway.id) {
            return Err(RegistryError::Duplicate(gateway.id));
        }

        self.index.insert(gateway.id.clone(), self.gateways.len());
        self.gateways.push(Arc::new(gateway));
        Ok(())
    }

    /// Connect every configured store and resolve display names
    pub fn from_config(config: &AppConfig) -> Result<Self, RegistryError> {
        let sites = SiteDirectory::new(config.site_names.clone());
        let mut registry = Self::new();

        for (i, entry) in config.gateways.iter().enumerate() {
            let mut gateway = Gateway::new(&entry.id, sites.display_name(&entry.id));

            match config.link_databases.get(i).and_then(Option::as_ref) {
                Some(db) => {
                    let pool = connect_lazy(db, config.db_max_connections);
                    gateway = gateway.with_link_store(Arc::new(PgLinkStore::new(pool)));
                }
                None => tracing::warn!(
                    gateway = %entry.id,
                    "Link health database not configured, runs will be skipped"
                ),
            }

            match config.terminal_databases.get(i).and_then(Option::as_ref) {
                Some(db) => {
                    let pool = connect_lazy(db, config.db_max_connections);
                    gateway = gateway.with_terminal_store(Arc::new(PgTerminalStore::new(pool)));
                }
                None => tracing::warn!(
                    gateway = %entry.id,
                    prefix = %entry.terminal_prefix,
                    "Terminal status database not configured, counts will be unknown"
                ),
            }

            tracing::info!(
                gateway = %entry.id,
                display_name = %gateway.display_name,
                "Registered gateway"
            );
            registry.register(gateway)?;
        }

        Ok(registry)
    }

    /// Look up a gateway by identifier
    pub fn resolve(&self, id: &str) -> Result<Arc<Gateway>, PipelineError> {
        self.index
            .get(id)
            .map(|&i| Arc::clone(&self.gateways[i]))
            .ok_or_else(|| PipelineError::UnknownGateway(id.to_string()))
    }

    /// Identifiers of all monitored gateways
    pub fn ids(&self) -> Vec<String> {
        self.gateways.iter().map(|g| g.id.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Gateway>> {
        self.gateways.iter()
    }
}

/// Registry construction errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Gateway identifier must not be empty")]
    EmptyId,

    #[error("Duplicate gateway identifier: {0}")]
    Duplicate(String),
}
