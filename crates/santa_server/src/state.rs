use std::{sync::Arc, time::Duration};

use santa_core::{default_roster, load_roster, open_store, SantaService, Store};

use crate::{config::ServerConfig, error::ServerError};

/// Shared handler state; cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SantaService<dyn Store>>,
    pub base_url: String,
    pub store_timeout: Duration,
}

impl AppState {
    pub fn new(
        service: Arc<SantaService<dyn Store>>,
        base_url: impl Into<String>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            service,
            base_url: base_url.into(),
            store_timeout,
        }
    }

    /// Opens the configured store and loads the roster.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let roster = match &config.roster_path {
            Some(path) => load_roster(path)?,
            None => default_roster()?,
        };
        let store = open_store(&config.backend)?;
        let service = Arc::new(SantaService::new(store, roster));
        Ok(Self::new(service, config.base_url.clone(), config.store_timeout))
    }
}
