use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::info;
use wasteworth_core::{BackendRegistry, WasteworthService};
use wasteworth_directory_memory as memory;
use wasteworth_directory_remote as remote;

use crate::config::Config;

pub(crate) struct AppState {
    pub service: WasteworthService,
}

impl AppState {
    pub(crate) fn new(service: WasteworthService) -> Arc<Self> {
        Arc::new(Self { service })
    }

    /// Build every backend the configuration enables and bind the selected one.
    pub(crate) async fn from_config(config: &Config) -> Result<Arc<Self>> {
        let seed = match &config.seed_path {
            Some(path) => memory::load_seed(path).await?,
            None => Vec::new(),
        };
        let mut backends = vec![memory::plugin(seed)];

        if let Some(url) = &config.remote_url {
            let client = Client::builder()
                .user_agent("wasteworth/0.1")
                .timeout(config.lookup_timeout)
                .build()?;
            backends.push(remote::plugin(client, url));
        }

        let mut registry = BackendRegistry::new(backends);
        let available: Vec<String> = registry
            .backends()
            .into_iter()
            .map(|meta| meta.id.to_string())
            .collect();
        let backend = registry.take(&config.backend).with_context(|| {
            format!(
                "backend {} is not configured (available: {})",
                config.backend,
                available.join(", ")
            )
        })?;
        info!(backend = %backend.meta.id, name = %backend.meta.name, "directory backend selected");

        let service = WasteworthService::new(backend).with_lookup_timeout(config.lookup_timeout);
        Ok(Self::new(service))
    }
}
