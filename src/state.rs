use std::sync::Arc;

use anyhow::Result;
use reqwest::Client;

use crate::config::Config;
use crate::llm::AiGateway;
use crate::utils::http::{build_http_client, build_proxy_client};
use crate::utils::session_store::ExpiringMemoryStore;
use crate::utils::templates::Templates;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: AiGateway,
    pub proxy_client: Client,
    pub templates: Arc<Templates>,
    pub sessions: ExpiringMemoryStore,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let api_client = build_http_client(config.http_timeout())?;
        let proxy_client = build_proxy_client(config.http_timeout())?;
        Ok(AppState {
            gateway: AiGateway::new(api_client, Arc::clone(&config)),
            proxy_client,
            templates: Arc::new(Templates::load()?),
            sessions: ExpiringMemoryStore::default(),
            config,
        })
    }
}
