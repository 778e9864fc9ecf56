//! Application state shared by the CLI commands and the Discord relay.
//!
//! Pins the generic session machinery from `parley-core` to the concrete
//! infra implementations: tiktoken counting, the JSON directory store, and
//! the OpenAI provider.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use parley_core::chat::session::ChatSession;
use parley_core::template::factory::SessionFactory;
use parley_core::template::registry::TemplateRegistry;
use parley_core::tokens::TokenCounter;
use parley_infra::config::{Secrets, load_app_config, load_registry};
use parley_infra::llm::openai::OpenAiProvider;
use parley_infra::store::JsonDirStore;
use parley_infra::tokens::TiktokenCounter;
use parley_types::config::AppConfig;

/// A chat session pinned to the concrete provider and store.
pub type Session = ChatSession<OpenAiProvider, JsonDirStore>;

/// Session factory pinned to the concrete provider and store.
pub type Factory = SessionFactory<OpenAiProvider, JsonDirStore>;

pub struct AppState {
    pub config: AppConfig,
    pub secrets: Secrets,
    pub registry: TemplateRegistry,
    pub store: Arc<JsonDirStore>,
    pub counter: Arc<dyn TokenCounter>,
}

impl AppState {
    /// Load configuration, secrets and templates.
    ///
    /// Nothing here needs the API key, so listing commands work without one.
    pub async fn init(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let config = load_app_config(config_path).await;
        let registry = load_registry(&config)
            .await
            .context("failed to load templates")?;
        let store = Arc::new(JsonDirStore::new(&config.save_dir));
        tracing::debug!(save_dir = %config.save_dir, template = %config.default_template, "state ready");
        Ok(Self {
            config,
            secrets: Secrets::from_env(),
            registry,
            store,
            counter: Arc::new(TiktokenCounter::new()),
        })
    }

    /// A session factory wired to OpenAI and the save store.
    ///
    /// Fails when `OPENAI_API_KEY` is not set.
    pub fn factory(&self) -> anyhow::Result<Factory> {
        let api_key = self
            .secrets
            .openai_api_key()
            .context("set OPENAI_API_KEY to chat")?;
        let provider = OpenAiProvider::new(api_key, self.config.base_url.as_deref());
        Ok(
            SessionFactory::new(Arc::new(provider), Arc::clone(&self.counter), &self.config)
                .with_store(Arc::clone(&self.store)),
        )
    }
}
