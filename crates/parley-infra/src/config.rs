//! Configuration loader for Parley.
//!
//! Reads `config.toml` (from `dirs::config_dir()/parley/` unless a path is
//! given) into [`AppConfig`], falling back to defaults when the file is
//! missing or malformed. Environment variables are applied on top. Secrets
//! are read from the environment only and kept in [`Secrets`].

use std::path::{Path, PathBuf};

use parley_core::template::registry::TemplateRegistry;
use parley_types::config::AppConfig;
use parley_types::error::TemplateError;
use secrecy::SecretString;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const DISCORD_BOT_TOKEN: &str = "DISCORD_BOT_TOKEN";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingSecret(&'static str),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// `{config_dir}/parley/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("parley").join("config.toml"))
}

/// Load configuration from `path`, or the default location when `None`,
/// then apply environment overrides.
pub async fn load_app_config(path: Option<&Path>) -> AppConfig {
    let path = path.map(Path::to_path_buf).or_else(default_config_path);
    let mut config = match path {
        Some(path) => read_config_file(&path).await,
        None => {
            tracing::debug!("no config directory on this platform, using defaults");
            AppConfig::default()
        }
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

async fn read_config_file(path: &Path) -> AppConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            AppConfig::default()
        }
    }
}

/// Apply `PARLEY_*`, `OPENAI_BASE_URL` and `DISCORD_*` overrides read
/// through `lookup`. Empty values are ignored; unparsable numbers are
/// logged and ignored.
pub fn apply_env_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("PARLEY_TEMPLATE") {
        config.default_template = v;
    }
    if let Some(v) = get("PARLEY_MODEL") {
        config.default_model = Some(v);
    }
    if let Some(v) = get("PARLEY_SAVE_DIR") {
        config.save_dir = v;
    }
    if let Some(v) = get("PARLEY_SYSTEM_PROMPT") {
        config.default_system_prompt = v;
    }
    if let Some(v) = get("PARLEY_LOG") {
        config.log_level = v;
    }
    if let Some(v) = get("OPENAI_BASE_URL") {
        config.base_url = Some(v);
    }

    let discord = &mut config.discord;
    if let Some(v) = get("DISCORD_HOME_CHANNEL") {
        match v.trim().parse() {
            Ok(id) => discord.home_channel = Some(id),
            Err(err) => tracing::warn!(value = %v, error = %err, "ignoring DISCORD_HOME_CHANNEL"),
        }
    }
    if let Some(v) = get("DISCORD_PREFIX") {
        discord.prefix = v;
    }
    if let Some(v) = get("DISCORD_CHUNK_LEN") {
        match v.trim().parse() {
            Ok(len) => discord.chunk_len = len,
            Err(err) => tracing::warn!(value = %v, error = %err, "ignoring DISCORD_CHUNK_LEN"),
        }
    }
    if let Some(v) = get("DISCORD_SYSTEM_PROMPT") {
        discord.system_prompt = v;
    }
    if let Some(v) = get("DISCORD_REMINDER") {
        discord.reminder = Some(v);
    }
}

/// Credentials read from the environment. Never logged.
#[derive(Debug, Default)]
pub struct Secrets {
    pub openai_api_key: Option<SecretString>,
    pub discord_token: Option<SecretString>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secret = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from)
        };
        Self {
            openai_api_key: secret(OPENAI_API_KEY),
            discord_token: secret(DISCORD_BOT_TOKEN),
        }
    }

    pub fn openai_api_key(&self) -> Result<&SecretString, ConfigError> {
        self.openai_api_key
            .as_ref()
            .ok_or(ConfigError::MissingSecret(OPENAI_API_KEY))
    }

    pub fn discord_token(&self) -> Result<&SecretString, ConfigError> {
        self.discord_token
            .as_ref()
            .ok_or(ConfigError::MissingSecret(DISCORD_BOT_TOKEN))
    }
}

/// The stock templates plus any from `config.templates_file`, with the
/// configured default.
///
/// An unknown `default_template` is logged and the stock default kept.
pub async fn load_registry(config: &AppConfig) -> Result<TemplateRegistry, ConfigError> {
    let mut registry = TemplateRegistry::builtin();
    if let Some(path) = &config.templates_file {
        load_templates_file(&mut registry, Path::new(path)).await?;
    }
    if let Err(err) = registry.set_default(&config.default_template) {
        tracing::warn!(error = %err, "keeping stock default template");
    }
    Ok(registry)
}

/// Add every template in the JSON file at `path`. Returns how many were
/// added.
pub async fn load_templates_file(
    registry: &mut TemplateRegistry,
    path: &Path,
) -> Result<usize, ConfigError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
    let added = registry.add_json(&text)?;
    tracing::info!(path = %path.display(), added, "loaded templates");
    Ok(added)
}
