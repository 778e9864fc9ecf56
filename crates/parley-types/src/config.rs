//! Application configuration types for Parley.
//!
//! `AppConfig` is the top-level `config.toml`. It is built once at startup and
//! passed down explicitly; nothing reads configuration from a global. Secrets
//! (API key, bot token) are not part of this struct: they come from the
//! environment and are held separately by the loader.

use serde::{Deserialize, Serialize};

/// Default system prompt. Wildcards are expanded at send time.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are being run in Parley, a command line chat client. \
Your model is ||model||. The date is ||date||, and the time is ||time||. \
Your training data was last updated ||cut_off||.";

/// Default system prompt for the Discord relay.
pub const DEFAULT_DISCORD_SYSTEM_PROMPT: &str = "You are a member of a Discord server, chatting \
casually with the people in this channel. Keep replies short and conversational. \
Your model is ||model||. The date is ||date||, and the time is ||time||.";

/// Top-level configuration. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Template used when none is named on the command line.
    #[serde(default = "default_template")]
    pub default_template: String,

    /// Model that overrides the template's own, unless the command line
    /// names one.
    #[serde(default)]
    pub default_model: Option<String>,

    /// Directory holding saved sessions.
    #[serde(default = "default_save_dir")]
    pub save_dir: String,

    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,

    /// Optional base URL for an OpenAI-compatible endpoint.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Path of a JSON file with extra templates.
    #[serde(default)]
    pub templates_file: Option<String>,

    #[serde(default)]
    pub autosave: AutosaveConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Level used when neither `RUST_LOG` nor `-v` says otherwise.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub discord: DiscordConfig,
}

fn default_template() -> String {
    "gpt-4_default".to_string()
}

fn default_save_dir() -> String {
    "./files/saves/".to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_template: default_template(),
            default_model: None,
            save_dir: default_save_dir(),
            default_system_prompt: default_system_prompt(),
            base_url: None,
            templates_file: None,
            autosave: AutosaveConfig::default(),
            retry: RetryConfig::default(),
            log_level: default_log_level(),
            discord: DiscordConfig::default(),
        }
    }
}

/// Rotating autosave settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutosaveConfig {
    /// Save every `frequency` turns. Zero disables autosave.
    #[serde(default = "default_autosave_frequency")]
    pub frequency: u32,

    /// Number of rotating slots.
    #[serde(default = "default_autosave_slots")]
    pub slots: u32,

    /// Slot name prefix; slots are `{name}_{i}`.
    #[serde(default = "default_autosave_name")]
    pub name: String,
}

fn default_autosave_frequency() -> u32 {
    5
}

fn default_autosave_slots() -> u32 {
    3
}

fn default_autosave_name() -> String {
    "auto_save".to_string()
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            frequency: default_autosave_frequency(),
            slots: default_autosave_slots(),
            name: default_autosave_name(),
        }
    }
}

/// Completion retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_attempts")]
    pub attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub delay_secs: u64,
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_retry_attempts(),
            delay_secs: default_retry_delay(),
        }
    }
}

/// Discord relay settings. The bot token is read from the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// The only channel the bot listens and replies in.
    #[serde(default)]
    pub home_channel: Option<u64>,

    /// Messages starting with this prefix are ignored.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Send accumulated reply text once it reaches this many characters.
    #[serde(default = "default_chunk_len")]
    pub chunk_len: usize,

    #[serde(default = "default_discord_system_prompt")]
    pub system_prompt: String,

    #[serde(default)]
    pub reminder: Option<String>,

    /// Template for the relay's sessions; falls back to `default_template`.
    #[serde(default)]
    pub template: Option<String>,
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_chunk_len() -> usize {
    300
}

fn default_discord_system_prompt() -> String {
    DEFAULT_DISCORD_SYSTEM_PROMPT.to_string()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            home_channel: None,
            prefix: default_prefix(),
            chunk_len: default_chunk_len(),
            system_prompt: default_discord_system_prompt(),
            reminder: None,
            template: None,
        }
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
