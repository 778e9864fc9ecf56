//! CLI command definitions for the `parley` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod chat;
pub mod saves;
pub mod templates;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Chat with a language model under a fixed token budget.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for info, -vv for debug, -vvv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config.toml (default: the platform config dir).
    #[arg(long, global = true, env = "PARLEY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit spans to stdout through OpenTelemetry.
    #[arg(long, global = true, hide = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat.
    Chat(ChatArgs),

    /// List the available templates.
    #[command(alias = "ls")]
    Templates {
        /// Only show templates with this tag.
        #[arg(long)]
        tag: Option<String>,
    },

    /// List saved sessions.
    Saves,

    /// Run the Discord relay bot.
    Discord,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct ChatArgs {
    /// Template to start from (default: the configured one).
    #[arg(short, long)]
    pub template: Option<String>,

    /// Model to use instead of the template's.
    #[arg(short, long)]
    pub model: Option<String>,

    /// Load this save instead of resuming the latest autosave.
    #[arg(long)]
    pub resume: Option<String>,

    /// Wait for the full reply instead of streaming it.
    #[arg(long)]
    pub no_stream: bool,
}
