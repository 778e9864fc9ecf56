//! Parley CLI entry point.
//!
//! Binary name: `parley`
//!
//! Parses CLI arguments, sets up tracing, loads configuration once, then
//! dispatches to the chat REPL, the listing commands, or the Discord relay.

mod cli;
mod discord;
mod state;

use clap::Parser;
use clap_complete::generate;
use parley_observe::tracing_setup::{
    bootstrap_subscriber, init_tracing, level_for, shutdown_tracing,
};
use parley_types::config::LogFormat;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "parley", &mut std::io::stdout());
        return Ok(());
    }

    // Config problems are warnings; show them before the real subscriber exists.
    let bootstrap = bootstrap_subscriber();
    let state = AppState::init(cli.config.as_deref()).await?;
    drop(bootstrap);

    let format = if cli.json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    let level = level_for(&state.config.log_level, cli.verbose, cli.quiet);
    init_tracing(format, &level, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    let result = match cli.command {
        Commands::Chat(args) => cli::chat::loop_runner::run_chat_loop(&state, args).await,
        Commands::Templates { tag } => cli::templates::list_templates(&state, tag.as_deref(), cli.json),
        Commands::Saves => cli::saves::list_saves(&state, cli.json).await,
        Commands::Discord => discord::run(&state).await,
        Commands::Completions { .. } => Ok(()),
    };

    shutdown_tracing();
    result
}
