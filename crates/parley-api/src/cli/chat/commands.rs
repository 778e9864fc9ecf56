//! Slash command parsing for the chat loop.
//!
//! Commands start with `/` and control the session: saves, prompts,
//! sampling parameters, and budget inspection.

use console::style;
use parley_types::params::parse_bool;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Clear the terminal screen.
    Clear,
    /// Exit the chat session.
    Exit,
    /// Show the last `n` turns (all when `None`).
    History(Option<usize>),
    /// Clear the conversation; `hard` also backs up and clears autosaves.
    Reset { hard: bool },
    Save { name: String, overwrite: bool },
    Load(String),
    /// List saved sessions.
    Saves,
    /// Print session diagnostics.
    Debug,
    /// Print the token budget.
    Budget,
    /// Print the sampling parameters.
    Params,
    Set { param: String, value: String },
    Model(String),
    /// Replace the system prompt, or clear it when `None`.
    System(Option<String>),
    /// Replace the reminder, or clear it when `None`.
    Reminder(Option<String>),
    /// A known command with bad arguments; holds the usage line.
    Usage(&'static str),
    /// Unknown command.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (cmd, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (trimmed, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();
    let text = (!rest.is_empty()).then(|| rest.to_string());

    let command = match cmd.to_lowercase().as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/clear" | "/cls" => ChatCommand::Clear,
        "/exit" | "/quit" | "/q" => ChatCommand::Exit,
        "/history" => match args.as_slice() {
            [] => ChatCommand::History(None),
            [n] => match n.parse() {
                Ok(n) => ChatCommand::History(Some(n)),
                Err(_) => ChatCommand::Usage("/history [n]"),
            },
            _ => ChatCommand::Usage("/history [n]"),
        },
        "/reset" => match args.as_slice() {
            [] => ChatCommand::Reset { hard: false },
            ["hard"] => ChatCommand::Reset { hard: true },
            _ => ChatCommand::Usage("/reset [hard]"),
        },
        "/save" => match args.as_slice() {
            [name] => ChatCommand::Save {
                name: name.to_string(),
                overwrite: false,
            },
            [name, flag] => ChatCommand::Save {
                name: name.to_string(),
                overwrite: parse_bool(flag).unwrap_or(false),
            },
            _ => ChatCommand::Usage("/save <name> [overwrite]"),
        },
        "/load" => match args.as_slice() {
            [name] => ChatCommand::Load(name.to_string()),
            _ => ChatCommand::Usage("/load <name>"),
        },
        "/saves" => ChatCommand::Saves,
        "/debug" => ChatCommand::Debug,
        "/budget" => ChatCommand::Budget,
        "/params" => ChatCommand::Params,
        "/set" => match args.as_slice() {
            [param, value] => ChatCommand::Set {
                param: param.to_string(),
                value: value.to_string(),
            },
            _ => ChatCommand::Usage("/set <param> <value>"),
        },
        "/model" => match args.as_slice() {
            [model] => ChatCommand::Model(model.to_string()),
            _ => ChatCommand::Usage("/model <id>"),
        },
        "/system" => ChatCommand::System(text),
        "/reminder" => ChatCommand::Reminder(text),
        other => ChatCommand::Unknown(other.to_string()),
    };
    Some(command)
}

const HELP: &[(&str, &str)] = &[
    ("/help", "Show this help message"),
    ("/clear", "Clear the screen"),
    ("/exit", "End the chat session"),
    ("/history [n]", "Show the last n turns"),
    ("/reset [hard]", "Forget the conversation (hard: also clear autosaves)"),
    ("/save <name> [overwrite]", "Save the session"),
    ("/load <name>", "Load a saved session"),
    ("/saves", "List saved sessions"),
    ("/debug", "Show session diagnostics"),
    ("/budget", "Show the token budget"),
    ("/params", "Show sampling parameters"),
    ("/set <param> <value>", "Set a sampling parameter (none to unset)"),
    ("/model <id>", "Switch models"),
    ("/system [text]", "Set or clear the system prompt"),
    ("/reminder [text]", "Set or clear the reminder"),
];

/// Print the help text listing all available commands.
pub fn print_help() {
    let width = HELP.iter().map(|(cmd, _)| cmd.len()).max().unwrap_or(0);
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    for (cmd, description) in HELP {
        println!("  {}  {}", style(format!("{cmd:<width$}")).cyan(), description);
    }
    println!();
    println!(
        "  {}",
        style("Wildcards in prompts: ||model||, ||date||, ||time||, ||cut_off||").dim()
    );
    println!("  {}", style("Ctrl+D to exit").dim());
    println!();
}
