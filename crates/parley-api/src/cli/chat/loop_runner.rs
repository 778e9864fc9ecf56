//! Main chat loop orchestration.
//!
//! Builds the session from a template, resumes a save or the latest
//! autosave, prints the banner, then reads lines until Ctrl+D or `/exit`.
//! Plain lines go to the model; slash lines are commands.

use std::time::{Duration, Instant};

use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use parley_core::chat::buffer::ConversationBuffer;
use parley_core::chat::session::SessionError;
use parley_core::template::factory::SessionOverrides;
use parley_types::error::StoreError;
use parley_types::llm::Role;

use crate::cli::ChatArgs;
use crate::state::{AppState, Session};

use super::banner::{BannerInfo, print_welcome_banner};
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::renderer::{ChatRenderer, print_streaming_token};

/// Whether the loop keeps going after a command.
enum Flow {
    Continue,
    Exit,
}

/// Run the interactive chat loop.
pub async fn run_chat_loop(state: &AppState, args: ChatArgs) -> anyhow::Result<()> {
    let template = match &args.template {
        Some(name) => state
            .registry
            .get_strict(name)
            .with_context(|| format!("try one of: {}", state.registry.names().join(", ")))?,
        None => state.registry.default_template(),
    };
    let factory = state.factory()?;
    let mut session = factory.build(
        template,
        SessionOverrides {
            model: args.model.clone(),
            ..Default::default()
        },
    );

    let resumed = match &args.resume {
        Some(name) => {
            session
                .load(name)
                .await
                .with_context(|| format!("failed to load save '{name}'"))?;
            Some(name.clone())
        }
        None => match session.resume_autosave().await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(error = %err, "could not resume autosave");
                None
            }
        },
    };
    // A loaded record brings its own model; an explicit --model still wins.
    if let Some(model) = &args.model {
        if session.model() != model {
            session.set_model(model.clone());
        }
    }
    if args.no_stream {
        session.params_mut().stream = false;
    }

    let session_id = session.session_id().to_string();
    print_welcome_banner(&BannerInfo {
        template: &template.name,
        description: &template.info.description,
        model: session.model(),
        session_id: &session_id,
        usable_tokens: session.buffer().usable_tokens(),
        resumed_from: resumed.as_deref(),
    });
    if resumed.is_some() {
        print_history(&session, Some(4));
    }

    let renderer = ChatRenderer::new();
    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) =
        ChatInput::new(prompt).map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        match chat_input.read_line().await {
            InputEvent::Eof => break,
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
            }
            InputEvent::Message(text) if text.is_empty() => {}
            InputEvent::Message(text) => {
                if let Some(cmd) = commands::parse(&text) {
                    if let Flow::Exit = run_command(&mut session, cmd, &mut chat_input).await {
                        break;
                    }
                    continue;
                }
                send(&mut session, &renderer, &text).await;
            }
        }
    }

    println!("\n  {}", style("Session ended.").dim());
    Ok(())
}

fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("thinking...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Send one user line and print the reply.
async fn send(session: &mut Session, renderer: &ChatRenderer, text: &str) {
    let evictions_before = session.buffer().eviction_count();
    let spinner = thinking_spinner();
    let start = Instant::now();

    let result = if session.params().stream {
        let mut started = false;
        session
            .chat_stream(text, |delta| {
                if !started {
                    spinner.finish_and_clear();
                    started = true;
                    print!("\n  {} ", style("Parley").cyan().bold());
                }
                print_streaming_token(delta);
            })
            .await
    } else {
        let reply = session.chat(text).await;
        spinner.finish_and_clear();
        if let Ok(reply) = &reply {
            println!("\n{}", renderer.render_final(reply));
        }
        reply
    };
    spinner.finish_and_clear();

    match result {
        Ok(reply) => {
            let tokens = reply_tokens(session.buffer(), &reply);
            let response_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            println!();
            renderer.print_stats_footer(tokens, response_ms, session.model());
            let dropped = session.buffer().eviction_count() - evictions_before;
            if dropped > 0 {
                note(&format!("{dropped} older turn(s) dropped to stay within the budget"));
            }
            println!();
        }
        Err(err) => {
            error(&err.to_string());
            if matches!(err, SessionError::Llm(_)) && session.has_store() {
                note("An emergency save was attempted; see /saves.");
            }
            note("Type a message to retry, /exit to quit.");
        }
    }
}

/// Size of a reply under the session's model. The reply's own turn may
/// already be evicted, so it is counted directly.
fn reply_tokens(buffer: &ConversationBuffer, reply: &str) -> u32 {
    buffer.count(reply)
}

async fn run_command(session: &mut Session, cmd: ChatCommand, input: &mut ChatInput) -> Flow {
    match cmd {
        ChatCommand::Help => commands::print_help(),
        ChatCommand::Clear => input.clear(),
        ChatCommand::Exit => return Flow::Exit,
        ChatCommand::History(limit) => print_history(session, limit),
        ChatCommand::Reset { hard: false } => {
            session.reset();
            note("Conversation cleared.");
        }
        ChatCommand::Reset { hard: true } => match session.hard_reset().await {
            Ok(()) => note("Conversation cleared; autosaves backed up and removed."),
            Err(err) => error(&err.to_string()),
        },
        ChatCommand::Save { name, overwrite } => match session.save(&name, overwrite).await {
            Ok(()) => note(&format!("Saved as '{name}'.")),
            Err(SessionError::Store(StoreError::Exists(_))) => {
                error(&format!("'{name}' exists. Use /save {name} overwrite to replace it."));
            }
            Err(err) => error(&err.to_string()),
        },
        ChatCommand::Load(name) => match session.load(&name).await {
            Ok(()) => {
                note(&format!(
                    "Loaded '{name}': {} turns, model {}.",
                    session.buffer().len(),
                    session.model()
                ));
            }
            Err(err) => error(&err.to_string()),
        },
        ChatCommand::Saves => match session.saves().await {
            Ok(names) if names.is_empty() => note("No saves yet."),
            Ok(names) => {
                println!();
                for name in names {
                    println!("  {}", style(name).cyan());
                }
                println!();
            }
            Err(err) => error(&err.to_string()),
        },
        ChatCommand::Debug => {
            println!();
            for line in session.debug_report().lines() {
                println!("  {line}");
            }
            println!();
        }
        ChatCommand::Budget => print_budget(session),
        ChatCommand::Params => {
            println!();
            for line in session.params().describe() {
                println!("  {line}");
            }
            println!();
        }
        ChatCommand::Set { param, value } => match session.params_mut().set(&param, &value) {
            Ok(()) => note(&format!("{param} set.")),
            Err(err) => error(&err.to_string()),
        },
        ChatCommand::Model(model) => {
            let evicted = session.set_model(model);
            note(&format!("Now using {}.", session.model()));
            report_evicted(evicted);
        }
        ChatCommand::System(text) => {
            let cleared = text.is_none();
            let evicted = session.set_system_prompt(text);
            note(if cleared { "System prompt cleared." } else { "System prompt set." });
            report_evicted(evicted);
        }
        ChatCommand::Reminder(text) => {
            let cleared = text.is_none();
            let evicted = session.set_reminder(text);
            note(if cleared { "Reminder cleared." } else { "Reminder set." });
            report_evicted(evicted);
        }
        ChatCommand::Usage(usage) => error(&format!("usage: {usage}")),
        ChatCommand::Unknown(name) => {
            println!(
                "\n  {} Unknown command: {}. Type /help for available commands.\n",
                style("?").yellow().bold(),
                style(name).dim()
            );
        }
    }
    Flow::Continue
}

fn print_history(session: &Session, limit: Option<usize>) {
    let mut turns = session.history(None, limit, true);
    turns.reverse();
    println!();
    if turns.is_empty() {
        println!("  {}", style("(no turns yet)").dim());
    }
    for turn in turns {
        let label = match turn.role() {
            Role::User => style("You").green(),
            Role::Assistant => style("Parley").cyan(),
            Role::System => style("System").yellow(),
        };
        println!(
            "  {} {} {}",
            label.bold(),
            turn.preview(100),
            style(format!("({} tokens)", turn.token_count())).dim()
        );
    }
    println!();
}

fn print_budget(session: &Session) {
    let buffer = session.buffer();
    let budget = buffer.budget();
    let max_turns = budget
        .max_turns
        .map_or_else(|| "unlimited".to_string(), |n| n.to_string());
    let rows = [
        ("ceiling", budget.ceiling.to_string()),
        ("reserved for reply", budget.reserved_completion.to_string()),
        ("padding", budget.pad.to_string()),
        ("prompt overhead", buffer.overhead_tokens().to_string()),
        ("usable for history", buffer.usable_tokens().to_string()),
        ("history in use", buffer.total_tokens().to_string()),
        ("turns", format!("{} / {max_turns}", buffer.len())),
        ("evictions", buffer.eviction_count().to_string()),
    ];
    println!();
    for (label, value) in rows {
        println!("  {}  {}", style(format!("{label:<18}")).bold(), value);
    }
    println!();
}

fn report_evicted(evicted: usize) {
    if evicted > 0 {
        note(&format!("{evicted} older turn(s) dropped to fit the new budget."));
    }
}

fn note(message: &str) {
    println!("  {}", style(message).dim());
}

fn error(message: &str) {
    eprintln!("\n  {} {message}", style("!").red().bold());
}
