//! `parley saves`: list saved sessions with a short summary of each.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use parley_core::chat::store::SaveStore;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct SaveSummary {
    name: String,
    model: String,
    turns: usize,
    tokens: u32,
    saved_at: Option<DateTime<Utc>>,
}

pub async fn list_saves(state: &AppState, json: bool) -> Result<()> {
    let names = state
        .store
        .names()
        .await
        .with_context(|| format!("failed to list saves in {}", state.store.dir().display()))?;

    let mut summaries = Vec::with_capacity(names.len());
    for name in names {
        match state.store.read(&name).await {
            Ok(record) => summaries.push(SaveSummary {
                tokens: record
                    .turns
                    .iter()
                    .map(|m| state.counter.count(&record.model, &m.content))
                    .sum(),
                turns: record.turns.len(),
                model: record.model,
                saved_at: record.saved_at,
                name,
            }),
            // One broken file shouldn't hide the rest.
            Err(err) => tracing::warn!(name = %name, error = %err, "skipping unreadable save"),
        }
    }

    if json {
        let result = serde_json::json!({
            "dir": state.store.dir(),
            "saves": summaries,
            "count": summaries.len(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!();
        println!("  {} No saves yet.", style("i").blue().bold());
        println!("     Save one from a chat with: /save <name>");
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Name").fg(Color::White),
        Cell::new("Model").fg(Color::White),
        Cell::new("Turns").fg(Color::White),
        Cell::new("Tokens").fg(Color::White),
        Cell::new("Saved").fg(Color::White),
    ]);
    for summary in &summaries {
        let saved = summary
            .saved_at
            .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string());
        table.add_row(vec![
            Cell::new(&summary.name).fg(Color::Cyan),
            Cell::new(&summary.model),
            Cell::new(summary.turns),
            Cell::new(summary.tokens),
            Cell::new(saved).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!(
        "  Saves in {} ({} entries)",
        style(state.store.dir().display()).cyan(),
        summaries.len()
    );
    println!();
    println!("{table}");
    println!();
    Ok(())
}
