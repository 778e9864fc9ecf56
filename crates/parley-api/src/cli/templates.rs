//! `parley templates`: list the loaded conversation templates.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use parley_types::template::Template;

use crate::state::AppState;

/// Print every template, or only those carrying `tag`.
pub fn list_templates(state: &AppState, tag: Option<&str>, json: bool) -> Result<()> {
    let default_name = state.registry.default_template().name.as_str();
    let templates: Vec<&Template> = state
        .registry
        .sorted()
        .into_iter()
        .filter(|t| tag.is_none_or(|tag| t.has_tag(tag)))
        .collect();

    if json {
        let result = serde_json::json!({
            "default": default_name,
            "templates": templates,
            "count": templates.len(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if templates.is_empty() {
        println!();
        match tag {
            Some(tag) => println!(
                "  {} No templates tagged '{}'.",
                style("i").blue().bold(),
                style(tag).cyan()
            ),
            None => println!("  {} No templates loaded.", style("i").blue().bold()),
        }
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Name").fg(Color::White),
        Cell::new("Model").fg(Color::White),
        Cell::new("Ceiling").fg(Color::White),
        Cell::new("Reserved").fg(Color::White),
        Cell::new("Pad").fg(Color::White),
        Cell::new("Max turns").fg(Color::White),
        Cell::new("Tags").fg(Color::White),
        Cell::new("Description").fg(Color::White),
    ]);

    for template in &templates {
        let budget = template.buffer.budget();
        let name = if template.name == default_name {
            format!("{} *", template.name)
        } else {
            template.name.clone()
        };
        let max_turns = budget
            .max_turns
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        table.add_row(vec![
            Cell::new(name).fg(Color::Cyan),
            Cell::new(&template.model),
            Cell::new(budget.ceiling),
            Cell::new(budget.reserved_completion),
            Cell::new(budget.pad),
            Cell::new(max_turns),
            Cell::new(template.info.tags.join(", ")).fg(Color::DarkGrey),
            Cell::new(&template.info.description),
        ]);
    }

    println!();
    println!("{table}");
    println!("  {}", style("* default template").dim());
    println!();
    Ok(())
}
