//! Welcome banner display for chat sessions.

use console::style;

/// What the banner shows about the session being started.
pub struct BannerInfo<'a> {
    pub template: &'a str,
    pub description: &'a str,
    pub model: &'a str,
    pub session_id: &'a str,
    pub usable_tokens: u32,
    pub resumed_from: Option<&'a str>,
}

/// Print the welcome banner at the start of a chat session.
pub fn print_welcome_banner(info: &BannerInfo<'_>) {
    println!();
    println!("  {} {}", style("Parley").cyan().bold(), style(info.template).bold());
    if !info.description.is_empty() {
        println!("  {}", style(info.description).dim());
    }
    println!();
    println!("  {}    {}", style("Model:").bold(), style(info.model).dim());
    println!(
        "  {}  {}",
        style("Session:").bold(),
        style(&info.session_id[..8.min(info.session_id.len())]).dim()
    );
    println!(
        "  {}   {}",
        style("Budget:").bold(),
        style(format!("{} tokens of history", info.usable_tokens)).dim()
    );
    if let Some(name) = info.resumed_from {
        println!("  {}  {}", style("Resumed:").bold(), style(name).dim());
    }
    println!();
    println!("  {}", style("Type /help for commands, Ctrl+D to exit").dim());
    println!("  {}", style("---").dim());
    println!();
}
