//! Terminal output for replies.
//!
//! Streamed tokens are printed raw as they arrive. Complete replies (the
//! `--no-stream` path) are rendered as markdown through `termimad`.

use std::io::Write;

use termimad::MadSkin;
use termimad::crossterm::style::Color;

pub struct ChatRenderer {
    skin: MadSkin,
}

impl ChatRenderer {
    pub fn new() -> Self {
        let mut skin = MadSkin::default_dark();
        skin.bold.set_fg(Color::Cyan);
        skin.headers[0].set_fg(Color::Cyan);
        skin.headers[1].set_fg(Color::Cyan);
        skin.inline_code.set_fg(Color::Yellow);
        Self { skin }
    }

    /// Render a complete markdown reply.
    pub fn render_final(&self, markdown: &str) -> String {
        self.skin.term_text(markdown).to_string()
    }

    /// Print the footer after a reply: "| {tokens} tokens . {time}s . {model}".
    pub fn print_stats_footer(&self, tokens: u32, response_ms: u64, model: &str) {
        let seconds = response_ms as f64 / 1000.0;
        println!(
            "\n  {} {} tokens {} {:.1}s {} {}",
            console::style("|").dim(),
            console::style(tokens).dim(),
            console::style("\u{00b7}").dim(),
            console::style(seconds).dim(),
            console::style("\u{00b7}").dim(),
            console::style(model).dim(),
        );
    }
}

impl Default for ChatRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Print a single streaming token (raw, no formatting).
pub fn print_streaming_token(token: &str) {
    print!("{token}");
    let _ = std::io::stdout().flush();
}
