//! System prompt and reminder templating.
//!
//! Both are stored raw and expanded at send time. Wildcards are written as
//! `||name||`:
//!
//! | wildcard      | expands to                         |
//! |---------------|------------------------------------|
//! | `||model||`   | the model id                       |
//! | `||date||`    | local date, e.g. `March 04, 2024`  |
//! | `||time||`    | local time, `HH:MM:SS`             |
//! | `||cut_off||` | the training data cut-off          |
//!
//! Token costs include a fixed padding because expansion can make the text
//! longer than what was counted.

use chrono::NaiveDateTime;
use parley_types::llm::Role;

use super::turn::Turn;
use crate::tokens::TokenCounter;

/// Training data cut-off substituted for `||cut_off||`.
pub const CUT_OFF: &str = "September 21, 2021";

/// Padding added to the system prompt's token count.
pub const SYSTEM_PROMPT_PADDING: u32 = 20;

/// Default reminder prefix.
pub const REMINDER_PREPEND: &str = "System Reminder: ";

/// Default padding added to the reminder's token count.
pub const REMINDER_PADDING: u32 = 10;

/// Every wildcard with a short description, for help output.
pub const WILDCARDS: &[(&str, &str)] = &[
    ("||model||", "the model id"),
    ("||date||", "the current date"),
    ("||time||", "the current time"),
    ("||cut_off||", "the training data cut-off"),
];

/// Replace every wildcard in `text`.
pub fn expand_wildcards(text: &str, model: &str, now: NaiveDateTime) -> String {
    if !text.contains("||") {
        return text.to_string();
    }
    text.replace("||model||", model)
        .replace("||date||", &now.format("%B %d, %Y").to_string())
        .replace("||time||", &now.format("%H:%M:%S").to_string())
        .replace("||cut_off||", CUT_OFF)
}

/// A system prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPrompt {
    raw: String,
}

impl SystemPrompt {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The template as written, wildcards unexpanded.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn render(&self, model: &str, now: NaiveDateTime) -> String {
        expand_wildcards(&self.raw, model, now)
    }

    /// Tokens reserved for this prompt: the raw count plus padding.
    pub fn token_cost(&self, counter: &dyn TokenCounter, model: &str) -> u32 {
        counter
            .count(model, &self.raw)
            .saturating_add(SYSTEM_PROMPT_PADDING)
    }

    /// The rendered prompt as a system turn.
    pub fn turn(&self, counter: &dyn TokenCounter, model: &str, now: NaiveDateTime) -> Turn {
        Turn::counted(Role::System, self.render(model, now), model, counter)
    }
}

/// A reminder appended after the conversation on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    raw: String,
    prepend: String,
    padding: u32,
}

impl Reminder {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            prepend: REMINDER_PREPEND.to_string(),
            padding: REMINDER_PADDING,
        }
    }

    pub fn with_prepend(mut self, prepend: impl Into<String>) -> Self {
        self.prepend = prepend.into();
        self
    }

    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn render(&self, model: &str, now: NaiveDateTime) -> String {
        format!("{}{}", self.prepend, expand_wildcards(&self.raw, model, now))
    }

    /// Tokens reserved for this reminder: the rendered count plus padding.
    pub fn token_cost(&self, counter: &dyn TokenCounter, model: &str, now: NaiveDateTime) -> u32 {
        counter
            .count(model, &self.render(model, now))
            .saturating_add(self.padding)
    }

    pub fn turn(&self, counter: &dyn TokenCounter, model: &str, now: NaiveDateTime) -> Turn {
        Turn::counted(Role::System, self.render(model, now), model, counter)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::tokens::testing::CharCounter;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(12, 5, 9)
            .unwrap()
    }

    #[test]
    fn test_expand_all_wildcards() {
        let text = "m=||model|| d=||date|| t=||time|| c=||cut_off||";
        assert_eq!(
            expand_wildcards(text, "gpt-4", noon()),
            "m=gpt-4 d=March 04, 2024 t=12:05:09 c=September 21, 2021"
        );
    }

    #[test]
    fn test_unknown_wildcard_left_alone() {
        assert_eq!(expand_wildcards("||weather||", "gpt-4", noon()), "||weather||");
    }

    #[test]
    fn test_system_prompt_cost_uses_raw_plus_padding() {
        let prompt = SystemPrompt::new("You are ||model||.");
        assert_eq!(prompt.token_cost(&CharCounter, "gpt-4"), 18 + 20);
    }

    #[test]
    fn test_system_prompt_turn_is_rendered() {
        let prompt = SystemPrompt::new("You are ||model||.");
        let turn = prompt.turn(&CharCounter, "gpt-4", noon());
        assert_eq!(turn.role(), Role::System);
        assert_eq!(turn.content(), "You are gpt-4.");
    }

    #[test]
    fn test_reminder_render_and_cost() {
        let reminder = Reminder::new("be brief");
        assert_eq!(reminder.render("gpt-4", noon()), "System Reminder: be brief");
        assert_eq!(reminder.token_cost(&CharCounter, "gpt-4", noon()), 25 + 10);

        let custom = Reminder::new("x").with_prepend("").with_padding(0);
        assert_eq!(custom.token_cost(&CharCounter, "gpt-4", noon()), 1);
    }
}
