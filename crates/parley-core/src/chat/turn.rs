//! A single counted conversation turn.

use parley_types::llm::{Message, Role};

use crate::tokens::TokenCounter;

/// One message in the conversation plus its token count.
///
/// Fields are private so a turn cannot be edited after it is counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
    token_count: u32,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>, token_count: u32) -> Self {
        Self {
            role,
            content: content.into(),
            token_count,
        }
    }

    /// Build a turn, counting its content with `counter` for `model`.
    pub fn counted(
        role: Role,
        content: impl Into<String>,
        model: &str,
        counter: &dyn TokenCounter,
    ) -> Self {
        let content = content.into();
        let token_count = counter.count(model, &content);
        Self {
            role,
            content,
            token_count,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn token_count(&self) -> u32 {
        self.token_count
    }

    /// The wire form: role and content only.
    pub fn to_message(&self) -> Message {
        Message::new(self.role, self.content.clone())
    }

    /// Recount this turn for a different model.
    pub(crate) fn recounted(&self, model: &str, counter: &dyn TokenCounter) -> Self {
        Self::counted(self.role, self.content.clone(), model, counter)
    }

    /// First `max_chars` characters of the content, with an ellipsis if cut.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.content.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}
