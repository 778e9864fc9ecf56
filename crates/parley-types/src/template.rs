//! Session templates.
//!
//! A template bundles a buffer budget and completion parameters under a
//! name. The JSON form also accepts the older `trim_object` /
//! `chat_completion_wrapper` keys so existing template files keep loading.

use serde::{Deserialize, Serialize};

use crate::budget::{
    BudgetParams, DEFAULT_CEILING, DEFAULT_MAX_TURNS, DEFAULT_PAD, DEFAULT_RESERVED_COMPLETION,
};
use crate::error::TemplateError;
use crate::params::ModelParameters;

/// Human-facing description of a template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Buffer section of a template. Unset fields take the budget defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferTemplate {
    pub model: String,
    #[serde(default, alias = "max_tokens", skip_serializing_if = "Option::is_none")]
    pub ceiling: Option<u32>,
    #[serde(default, alias = "token_padding", skip_serializing_if = "Option::is_none")]
    pub pad: Option<u32>,
    #[serde(
        default,
        alias = "max_completion_tokens",
        skip_serializing_if = "Option::is_none"
    )]
    pub reserved_completion: Option<u32>,
    #[serde(default, alias = "max_messages", skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<String>,
}

impl BufferTemplate {
    pub fn budget(&self) -> BudgetParams {
        BudgetParams {
            ceiling: self.ceiling.unwrap_or(DEFAULT_CEILING),
            reserved_completion: self
                .reserved_completion
                .unwrap_or(DEFAULT_RESERVED_COMPLETION),
            pad: self.pad.unwrap_or(DEFAULT_PAD),
            max_turns: Some(self.max_turns.unwrap_or(DEFAULT_MAX_TURNS)),
        }
    }
}

/// Completion section of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionTemplate {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
}

impl CompletionTemplate {
    pub fn params(&self) -> ModelParameters {
        ModelParameters {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            presence_penalty: self.presence_penalty,
            frequency_penalty: self.frequency_penalty,
            stream: false,
        }
    }
}

/// A named session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub id: u32,
    pub model: String,
    pub info: TemplateInfo,
    #[serde(alias = "trim_object")]
    pub buffer: BufferTemplate,
    #[serde(alias = "chat_completion_wrapper")]
    pub completion: CompletionTemplate,
}

impl Template {
    /// Reject templates whose sampling values are out of range or whose
    /// budget leaves no room at all.
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.name.trim().is_empty() {
            return Err(TemplateError::Invalid("template name is empty".to_string()));
        }
        self.completion
            .params()
            .validate()
            .map_err(|e| TemplateError::Invalid(format!("{}: {e}", self.name)))?;
        if self.buffer.max_turns == Some(0) {
            return Err(TemplateError::Invalid(format!(
                "{}: max_turns must be at least 1",
                self.name
            )));
        }
        Ok(())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.info.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}
