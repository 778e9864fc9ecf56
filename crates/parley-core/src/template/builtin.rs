//! Stock templates.

use parley_types::template::{BufferTemplate, CompletionTemplate, Template, TemplateInfo};

/// Name of the template used when a lookup misses.
pub const DEFAULT_TEMPLATE: &str = "gpt-4_default";

struct Stock {
    name: &'static str,
    id: u32,
    model: &'static str,
    description: &'static str,
    tags: &'static [&'static str],
    ceiling: u32,
    pad: u32,
    reserved: u32,
    max_turns: usize,
    temperature: f32,
}

const STOCK: &[Stock] = &[
    Stock {
        name: "gpt-4_default",
        id: 1,
        model: "gpt-4",
        description: "The default configuration for the gpt-4 model",
        tags: &["gpt-4", "default", "chat"],
        ceiling: 8_000,
        pad: 500,
        reserved: 1_000,
        max_turns: 200,
        temperature: 0.7,
    },
    Stock {
        name: "gpt-4_creative",
        id: 2,
        model: "gpt-4",
        description: "Creative mode for the gpt-4 model",
        tags: &["gpt-4", "creative", "chat", "high temperature"],
        ceiling: 8_000,
        pad: 500,
        reserved: 1_000,
        max_turns: 200,
        temperature: 1.0,
    },
    Stock {
        name: "gpt-4_small",
        id: 3,
        model: "gpt-4",
        description: "A small configuration for the gpt-4 model, to save on per-token costs",
        tags: &["gpt-4", "small", "chat", "low cost"],
        ceiling: 4_000,
        pad: 100,
        reserved: 500,
        max_turns: 100,
        temperature: 0.7,
    },
    Stock {
        name: "gpt-4_precise",
        id: 4,
        model: "gpt-4",
        description: "A low temperature configuration for the gpt-4 model",
        tags: &["gpt-4", "precise", "chat", "low temp", "conservative"],
        ceiling: 8_000,
        pad: 500,
        reserved: 1_000,
        max_turns: 200,
        temperature: 0.1,
    },
    Stock {
        name: "gpt-3.5-16k_default",
        id: 5,
        model: "gpt-3.5-turbo-16k",
        description: "The default configuration for the gpt-3.5-turbo-16k model",
        tags: &["gpt-3.5-16k", "default", "chat"],
        ceiling: 16_000,
        pad: 500,
        reserved: 2_000,
        max_turns: 500,
        temperature: 0.7,
    },
    Stock {
        name: "gpt-3.5-16k_creative",
        id: 6,
        model: "gpt-3.5-turbo-16k",
        description: "Creative mode for the gpt-3.5-turbo-16k model",
        tags: &["gpt-3.5-16k", "creative", "chat", "high temperature"],
        ceiling: 16_000,
        pad: 500,
        reserved: 2_000,
        max_turns: 500,
        temperature: 1.0,
    },
    Stock {
        name: "gpt-3.5-16k_precise",
        id: 7,
        model: "gpt-3.5-turbo-16k",
        description: "A low temperature configuration for the gpt-3.5-turbo-16k model",
        tags: &["gpt-3.5-16k", "precise", "chat", "low temp", "conservative"],
        ceiling: 16_000,
        pad: 500,
        reserved: 2_000,
        max_turns: 500,
        temperature: 0.1,
    },
];

/// The seven stock templates, ordered by id.
pub fn builtin_templates() -> Vec<Template> {
    STOCK
        .iter()
        .map(|s| Template {
            name: s.name.to_string(),
            id: s.id,
            model: s.model.to_string(),
            info: TemplateInfo {
                description: s.description.to_string(),
                tags: s.tags.iter().map(|t| t.to_string()).collect(),
            },
            buffer: BufferTemplate {
                model: s.model.to_string(),
                ceiling: Some(s.ceiling),
                pad: Some(s.pad),
                reserved_completion: Some(s.reserved),
                max_turns: Some(s.max_turns),
                reminder: None,
            },
            completion: CompletionTemplate {
                model: s.model.to_string(),
                max_tokens: Some(s.reserved),
                temperature: Some(s.temperature),
                top_p: None,
                presence_penalty: None,
                frequency_penalty: None,
            },
        })
        .collect()
}
