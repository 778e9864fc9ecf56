//! Completion provider implementations.
//!
//! Concrete implementations of the [`LlmProvider`](parley_core::llm::provider::LlmProvider)
//! trait defined in `parley-core`.

pub mod openai;
