//! Infrastructure layer for Parley.
//!
//! Implementations of the ports defined in `parley-core`: BPE token counting
//! via tiktoken, a JSON directory save store, the OpenAI completion provider,
//! and the configuration loader.

pub mod config;
pub mod llm;
pub mod store;
pub mod tokens;
