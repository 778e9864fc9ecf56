//! Conversation logic for Parley.
//!
//! This crate holds the bounded conversation buffer and the budget policy
//! that drives its eviction, the request composer, prompt templating, the
//! chat session facade, and the "ports" (provider and save-store traits)
//! that the infrastructure layer implements. It depends only on
//! `parley-types` -- never on `parley-infra` or any network/IO crate.

pub mod chat;
pub mod llm;
pub mod template;
pub mod tokens;
