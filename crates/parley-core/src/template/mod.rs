//! Session templates.
//!
//! A template names a budget and a set of sampling parameters. The registry
//! holds the stock templates plus any loaded from a file; the factory turns
//! a template into a ready-to-use [`ChatSession`](crate::chat::session::ChatSession).

pub mod builtin;
pub mod factory;
pub mod registry;
