//! Conversation state and the session built on top of it.
//!
//! - [`buffer::ConversationBuffer`]: token- and turn-bounded history
//! - [`budget`]: the usable-token computation that drives eviction
//! - [`composer`]: request payload assembly
//! - [`prompt`]: system prompt and reminder templating
//! - [`session::ChatSession`]: the facade the CLI and the bot drive

pub mod autosave;
pub mod budget;
pub mod buffer;
pub mod composer;
pub mod prompt;
pub mod session;
pub mod store;
pub mod turn;
