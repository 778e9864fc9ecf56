//! Interactive CLI chat for Parley.
//!
//! Streams replies as they arrive, shows a welcome banner and a thinking
//! spinner, and handles slash commands for saves, prompts, parameters and
//! budget inspection. Entry point: `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod renderer;
