//! Completion provider abstractions for Parley.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `retry`: bounded retry with a fixed delay around provider calls

pub mod provider;
pub mod retry;

#[cfg(test)]
pub(crate) mod mock;
