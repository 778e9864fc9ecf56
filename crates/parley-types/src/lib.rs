//! Shared domain types for Parley.
//!
//! This crate contains the data shapes used across the workspace: message
//! roles, budget parameters, the persisted session record, completion
//! request/response types, model parameters, templates, configuration, and
//! their error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod budget;
pub mod config;
pub mod error;
pub mod llm;
pub mod params;
pub mod record;
pub mod template;
