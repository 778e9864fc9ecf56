//! Observability setup for Parley: the tracing subscriber and optional
//! OpenTelemetry export.

pub mod tracing_setup;
