//! Tracing subscriber initialization with structured logging and optional
//! OpenTelemetry trace export.
//!
//! # Usage
//!
//! ```no_run
//! use parley_types::config::LogFormat;
//!
//! // Pretty logs at `warn` unless RUST_LOG says otherwise
//! parley_observe::tracing_setup::init_tracing(LogFormat::Pretty, "warn", false).unwrap();
//! ```

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use parley_types::config::LogFormat;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

/// Stores the OTel tracer provider so it can be shut down cleanly on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Initialize the global tracing subscriber.
///
/// - Filters with `RUST_LOG` when set, otherwise with `default_level` (a
///   level such as `"info"` or a full directive like `"parley_core=debug"`).
/// - Writes to stderr, pretty or as JSON lines, so log output never mixes
///   with chat output on stdout.
/// - When `enable_otel` is true, additionally bridges tracing spans to
///   OpenTelemetry using a stdout exporter.
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set or if
/// `default_level` is not a valid filter directive.
pub fn init_tracing(
    format: LogFormat,
    default_level: &str,
    enable_otel: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives)?,
        _ => EnvFilter::try_new(default_level)?,
    };

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .boxed(),
    };

    if enable_otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("parley");
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(otel_layer)
            .with(env_filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(env_filter)
            .try_init()?;
    }

    Ok(())
}

/// A warn-level stderr subscriber for the current thread, used while the
/// configuration that decides the real filter is still loading.
///
/// Drop the guard before calling [`init_tracing`].
pub fn bootstrap_subscriber() -> tracing::subscriber::DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::WARN)
        .with_target(false)
        .finish();
    tracing::subscriber::set_default(subscriber)
}

/// Map `-v` / `--quiet` to a default filter level.
///
/// `quiet` wins; otherwise each `-v` raises `base` one step.
pub fn level_for(base: &str, verbose: u8, quiet: bool) -> String {
    if quiet {
        return "error".to_string();
    }
    const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    let start = LEVELS
        .iter()
        .position(|l| l.eq_ignore_ascii_case(base.trim()));
    match start {
        Some(start) => {
            let index = (start + usize::from(verbose)).min(LEVELS.len() - 1);
            LEVELS[index].to_string()
        }
        // Custom directives pass through untouched.
        None => base.to_string(),
    }
}

/// Flush pending traces and shut down the OpenTelemetry tracer provider.
///
/// Safe to call even when OTel was not enabled (no-op in that case).
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for("warn", 0, false), "warn");
        assert_eq!(level_for("warn", 1, false), "info");
        assert_eq!(level_for("warn", 2, false), "debug");
        assert_eq!(level_for("WARN", 9, false), "trace");
    }

    #[test]
    fn test_level_for_quiet_wins() {
        assert_eq!(level_for("debug", 3, true), "error");
    }

    #[test]
    fn test_level_for_custom_directive() {
        assert_eq!(
            level_for("parley_core=debug,warn", 2, false),
            "parley_core=debug,warn"
        );
    }
}
