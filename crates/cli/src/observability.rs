//! Tracing subscriber wiring.
//!
//! Log lines go to stdout, interleaved with the workflow commands, so the
//! runner folds them into the right group. Timestamps and colours are left to
//! the runner's log viewer.

use anyhow::Context;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogFormat;

/// Installs the global subscriber. `RUST_LOG` overrides the default `info`
/// filter.
pub fn init(format: LogFormat) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create tracing filter")?;

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Text => {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_ansi(false)
                .with_target(false)
                .without_time();
            registry.with(layer).try_init()
        }
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stdout)
                .with_current_span(true)
                .with_span_list(false);
            registry.with(layer).try_init()
        }
    }
    .context("Failed to install tracing subscriber")
}
