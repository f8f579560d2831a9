//! Logging infrastructure for graphseed
//!
//! All three binaries share one subscriber setup: `RUST_LOG` wins, otherwise
//! `graphseed=<level>,info`. JSON output is opt-in.

pub mod summary;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use summary::SummaryWriter;

/// Resolve the effective level from `--log-level` and `--verbose`
pub fn effective_level(level: &str, verbose: bool) -> &str {
    if verbose {
        "debug"
    } else {
        level
    }
}

/// Install the global tracing subscriber
pub fn init(level: &str, verbose: bool, json: bool) {
    let level = effective_level(level, verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("graphseed={},info", level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .init();
}
