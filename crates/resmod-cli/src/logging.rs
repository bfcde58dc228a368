//! Logging initialization for the `resmod` binary.
//!
//! `resmod-core` only emits `tracing` events (target `resmod_core`): debug
//! for probes, cache hits and candidate decisions, warn for malformed
//! manifests, unusable matchers and skipped candidates. The subscriber
//! lives here.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber.
///
/// # Arguments
/// * `verbosity` - level for the `resmod` and `resmod_core` targets:
///   0 = INFO, 1 = DEBUG (`-v`, shows why each candidate was kept or
///   skipped), 2+ = TRACE
/// * `json` - If true, output JSON lines to stderr, keeping stdout for the
///   command's own JSON document
///
/// `RUST_LOG` sets the baseline filter for every other target (default
/// `warn`); the verbosity directives are added on top of it.
pub fn init(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    for target in ["resmod", "resmod_core"] {
        if let Ok(directive) = format!("{target}={level}").parse() {
            filter = filter.add_directive(directive);
        }
    }

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
