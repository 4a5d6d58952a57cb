//! Diagnostic tracing for orchestration runs.
//!
//! Run output (`teamloop run`) goes to stdout as JSON and is unaffected by
//! `RUST_LOG`; tracing only ever writes to stderr.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const QUIET: &str = "warn";
const VERBOSE: &str = "warn,teamloop=info";

/// Filter used when `RUST_LOG` is unset.
///
/// Verbose runs surface every supervisor decision and nested team completion.
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose { VERBOSE } else { QUIET }
}

/// Install the stderr subscriber.
///
/// `RUST_LOG` always wins over `verbose`:
///
/// ```bash
/// RUST_LOG=teamloop=debug teamloop run "Calculate 15 * 8"
/// ```
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}
