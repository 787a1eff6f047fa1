//! Log output for the command-line tool.
//!
//! Library code emits `tracing` events; this installs the subscriber that
//! prints them. `RUST_LOG` takes precedence over the verbosity flag.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for a verbosity level.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "sitepipe=debug"
    } else {
        "sitepipe=info"
    }
}

fn build_env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Install the global subscriber.
///
/// Returns `false` if one was already installed.
pub fn init(verbose: bool) -> bool {
    tracing_subscriber::registry()
        .with(build_env_filter(verbose))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}
