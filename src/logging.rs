//! Logging initialization.
//!
//! Log level comes from `RUST_LOG` and defaults to `info`. Logs go to stderr
//! so that `run --json` can stream events on stdout.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber, human-readable or JSON.
///
/// # Example
/// ```no_run
/// use wifi_supervisor::logging;
///
/// logging::init(false);
/// tracing::info!(interface = "wlan0", "supervisor started");
/// ```
pub fn init(json: bool) {
    let registry = tracing_subscriber::registry().with(filter());

    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
