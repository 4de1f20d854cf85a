//! Tracing setup for the server process.
//!
//! Service code logs through `tracing`; command-line output goes through the
//! coloured macros in the crate root.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "flavormatch=info,tower_http=info,warn";

/// Initialize the logging system.
///
/// The log level can be controlled via the `RUST_LOG` environment variable.
/// Calling this twice is harmless; the second call leaves the first subscriber
/// in place.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = fmt::layer().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
