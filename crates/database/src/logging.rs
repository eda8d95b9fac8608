//! Log output for applications embedding Quiver.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `QUIVER_LOG=quiver_reactive=trace`.
pub const LOG_ENV: &str = "QUIVER_LOG";

static INIT: Once = Once::new();

/// Installs a formatting subscriber filtered by `QUIVER_LOG` (default `info`).
///
/// Safe to call more than once. Does nothing if the process already has a
/// global subscriber.
pub fn init_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}
