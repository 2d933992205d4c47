// Logging setup
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` wins over `level`. Calling this again (or after another
/// subscriber was installed, e.g. by a test harness) is a no-op.
pub fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .is_ok();

    if installed {
        debug!(target: "telemetry", level = %level, "Logging initialized");
    }
}
