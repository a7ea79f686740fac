//! Tracing initialization.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` for this crate when
/// `verbose`. Output goes to stderr so command output on stdout stays clean.
///
/// ```bash
/// RUST_LOG=backoffice::client=debug,tower_http=debug backoffice serve
/// ```
pub fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let env_filter = create_env_filter(verbose)?;
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    Ok(())
}

fn create_env_filter(verbose: bool) -> anyhow::Result<EnvFilter> {
    let default = if verbose { "info,backoffice=debug" } else { "info" };
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {e}"))
}
