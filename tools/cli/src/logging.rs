//! Log subscriber shared by the binaries.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the level picked by `verbose`.
pub fn init(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
