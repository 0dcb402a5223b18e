//! Subscriber setup for applications embedding the decoder.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{FreedError, Result};

/// Install a compact fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (for example `"freed=info"`).
///
/// Installing twice is not an error; the first subscriber stays in place.
pub fn init(default_directive: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive)
            .map_err(|e| FreedError::config("log filter", e.to_string()))?,
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(true))
        .try_init();

    if installed.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
    Ok(())
}
