//! Structured logging via `tracing`.
//!
//! Library code only emits events; binaries and tests opt into output with
//! [`init_tracing`]. `RUST_LOG` takes precedence over the supplied level.
//!
//! ```no_run
//! tensorlogic_mln::logging::init_tracing("debug").expect("valid filter");
//! tracing::info!(partitions = 4, "starting marginalization");
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::InferenceConfig;
use crate::error::{MlnError, Result};

/// Install a global fmt subscriber filtered at `level`.
///
/// Calling this again after a subscriber is installed is a no-op.
pub fn init_tracing(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| MlnError::Config(format!("Invalid log level '{}': {}", level, e)))?,
    };

    // Already-installed subscribers are left in place.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();

    Ok(())
}

/// Install the subscriber at `config.log_level`.
pub fn init_from_config(config: &InferenceConfig) -> Result<()> {
    init_tracing(&config.log_level)
}
