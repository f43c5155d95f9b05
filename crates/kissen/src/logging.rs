use kissen_config::LoggingConfig;
use tracing_subscriber::EnvFilter;

use crate::error::{KissenError, Result};

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` wins over `config.level`. Fails if a subscriber is already
/// installed or the directive does not parse.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| KissenError::Logging(format!("invalid level '{}': {e}", config.level)))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .try_init()
        .map_err(|e| KissenError::Logging(e.to_string()))
}
