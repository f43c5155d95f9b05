//! Error surface of the facade.

use kissen_ban::BanError;
use kissen_config::ConfigError;
use kissen_meta::MetaError;
use kissen_permission::PermissionError;
use kissen_savable::SavableError;
use thiserror::Error;

/// Shown to players instead of the underlying storage failure.
pub const BACKEND_FAILURE_MESSAGE: &str =
    "A database error occurred. Please contact an administrator.";

#[derive(Debug, Error)]
pub enum KissenError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to load configuration: {0:#}")]
    Load(anyhow::Error),

    #[error("Failed to prepare data directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to install tracing subscriber: {0}")]
    Logging(String),

    #[error(transparent)]
    Meta(#[from] MetaError),

    #[error(transparent)]
    Savable(#[from] SavableError),

    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error(transparent)]
    Ban(#[from] BanError),
}

impl KissenError {
    /// Whether the failure came from the storage backend.
    pub fn is_backend(&self) -> bool {
        match self {
            KissenError::Meta(e) => meta_backend(e),
            KissenError::Savable(e) => savable_backend(e),
            KissenError::Permission(PermissionError::Meta(e)) => meta_backend(e),
            KissenError::Permission(PermissionError::Savable(e)) => savable_backend(e),
            KissenError::Ban(BanError::Meta(e)) => meta_backend(e),
            KissenError::Ban(BanError::Savable(e)) => savable_backend(e),
            _ => false,
        }
    }

    /// Text safe to show to the player that triggered the operation.
    ///
    /// Backend failures are replaced with a fixed message; everything else
    /// is shown as is.
    pub fn user_message(&self) -> String {
        if self.is_backend() {
            BACKEND_FAILURE_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

fn meta_backend(error: &MetaError) -> bool {
    matches!(error, MetaError::Backend(_))
}

fn savable_backend(error: &SavableError) -> bool {
    matches!(error, SavableError::Meta(e) if meta_backend(e))
}

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, KissenError>;
