use thiserror::Error;

use tto_config::ConfigError;
use tto_core::CoreError;

/// Error type returned by the office facade.
#[derive(Debug, Error)]
pub enum OfficeError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl OfficeError {
    pub fn core(&self) -> Option<&CoreError> {
        match self {
            OfficeError::Core(err) => Some(err),
            _ => None,
        }
    }

    /// True for business-rule rejections the caller can act on.
    pub fn is_domain(&self) -> bool {
        self.core().is_some_and(CoreError::is_domain)
    }
}
