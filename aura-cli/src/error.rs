//! Error types for the CLI.

use crate::config::ConfigLoadError;
use aura_core::AuraError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigLoadError),
    #[error(transparent)]
    Aura(#[from] AuraError),
    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
    /// The command ran but reported failure.
    #[error("{0}")]
    Failed(String),
}

impl CliError {
    pub fn aura(err: impl Into<AuraError>) -> Self {
        CliError::Aura(err.into())
    }
}
