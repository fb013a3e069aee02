use std::path::PathBuf;
use thiserror::Error;
use xrdcloud::core::io::catalog::CatalogError;
use xrdcloud::core::io::dataset::DatasetError;
use xrdcloud::core::io::intermediate::IntermediateError;
use xrdcloud::engine::config::ConfigError;
use xrdcloud::engine::error::EngineError;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Verification failed: {0}")]
    Verification(#[from] DatasetError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::Engine(EngineError::Configuration(e))
    }
}

impl From<CatalogError> for CliError {
    fn from(e: CatalogError) -> Self {
        Self::Engine(e.into())
    }
}

impl From<IntermediateError> for CliError {
    fn from(e: IntermediateError) -> Self {
        Self::Engine(e.into())
    }
}
