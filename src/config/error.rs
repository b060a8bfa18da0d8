use thiserror::Error;
use worm_prover::ProverError;

#[derive(Error, Debug)]
pub(crate) enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] Box<figment::Error>),

    #[error("Failed to load environment file: {0}")]
    EnvFile(#[from] dotenvy::Error),

    #[error("Missing required secret: {0}")]
    MissingSecret(String),

    #[error("Missing required config file: {0}")]
    MissingConfig(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Chain(#[from] worm_blockchain::ConfigError),

    #[error("Invalid prover configuration: {0}")]
    Prover(#[source] ProverError),
}

impl From<ProverError> for ConfigError {
    fn from(err: ProverError) -> Self {
        ConfigError::Prover(err)
    }
}
