use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config file not found: {path}")]
    ConfigFileNotFound { path: PathBuf },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Transport failed: {0}")]
    Transport(String),

    #[error("P2P connection failed: {0}")]
    P2PConnection(String),

    #[error("Failed to initialize tracing: {0}")]
    Logging(String),
}

impl CliError {
    pub fn config_not_found(path: PathBuf) -> Self {
        CliError::ConfigFileNotFound { path }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
