use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config file not found: {0}")]
    ConfigNotFound(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("GPIO error: {0}")]
    Gpio(String),
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}

