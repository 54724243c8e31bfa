use crate::config::ConfigError;
use crate::orchestration::OrchestrationError;
use thiserror::Error;

/// Top-level failure of the batch runner.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),
}

impl AppError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) => 2,
            AppError::Database(_) => 3,
            AppError::Orchestration(_) => 1,
        }
    }
}
