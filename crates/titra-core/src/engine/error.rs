use super::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Titrant increment must be a positive, finite volume (got {delta} mL)")]
    InvalidIncrement { delta: f64 },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
