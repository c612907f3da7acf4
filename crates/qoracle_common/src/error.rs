//! Error types for Qoracle.

use crate::llm_client::LlmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QoracleError {
    /// Trimmed input is shorter than the configured minimum.
    #[error("Input too short: {length} characters, at least {minimum} required")]
    InsufficientInput { length: usize, minimum: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    /// A reading from an external backend broke the output contract.
    #[error("Invalid reading: {0}")]
    InvalidReading(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QoracleError {
    /// True for the one failure that means "ask the user for more".
    pub fn is_insufficient_input(&self) -> bool {
        matches!(self, QoracleError::InsufficientInput { .. })
    }

    /// Short stable code for logs and JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            QoracleError::InsufficientInput { .. } => "insufficient_input",
            QoracleError::Config(_) => "config",
            QoracleError::InvalidReading(_) => "invalid_reading",
            QoracleError::Llm(_) => "llm",
            QoracleError::Ledger(_) => "ledger",
            QoracleError::Io(_) => "io",
            QoracleError::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, QoracleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_input_message() {
        let err = QoracleError::InsufficientInput { length: 2, minimum: 3 };
        assert!(err.is_insufficient_input());
        assert_eq!(err.code(), "insufficient_input");
        assert_eq!(
            err.to_string(),
            "Input too short: 2 characters, at least 3 required"
        );
    }

    #[test]
    fn test_llm_error_converts() {
        let err: QoracleError = LlmError::Disabled.into();
        assert!(!err.is_insufficient_input());
        assert_eq!(err.code(), "llm");
    }
}
