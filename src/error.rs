use thiserror::Error;
use url::ParseError;

#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("Automation error during {operation}: {message}")]
    Automation { operation: String, message: String },

    #[error("Timed out during {operation}: {message}")]
    Timeout { operation: String, message: String },

    #[error("Session error: {0}")]
    Session(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SuiteError {
    pub fn assertion(message: impl Into<String>) -> Self {
        SuiteError::Assertion(message.into())
    }

    pub fn automation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        SuiteError::Automation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, message: impl Into<String>) -> Self {
        SuiteError::Timeout {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn session(message: impl Into<String>) -> Self {
        SuiteError::Session(message.into())
    }

    /// True for failures that belong to the scenario itself (assertion or
    /// automation trouble) rather than to the harness bookkeeping.
    pub fn is_scenario_failure(&self) -> bool {
        matches!(
            self,
            SuiteError::Assertion(_) | SuiteError::Automation { .. } | SuiteError::Timeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SuiteError>;
