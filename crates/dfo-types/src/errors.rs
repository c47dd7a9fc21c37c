use thiserror::Error;

/// Boxed error raised by a caller-supplied agent.
pub type AgentError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for dfo
#[derive(Error, Debug)]
pub enum DfoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Agent error: {0}")]
    Agent(AgentError),

    #[error("Agent returned non-finite outcome {outcome} for inputs {inputs:?}")]
    NonFiniteOutcome { inputs: Vec<f64>, outcome: f64 },
}

impl DfoError {
    /// True for errors raised while validating a run or parameter.
    pub fn is_config(&self) -> bool {
        matches!(self, DfoError::Config(_))
    }
}

/// Result type alias for dfo operations
pub type DfoResult<T> = Result<T, DfoError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::DfoError::Config(format!($($arg)*))
    };
}
