//! Error taxonomy for the engine surface.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Unknown task or owner identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// Signal payload rejected at submission time.
    #[error("invalid signal: {0}")]
    InvalidSignal(String),

    /// Task fields rejected before the task reaches a registry.
    #[error("invalid task: {0}")]
    InvalidTask(String),

    /// Engine configuration failed validation at construction.
    #[error("configuration error: {0}")]
    Configuration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = EngineError::NotFound("task t-42".to_string());
        assert_eq!(err.to_string(), "not found: task t-42");

        let err = EngineError::Configuration("slot granularity must be positive".to_string());
        assert!(err.to_string().starts_with("configuration error:"));
    }
}
