//! Error types for the evolution engine.

use thiserror::Error;

/// Errors surfaced by session and engine operations.
#[derive(Debug, Error)]
pub enum EvolutionError {
    /// Malformed configuration or an inconsistent drone-count/layout pair.
    /// Fatal at session creation; no partial session is left behind.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A genome id that does not exist in the current generation.
    #[error("genome {0} not found in the current generation")]
    GenomeNotFound(u64),

    /// A caller-supplied value outside its documented range. Rejected before
    /// any state mutation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A condition the reproduction/compilation guarantees rule out. If this
    /// fires, the current call fails and the prior population state is left
    /// unchanged.
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EvolutionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EvolutionError::GenomeNotFound(42);
        assert!(err.to_string().contains("42"));

        let err = EvolutionError::InvalidArgument("fitness 1.5 outside [0, 1]".into());
        assert!(err.to_string().contains("fitness"));
    }
}
