//! Crate-wide error type
//!
//! Each crate keeps its own error enum and converts into this one at the
//! seams where results cross crate boundaries.

use thiserror::Error;

/// Result alias using the core error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Synthesis failed on {backend}: {cause}")]
    SynthesisFailed { backend: String, cause: String },

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),
}

impl Error {
    /// True for failures of an external backend (synthesis or generation).
    ///
    /// These are the errors the turn path turns into a spoken apology.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            Error::SynthesisFailed { .. } | Error::GenerationFailed(_) | Error::Timeout(_)
        )
    }
}
