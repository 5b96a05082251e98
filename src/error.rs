// src/error.rs
//! Typed errors at the seams that callers branch on. Source adapters stay on `anyhow`.

use thiserror::Error;

/// Failure of the generative text backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("generative backend unavailable: {0}")]
    Unavailable(String),
    #[error("generative backend timed out")]
    Timeout,
    #[error("generative backend disabled")]
    Disabled,
}

/// Single-topic generation failure. Malformed output never lands here; only an unreachable
/// backend or a response with nothing usable left after fallback parsing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("generative backend returned an empty article")]
    EmptyResponse,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("content store unavailable: {0}")]
    Unavailable(String),
}

/// Hard errors surfaced to callers of the batch boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Persistence(#[from] StoreError),
}
