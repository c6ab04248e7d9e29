//! Error types for the interaction core.

use thiserror::Error;

/// Errors surfaced to the host.
///
/// Pointer and timeline handling never fails; these only cover data
/// crossing the boundary (configuration and channel messages).
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Message decode error: {0}")]
    Message(String),
    #[error("Message encode error: {0}")]
    Encode(String),
}

/// Result type for surface operations.
pub type SurfaceResult<T> = Result<T, SurfaceError>;
