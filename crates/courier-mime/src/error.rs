//! Error types for MIME serialization.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Header name or value would break the header block.
    #[error("Invalid MIME header: {0}")]
    InvalidHeader(String),

    /// Boundary is empty, too long, or appears inside a part.
    #[error("Invalid multipart boundary: {0}")]
    InvalidBoundary(String),

    /// Required header missing before serialization.
    #[error("Missing required header: {0}")]
    MissingHeader(String),
}
