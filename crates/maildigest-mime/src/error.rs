//! Error types for MIME operations.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
///
/// Only structural problems surface as errors; content-level decoding is
/// permissive and degrades to best-effort output instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid MIME header block.
    #[error("Invalid MIME header: {0}")]
    InvalidHeader(String),

    /// Message could not be split into headers and body.
    #[error("Parse error: {0}")]
    Parse(String),
}
