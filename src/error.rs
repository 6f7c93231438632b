//! Error types for the public API edge
//!
//! Geometry problems never reach these types: the engine degrades to a
//! visually incorrect layout and heals on the next pass. Only configuration
//! and host input loading can fail.

use thiserror::Error;

/// Errors returned by fallible page-flow entry points.
#[derive(Debug, Error)]
pub enum PaginationError {
    /// Options failed validation (non-finite sizes, no room for content, ...)
    #[error("invalid pagination options: {0}")]
    InvalidOptions(String),
    /// JSON input (options, snapshots, document descriptions) failed to parse
    #[error("failed to parse input: {0}")]
    Parse(#[from] serde_json::Error),
    /// A break direction string was neither `before` nor `after`
    #[error("unknown break direction `{0}` (expected `before` or `after`)")]
    UnknownDirection(String),
    /// Reading an input file failed (command-line front end)
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PaginationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_from_json() {
        let err: PaginationError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, PaginationError::Parse(_)));
        assert!(err.to_string().starts_with("failed to parse input"));
    }
}
