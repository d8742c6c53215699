//! Unified error types for cimgrid
//!
//! [`GridError`] covers the failures that stop a conversion run as a whole:
//! unreadable input documents, broken configuration, and violated internal
//! invariants. Data-quality problems in individual equipment never surface
//! here; they are reported through [`crate::diagnostics`] instead.
//!
//! # Example
//!
//! ```ignore
//! use cimgrid_core::{GridError, GridResult};
//!
//! fn convert_file(path: &str) -> GridResult<()> {
//!     let model = load_document(path)?;
//!     convert(&model)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all cimgrid operations.
#[derive(Error, Debug)]
pub enum GridError {
    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Input model violates a structural requirement
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Sink network structure errors (duplicate ids, dangling references)
    #[error("Network error: {0}")]
    Network(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using GridError.
pub type GridResult<T> = Result<T, GridError>;

impl From<String> for GridError {
    fn from(s: String) -> Self {
        GridError::Other(s)
    }
}

impl From<&str> for GridError {
    fn from(s: &str) -> Self {
        GridError::Other(s.to_string())
    }
}

// JSON parsing errors
impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::Parse(err.to_string())
    }
}
