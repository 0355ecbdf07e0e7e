//! Unified error type for grid scaling.
//!
//! [`GridError`] covers every failure a loader, a change table or a scaling
//! call can surface. Conditions that are recoverable per entry (a zone group
//! with no members, a category without a given scope) are never errors; they
//! are recorded in [`crate::ScaleDiagnostics`] instead.
//!
//! # Example
//!
//! ```
//! use gridscale_core::{GridError, GridResult};
//!
//! fn pick(kind: &str) -> GridResult<()> {
//!     match kind {
//!         "hydro" | "solar" | "wind" => Ok(()),
//!         other => Err(GridError::InvalidArgument(format!("invalid resource: {other}"))),
//!     }
//! }
//!
//! assert!(pick("coal").is_err());
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    /// Requested change table or profile does not exist upstream
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller passed an unsupported argument (e.g. a resource kind)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An id referenced by an edit is absent from the grid or profile
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Malformed change table, table or profile
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors (file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using GridError.
pub type GridResult<T> = Result<T, GridError>;

impl GridError {
    /// True for the upstream "absent" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GridError::NotFound(_))
    }
}

impl From<anyhow::Error> for GridError {
    fn from(err: anyhow::Error) -> Self {
        // keep typed variants that were wrapped with context
        match err.downcast::<GridError>() {
            Ok(inner) => inner,
            Err(err) => GridError::Other(format!("{err:#}")),
        }
    }
}

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

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::Parse(err.to_string())
    }
}

impl From<polars::prelude::PolarsError> for GridError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        GridError::Parse(err.to_string())
    }
}

impl From<chrono::ParseError> for GridError {
    fn from(err: chrono::ParseError) -> Self {
        GridError::Parse(err.to_string())
    }
}
