//! Error types for cellguard.
//!
//! Library crates use [`CellGuardError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all cellguard operations.
#[derive(Debug, thiserror::Error)]
pub enum CellGuardError {
    /// A test cell present in the reference notebook is absent from the student's.
    #[error(
        "a test cell with ID {id} could not be found in your notebook. \
         Please verify that you have not deleted any test cells. If you have \
         deleted a test cell, copy it back manually from the release notebook \
         or roll your repository back to an earlier commit (note: rolling back \
         may undo your work!)"
    )]
    MissingTestCell { id: String },

    /// Two test cells in one notebook carry the same ID.
    #[error("test cell ID {id} appears more than once in the notebook")]
    DuplicateTestCell { id: String },

    /// The first line of a tagged cell cannot be parsed.
    #[error("malformed tag line {line:?}: {reason}")]
    MalformedTag { line: String, reason: String },

    /// A compile request named a case with no tagged cells.
    #[error("unknown test case {id:?}")]
    UnknownCase { id: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Notebook JSON parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad argument, unsupported format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CellGuardError>;

impl CellGuardError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a malformed-tag error for the given first line.
    pub fn malformed_tag(line: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedTag {
            line: line.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
