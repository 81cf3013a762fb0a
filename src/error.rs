//! Error taxonomy for a reconciliation run.
//!
//! Every variant is terminal: the command layer wraps it with context and
//! exits without producing a report.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReconError>;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("Failed to load table from {path:?}: {message}")]
    Load { path: PathBuf, message: String },

    #[error("No suitable primary key found: {reason}")]
    NoPrimaryKey { reason: String },

    #[error("Primary key column '{column}' is not present in the target table")]
    KeyNotInTarget { column: String },

    #[error("Failed to write report to {path:?}: {message}")]
    Write { path: PathBuf, message: String },
}

impl ReconError {
    pub fn load(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        ReconError::Load {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        ReconError::Write {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Pipeline stage that raised the error, used in diagnostics.
    pub fn stage(&self) -> &'static str {
        match self {
            ReconError::Load { .. } => "load",
            ReconError::NoPrimaryKey { .. } | ReconError::KeyNotInTarget { .. } => "key selection",
            ReconError::Write { .. } => "report write",
        }
    }
}
