//! Error types for the development tools.

use std::path::PathBuf;

use combat_core::error::CombatError;
use thiserror::Error;

/// Result type alias using [`ToolError`].
pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors raised by the tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Reading a file or directory failed.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Parsing or running combat data failed.
    #[error(transparent)]
    Combat(#[from] CombatError),

    /// No data file was found where one was expected.
    #[error("No .ron data files in '{0}'")]
    NoDataFiles(PathBuf),

    /// A `type[:level]` unit argument did not parse.
    #[error("Invalid unit argument '{0}', expected TYPE or TYPE:LEVEL")]
    InvalidUnitSpec(String),

    /// Writing a summary failed.
    #[error("Failed to render summary: {0}")]
    Render(String),
}
