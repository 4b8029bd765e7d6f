//! Error types for the battle server.

use std::path::PathBuf;

use combat_core::error::CombatError;
use combat_core::scene::SceneId;
use thiserror::Error;

/// Result type alias using [`ServerError`].
pub type Result<T> = std::result::Result<T, ServerError>;

/// Top-level error type for the battle server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The registry already holds its maximum number of scenes.
    #[error("Scene capacity exceeded: {capacity} scenes running")]
    CapacityExceeded {
        /// Configured capacity.
        capacity: usize,
    },

    /// The scene could not be built or failed while ticking.
    #[error("Combat error: {0}")]
    Combat(#[from] CombatError),

    /// The scene was cancelled before it reached a verdict.
    #[error("Scene {0} aborted")]
    Aborted(SceneId),

    /// A tick panicked; only this scene was terminated.
    #[error("Scene {id} panicked: {message}")]
    ScenePanicked {
        /// Scene that panicked.
        id: SceneId,
        /// Panic payload, when it was a string.
        message: String,
    },

    /// The scene task ended without delivering a result.
    #[error("Scene {0} dropped its result")]
    ResultDropped(SceneId),

    /// A combat request could not be turned into a scene setup.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Reading a file failed.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Config file parsing error.
    #[error("Failed to parse config '{path}': {message}")]
    ConfigParse {
        /// Path to the file that failed to parse.
        path: PathBuf,
        /// Error message.
        message: String,
    },
}
