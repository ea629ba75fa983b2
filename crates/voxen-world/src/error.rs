//! World error types.

use thiserror::Error;
use voxen_common::ConfigError;

use crate::save::SaveError;
use crate::state::StateError;

/// Top-level error type for world operations.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed or unreadable save data
    #[error("Save error: {0}")]
    Save(#[from] SaveError),

    /// Illegal chunk state transition
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Worker thread could not be spawned
    #[error("Failed to spawn {stage} worker: {source}")]
    Spawn {
        /// Stage name
        stage: &'static str,
        /// Underlying error
        source: std::io::Error,
    },
}

/// Result type alias for world operations.
pub type WorldResult<T> = Result<T, WorldError>;
