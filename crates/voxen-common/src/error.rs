//! Error types shared across Voxen crates.

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Integer meshing technique outside the known set
    #[error("Unknown meshing technique value: {0}")]
    InvalidMeshingTechnique(i32),

    /// Render distance of zero chunks
    #[error("Render distance must be at least 1 chunk")]
    ZeroRenderDistance,

    /// A pipeline stage configured without workers
    #[error("Pipeline stage '{stage}' needs at least one worker")]
    ZeroWorkers {
        /// Stage name
        stage: &'static str,
    },

    /// A pipeline queue configured with no capacity
    #[error("Pipeline queue capacity must be non-zero")]
    ZeroQueueCapacity,

    /// Terrain parameters outside their valid range
    #[error("Invalid terrain parameter: {0}")]
    InvalidTerrain(String),

    /// Config file could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ConfigError::InvalidMeshingTechnique(7).to_string(),
            "Unknown meshing technique value: 7"
        );
        assert_eq!(
            ConfigError::ZeroWorkers { stage: "mesh" }.to_string(),
            "Pipeline stage 'mesh' needs at least one worker"
        );
    }
}
