//! Chunk lifecycle state machine.

use thiserror::Error;

/// Lifecycle state of a chunk.
///
/// Chunks advance `Uninitialized -> TerrainGenerated -> MeshGenerated -> UpToDate`.
/// Edits and explicit invalidation drop a meshed chunk back to
/// `TerrainGenerated`; nothing resets terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChunkState {
    /// Allocated, no voxel data yet
    #[default]
    Uninitialized,
    /// Terrain populated, mesh missing or stale
    TerrainGenerated,
    /// Mesh built, renderable not yet refreshed
    MeshGenerated,
    /// Renderable reflects the current mesh
    UpToDate,
}

/// Rejected state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Illegal chunk transition '{event}' from {from:?}")]
pub struct StateError {
    /// State the chunk was in
    pub from: ChunkState,
    /// Transition that was attempted
    pub event: &'static str,
}

impl ChunkState {
    /// True once terrain has been generated or loaded.
    #[must_use]
    pub const fn has_terrain(self) -> bool {
        !matches!(self, Self::Uninitialized)
    }

    /// True while a current mesh exists.
    #[must_use]
    pub const fn has_mesh(self) -> bool {
        matches!(self, Self::MeshGenerated | Self::UpToDate)
    }

    /// True when the renderable reflects the current mesh.
    #[must_use]
    pub const fn is_up_to_date(self) -> bool {
        matches!(self, Self::UpToDate)
    }

    /// Terrain was generated.
    pub const fn on_terrain_generated(self) -> Result<Self, StateError> {
        match self {
            Self::Uninitialized => Ok(Self::TerrainGenerated),
            from => Err(StateError {
                from,
                event: "terrain generated",
            }),
        }
    }

    /// A mesh was (re)built from the current voxels.
    pub const fn on_mesh_generated(self) -> Result<Self, StateError> {
        match self {
            Self::Uninitialized => Err(StateError {
                from: self,
                event: "mesh generated",
            }),
            _ => Ok(Self::MeshGenerated),
        }
    }

    /// The renderable was refreshed from the mesh.
    pub const fn on_object_updated(self) -> Result<Self, StateError> {
        match self {
            Self::MeshGenerated | Self::UpToDate => Ok(Self::UpToDate),
            from => Err(StateError {
                from,
                event: "object updated",
            }),
        }
    }

    /// Mesh became stale (edit, seam fix, technique change, demotion).
    #[must_use]
    pub const fn invalidated(self) -> Self {
        match self {
            Self::MeshGenerated | Self::UpToDate => Self::TerrainGenerated,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path() {
        let state = ChunkState::default()
            .on_terrain_generated()
            .and_then(ChunkState::on_mesh_generated)
            .and_then(ChunkState::on_object_updated)
            .expect("forward path should be legal");
        assert_eq!(state, ChunkState::UpToDate);
    }

    #[test]
    fn test_illegal_edges() {
        assert!(ChunkState::Uninitialized.on_mesh_generated().is_err());
        assert!(ChunkState::TerrainGenerated.on_object_updated().is_err());
        assert!(ChunkState::UpToDate.on_terrain_generated().is_err());
    }

    #[test]
    fn test_invalidation_keeps_terrain() {
        assert_eq!(ChunkState::UpToDate.invalidated(), ChunkState::TerrainGenerated);
        assert_eq!(ChunkState::MeshGenerated.invalidated(), ChunkState::TerrainGenerated);
        assert_eq!(ChunkState::Uninitialized.invalidated(), ChunkState::Uninitialized);
        assert!(ChunkState::UpToDate.invalidated().has_terrain());
    }
}
