//! World configuration.

use serde::{Deserialize, Serialize};
use voxen_common::ConfigError;

use crate::meshing::MeshingTechnique;
use crate::terrain::TerrainConfig;

/// Worker pool sizing for the streaming pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Threads allocating new chunks
    pub creation_workers: usize,
    /// Threads generating terrain
    pub terrain_workers: usize,
    /// Threads building meshes
    pub mesh_workers: usize,
    /// Bounded queue length per stage
    pub queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            creation_workers: 4,
            terrain_workers: 4,
            mesh_workers: 4,
            queue_capacity: 1024,
        }
    }
}

/// Configuration handed to the chunk manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// View distance in chunks
    pub render_distance: u32,
    /// Mesher used for new meshes
    pub meshing_technique: MeshingTechnique,
    /// Request creation of chunks that are not yet in the world
    pub generate_chunks: bool,
    /// Terrain generation parameters
    pub terrain: TerrainConfig,
    /// Worker pools
    pub pipeline: PipelineConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            render_distance: 6,
            meshing_technique: MeshingTechnique::default(),
            generate_chunks: true,
            terrain: TerrainConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render_distance == 0 {
            return Err(ConfigError::ZeroRenderDistance);
        }
        let p = &self.pipeline;
        for (stage, workers) in [
            ("creation", p.creation_workers),
            ("terrain", p.terrain_workers),
            ("mesh", p.mesh_workers),
        ] {
            if workers == 0 {
                return Err(ConfigError::ZeroWorkers { stage });
            }
        }
        if p.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        self.terrain.validate()
    }
}
