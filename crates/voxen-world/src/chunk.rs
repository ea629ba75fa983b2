//! Chunk data structure.
//!
//! A chunk owns a 16³ block array, its current mesh and its lifecycle state,
//! all behind one private mutex. Every block read or write, terrain fill and
//! mesh rebuild takes that lock, so terrain workers, mesh workers and edits
//! on other threads never race. Neighbor data is passed in as
//! [`NeighborFaces`] snapshots; a chunk never locks another chunk.

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;
use voxen_common::{ChunkCoord, CHUNK_SIZE, CHUNK_SIZE_I32, CHUNK_VOLUME};

use crate::block::{Block, BlockType};
use crate::mesh::{Direction, MeshData};
use crate::meshing::{self, BoundaryPlane, MeshingTechnique, NeighborFaces};
use crate::object::{GameObject, ModelFactory, SharedGameObject, Transform};
use crate::save::{self, SaveError};
use crate::state::{ChunkState, StateError};
use crate::terrain::TerrainGenerator;

/// Linear index of local voxel `(x, y, z)`: `x + y * 16 + z * 256`.
#[must_use]
pub const fn block_index(x: usize, y: usize, z: usize) -> usize {
    x + y * CHUNK_SIZE + z * CHUNK_SIZE * CHUNK_SIZE
}

/// Returns the local index if `(x, y, z)` lies inside the chunk.
#[must_use]
pub const fn checked_index(x: i32, y: i32, z: i32) -> Option<usize> {
    let n = CHUNK_SIZE_I32;
    if x < 0 || y < 0 || z < 0 || x >= n || y >= n || z >= n {
        return None;
    }
    Some(block_index(x as usize, y as usize, z as usize))
}

#[derive(Debug)]
struct ChunkInner {
    blocks: Box<[Block; CHUNK_VOLUME]>,
    state: ChunkState,
    mesh: MeshData,
}

impl ChunkInner {
    /// Applies an edit's effect on state: meshes built from old voxels are stale.
    fn mark_edited(&mut self) {
        self.state = self.state.invalidated();
    }
}

/// A chunk of the world.
#[derive(Debug)]
pub struct Chunk {
    coord: ChunkCoord,
    inner: Mutex<ChunkInner>,
    game_object: Option<SharedGameObject>,
}

impl Chunk {
    /// Creates an uninitialized chunk paired with a fresh game object.
    #[must_use]
    pub fn new(coord: ChunkCoord) -> Self {
        let object = GameObject::new(Transform::from_translation(coord.world_origin_vec3()));
        Self::with_state(coord, Box::new([Block::AIR; CHUNK_VOLUME]), ChunkState::Uninitialized)
            .with_game_object(object.shared())
    }

    /// Creates a chunk from existing voxels, with terrain considered generated.
    ///
    /// The chunk has no paired game object until [`Chunk::with_game_object`].
    #[must_use]
    pub fn from_blocks(coord: ChunkCoord, blocks: Box<[Block; CHUNK_VOLUME]>) -> Self {
        Self::with_state(coord, blocks, ChunkState::TerrainGenerated)
    }

    /// Creates an all-air chunk with terrain considered generated and no game object.
    #[must_use]
    pub fn empty(coord: ChunkCoord) -> Self {
        Self::from_blocks(coord, Box::new([Block::AIR; CHUNK_VOLUME]))
    }

    fn with_state(
        coord: ChunkCoord,
        blocks: Box<[Block; CHUNK_VOLUME]>,
        state: ChunkState,
    ) -> Self {
        Self {
            coord,
            inner: Mutex::new(ChunkInner {
                blocks,
                state,
                mesh: MeshData::new(),
            }),
            game_object: None,
        }
    }

    /// Pairs the chunk with a game object.
    #[must_use]
    pub fn with_game_object(mut self, object: SharedGameObject) -> Self {
        self.game_object = Some(object);
        self
    }

    /// Returns the chunk coordinate.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Returns the paired game object.
    #[must_use]
    pub const fn game_object(&self) -> Option<&SharedGameObject> {
        self.game_object.as_ref()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ChunkState {
        self.lock().state
    }

    /// Returns `(vertices, indices)` of the current mesh.
    #[must_use]
    pub fn mesh_counts(&self) -> (usize, usize) {
        let inner = self.lock();
        (inner.mesh.vertices.len(), inner.mesh.indices.len())
    }

    /// Returns a copy of the current mesh.
    #[must_use]
    pub fn mesh(&self) -> MeshData {
        self.lock().mesh.clone()
    }

    /// Runs `f` with the block array while holding the lock.
    pub fn with_blocks<R>(&self, f: impl FnOnce(&[Block; CHUNK_VOLUME]) -> R) -> R {
        f(&self.lock().blocks)
    }

    fn lock(&self) -> MutexGuard<'_, ChunkInner> {
        self.inner.lock()
    }

    /// Gets the block at local coordinates; AIR when out of range.
    #[must_use]
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Block {
        checked_index(x, y, z).map_or(Block::AIR, |i| self.lock().blocks[i])
    }

    /// Sets the block at local coordinates; ignored when out of range.
    ///
    /// A changed block invalidates the mesh.
    pub fn set_block(&self, x: i32, y: i32, z: i32, block: Block) {
        let Some(i) = checked_index(x, y, z) else {
            return;
        };
        let mut inner = self.lock();
        if inner.blocks[i] != block {
            inner.blocks[i] = block;
            inner.mark_edited();
        }
    }

    /// Fills the inclusive box between two corners.
    ///
    /// Corners may be given in any order and are clamped into the chunk.
    pub fn fill(&self, from: [i32; 3], to: [i32; 3], block: Block) {
        let clamp = |v: i32| v.clamp(0, CHUNK_SIZE_I32 - 1) as usize;
        let lo: [usize; 3] = std::array::from_fn(|a| clamp(from[a].min(to[a])));
        let hi: [usize; 3] = std::array::from_fn(|a| clamp(from[a].max(to[a])));

        let mut inner = self.lock();
        let mut changed = false;
        for z in lo[2]..=hi[2] {
            for y in lo[1]..=hi[1] {
                for x in lo[0]..=hi[0] {
                    let slot = &mut inner.blocks[block_index(x, y, z)];
                    changed |= *slot != block;
                    *slot = block;
                }
            }
        }
        if changed {
            inner.mark_edited();
        }
    }

    /// Generates terrain once. Returns `false` if terrain already existed.
    pub fn generate_terrain(&self, generator: &TerrainGenerator) -> Result<bool, StateError> {
        let mut inner = self.lock();
        if inner.state.has_terrain() {
            return Ok(false);
        }
        let next = inner.state.on_terrain_generated()?;
        generator.generate(self.coord, &mut inner.blocks);
        inner.state = next;
        debug!("Generated terrain for chunk {}", self.coord);
        Ok(true)
    }

    /// Rebuilds the mesh with the given technique and neighbor snapshots.
    pub fn generate_mesh(
        &self,
        technique: MeshingTechnique,
        neighbors: &NeighborFaces,
    ) -> Result<(), StateError> {
        let mut inner = self.lock();
        let next = inner.state.on_mesh_generated()?;
        inner.mesh = meshing::generate_mesh(technique, &inner.blocks, neighbors);
        inner.state = next;
        debug!(
            "Meshed chunk {} ({technique}): {} vertices, {} neighbors",
            self.coord,
            inner.mesh.vertices.len(),
            neighbors.resolved()
        );
        Ok(())
    }

    /// Copies the outer voxel layer on `face`, or `None` before terrain exists.
    #[must_use]
    pub fn boundary_plane(&self, face: Direction) -> Option<BoundaryPlane> {
        let inner = self.lock();
        inner
            .state
            .has_terrain()
            .then(|| BoundaryPlane::extract(&inner.blocks, face))
    }

    /// Rebuilds the paired renderable from the current mesh.
    ///
    /// Returns `false` when there was nothing to refresh. Must be called on
    /// the thread that owns the render device.
    ///
    /// # Panics
    ///
    /// Panics if the chunk has no paired game object.
    pub fn update_game_object(&self, factory: &dyn ModelFactory) -> bool {
        let Some(object) = &self.game_object else {
            panic!("chunk {} has no paired game object", self.coord);
        };
        let mut inner = self.lock();
        let Ok(next) = inner.state.on_object_updated() else {
            return false;
        };
        if next == inner.state {
            return false;
        }
        let model = (!inner.mesh.is_empty()).then(|| factory.create_model(&inner.mesh));
        {
            let mut object = object.write();
            object.model = model;
            object.transform = Transform::from_translation(self.coord.world_origin_vec3());
        }
        inner.state = next;
        true
    }

    /// Marks the mesh stale without discarding it.
    pub fn invalidate_mesh(&self) {
        self.lock().mark_edited();
    }

    /// Releases the mesh and renderable, keeping the voxels.
    pub fn clear_mesh(&self) {
        let mut inner = self.lock();
        inner.mesh.release();
        inner.mark_edited();
        if let Some(object) = &self.game_object {
            object.write().model = None;
        }
    }

    /// Serializes the chunk: 12-byte origin header followed by block runs.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        save::encode_chunk(self.coord, &self.lock().blocks, &mut out);
        out
    }

    /// Deserializes a chunk record. The chunk has terrain and no game object.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, SaveError> {
        let (coord, blocks, used) = save::decode_chunk(bytes)?;
        if used != bytes.len() {
            return Err(SaveError::TrailingBytes {
                count: bytes.len() - used,
            });
        }
        Ok(Self::from_blocks(coord, blocks))
    }

    /// Counts blocks of each type, indexed by type byte.
    #[must_use]
    pub fn block_histogram(&self) -> [usize; BlockType::ALL.len()] {
        let mut counts = [0; BlockType::ALL.len()];
        for block in self.lock().blocks.iter() {
            counts[block.block_type.as_u8() as usize] += 1;
        }
        counts
    }
}
