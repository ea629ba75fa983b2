//! Chunk streaming around a moving viewer.
//!
//! [`ChunkManager::update`] runs once per tick on the thread that owns the
//! render device. It never waits on background work: each in-range chunk is
//! pushed one step along its lifecycle and the call returns.
//!
//! | state              | action                                         |
//! |--------------------|------------------------------------------------|
//! | absent             | creation stage (only while generation is on)   |
//! | `Uninitialized`    | terrain stage                                  |
//! | `TerrainGenerated` | mesh stage                                     |
//! | `MeshGenerated`    | rebuild renderable on the calling thread       |
//! | `UpToDate`         | register in the live-object set                |
//!
//! Chunks that leave the view are removed from the live-object set and have
//! their meshes released, but stay in the map with terrain intact. This
//! includes chunks whose mesh job finished after the viewer moved away.
//!
//! Mesh workers read the meshing technique when they run, not when the job
//! is queued, so a technique change also reaches jobs already in the queue.

use glam::Vec3;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use dashmap::DashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use voxen_common::{ChunkCoord, ChunkCoordBuildHasher, ConfigError, GameObjectId};

use crate::chunk::Chunk;
use crate::config::WorldConfig;
use crate::error::WorldResult;
use crate::mesh::Direction;
use crate::meshing::{MeshingTechnique, NeighborFaces};
use crate::object::{GameObject, GameObjectMap, ModelFactory, Transform};
use crate::pipeline::{JobOutcome, Stage, StageJob};
use crate::save::{self, SaveResult};
use crate::state::ChunkState;
use crate::terrain::TerrainGenerator;

/// Authoritative coordinate-to-chunk map.
pub type ChunkMap = HashMap<ChunkCoord, Arc<Chunk>, ChunkCoordBuildHasher>;

/// Region around the viewer that must stay resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewWindow {
    /// Chunk containing the viewer
    pub center: ChunkCoord,
    /// Radius in chunks
    pub distance: u32,
}

impl ViewWindow {
    /// Vertical reach: half the distance plus one.
    #[must_use]
    pub const fn vertical_reach(&self) -> i32 {
        (self.distance / 2 + 1) as i32
    }

    /// Returns true if `coord` is inside the window.
    #[must_use]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        let d = i64::from(self.distance);
        (i64::from(coord.y) - i64::from(self.center.y)).abs() <= i64::from(self.vertical_reach())
            && coord.distance_squared(self.center) <= d * d
    }
}

/// Offsets inside a view window, nearest first.
#[derive(Debug, Clone)]
struct ScanOrder {
    distance: u32,
    offsets: Vec<[i32; 3]>,
}

impl ScanOrder {
    fn new(distance: u32) -> Self {
        let window = ViewWindow {
            center: ChunkCoord::default(),
            distance,
        };
        let d = distance as i32;
        let vy = window.vertical_reach();
        let mut offsets = Vec::new();
        for dy in -vy..=vy {
            for dz in -d..=d {
                for dx in -d..=d {
                    if window.contains(ChunkCoord::new(dx, dy, dz)) {
                        offsets.push([dx, dy, dz]);
                    }
                }
            }
        }
        offsets.sort_by_key(|&[x, y, z]| x * x + y * y + z * z);
        Self { distance, offsets }
    }
}

/// Pipeline and residency counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerStats {
    /// Chunks in the authoritative map
    pub loaded_chunks: usize,
    /// Chunks exposed in the live-object set
    pub active_chunks: usize,
    /// Vertices across active chunk meshes
    pub vertices: usize,
    /// Indices across active chunk meshes
    pub indices: usize,
    /// Creation jobs queued or running
    pub pending_creation: usize,
    /// Terrain jobs queued or running
    pub pending_terrain: usize,
    /// Mesh jobs queued or running
    pub pending_mesh: usize,
}

impl ManagerStats {
    /// Triangles across active chunk meshes.
    #[must_use]
    pub const fn triangles(&self) -> usize {
        self.indices / 3
    }
}

/// State shared between the manager and its workers.
struct SharedWorld {
    chunks: RwLock<ChunkMap>,
    generator: TerrainGenerator,
    view: RwLock<Option<ViewWindow>>,
    generating: AtomicBool,
    /// Held for reading while a mesh is built; a change waits for running builds.
    technique: RwLock<MeshingTechnique>,
    /// Chunks meshed by workers since the last `update`
    meshed: DashSet<ChunkCoord, ChunkCoordBuildHasher>,
}

impl SharedWorld {
    fn chunk(&self, coord: ChunkCoord) -> Option<Arc<Chunk>> {
        self.chunks.read().get(&coord).cloned()
    }

    fn in_view(&self, coord: ChunkCoord) -> bool {
        let view = *self.view.read();
        view.is_some_and(|w| w.contains(coord))
    }

    /// True if terrain for `coord` is still expected to arrive.
    fn awaits_terrain(&self, coord: ChunkCoord, present: bool) -> bool {
        self.in_view(coord) && (present || self.generating.load(Ordering::Acquire))
    }
}

struct CreateJob {
    coord: ChunkCoord,
}

impl StageJob for CreateJob {
    fn coord(&self) -> ChunkCoord {
        self.coord
    }
}

struct TerrainJob {
    coord: ChunkCoord,
}

impl StageJob for TerrainJob {
    fn coord(&self) -> ChunkCoord {
        self.coord
    }
}

struct MeshJob {
    coord: ChunkCoord,
}

impl StageJob for MeshJob {
    fn coord(&self) -> ChunkCoord {
        self.coord
    }
}

/// Inserts a new chunk unless one already exists.
fn create_chunk(world: &SharedWorld, job: &CreateJob) -> WorldResult<JobOutcome> {
    if world.chunks.read().contains_key(&job.coord) {
        return Ok(JobOutcome::Skipped);
    }
    let chunk = Arc::new(Chunk::new(job.coord));
    let mut chunks = world.chunks.write();
    if chunks.contains_key(&job.coord) {
        return Ok(JobOutcome::Skipped);
    }
    chunks.insert(job.coord, chunk);
    debug!("Created chunk {}", job.coord);
    Ok(JobOutcome::Done)
}

/// Generates terrain, then invalidates meshed neighbors so their shared face is re-culled.
fn generate_terrain(world: &SharedWorld, job: &TerrainJob) -> WorldResult<JobOutcome> {
    let Some(chunk) = world.chunk(job.coord) else {
        return Ok(JobOutcome::Skipped);
    };
    if !chunk.generate_terrain(&world.generator)? {
        return Ok(JobOutcome::Skipped);
    }
    for dir in Direction::ALL {
        let [dx, dy, dz] = dir.offset();
        if let Some(neighbor) = world.chunk(job.coord.offset(dx, dy, dz)) {
            if neighbor.state().has_mesh() {
                neighbor.invalidate_mesh();
            }
        }
    }
    Ok(JobOutcome::Done)
}

/// Meshes a chunk once every neighbor is resolved.
///
/// A neighbor is resolved when it has terrain, or when no terrain is coming:
/// it lies outside the view window, or it is absent while generation is off.
fn generate_mesh(world: &SharedWorld, job: &MeshJob) -> WorldResult<JobOutcome> {
    let Some(chunk) = world.chunk(job.coord) else {
        return Ok(JobOutcome::Skipped);
    };
    if chunk.state() != ChunkState::TerrainGenerated || !world.in_view(job.coord) {
        return Ok(JobOutcome::Skipped);
    }

    let mut neighbors = NeighborFaces::none();
    for dir in Direction::ALL {
        let [dx, dy, dz] = dir.offset();
        let coord = job.coord.offset(dx, dy, dz);
        let neighbor = world.chunk(coord);
        match neighbor.as_ref().and_then(|n| n.boundary_plane(dir.opposite())) {
            Some(plane) => neighbors.set(dir, plane),
            None if world.awaits_terrain(coord, neighbor.is_some()) => {
                return Ok(JobOutcome::Deferred);
            },
            None => {},
        }
    }

    let technique = world.technique.read();
    chunk.generate_mesh(*technique, &neighbors)?;
    world.meshed.insert(job.coord);
    Ok(JobOutcome::Done)
}

/// Exposes an up-to-date chunk's game object to the caller.
fn activate(
    active: &mut HashMap<ChunkCoord, GameObjectId, ChunkCoordBuildHasher>,
    chunk: &Chunk,
    live: &mut GameObjectMap,
) {
    if !chunk.state().is_up_to_date() {
        return;
    }
    let Some(object) = chunk.game_object() else {
        return;
    };
    let id = object.read().id();
    active.insert(chunk.coord(), id);
    live.entry(id).or_insert_with(|| Arc::clone(object));
}

/// Owns the world's chunks and streams them around the viewer.
pub struct ChunkManager {
    world: Arc<SharedWorld>,
    /// Chunks currently exposed to the caller
    active: HashMap<ChunkCoord, GameObjectId, ChunkCoordBuildHasher>,
    /// Chunks that may hold mesh buffers
    resident: HashSet<ChunkCoord, ChunkCoordBuildHasher>,
    creation: Stage<CreateJob>,
    terrain: Stage<TerrainJob>,
    mesh: Stage<MeshJob>,
    model_factory: Box<dyn ModelFactory>,
    scan: ScanOrder,
}

impl ChunkManager {
    /// Validates `config` and starts the worker pools.
    pub fn new(config: &WorldConfig, model_factory: Box<dyn ModelFactory>) -> WorldResult<Self> {
        config.validate()?;
        let world = Arc::new(SharedWorld {
            chunks: RwLock::new(ChunkMap::default()),
            generator: TerrainGenerator::new(config.terrain.clone()),
            view: RwLock::new(None),
            generating: AtomicBool::new(config.generate_chunks),
            technique: RwLock::new(config.meshing_technique),
            meshed: DashSet::with_hasher(ChunkCoordBuildHasher::default()),
        });
        let stop = Arc::new(AtomicBool::new(false));
        let p = &config.pipeline;

        let w = Arc::clone(&world);
        let creation = Stage::spawn(
            "creation",
            p.creation_workers,
            p.queue_capacity,
            Arc::clone(&stop),
            move |job: &CreateJob| create_chunk(&w, job),
        )?;
        let w = Arc::clone(&world);
        let terrain = Stage::spawn(
            "terrain",
            p.terrain_workers,
            p.queue_capacity,
            Arc::clone(&stop),
            move |job: &TerrainJob| generate_terrain(&w, job),
        )?;
        let w = Arc::clone(&world);
        let mesh = Stage::spawn(
            "mesh",
            p.mesh_workers,
            p.queue_capacity,
            stop,
            move |job: &MeshJob| generate_mesh(&w, job),
        )?;

        info!(
            "Chunk manager started: {} meshing, seed {}, {}/{}/{} workers",
            config.meshing_technique,
            config.terrain.seed,
            p.creation_workers,
            p.terrain_workers,
            p.mesh_workers
        );

        Ok(Self {
            world,
            active: HashMap::default(),
            resident: HashSet::default(),
            creation,
            terrain,
            mesh,
            model_factory,
            scan: ScanOrder::new(config.render_distance),
        })
    }

    /// Advances every chunk around `viewer` by one pipeline step.
    ///
    /// Up-to-date chunks in range are inserted into `live`; previously active
    /// chunks now out of range are removed from it and have their meshes
    /// released.
    pub fn update(&mut self, viewer: Vec3, view_distance: u32, live: &mut GameObjectMap) {
        let window = ViewWindow {
            center: ChunkCoord::from_world_pos(viewer),
            distance: view_distance,
        };
        *self.world.view.write() = Some(window);
        if self.scan.distance != view_distance {
            self.scan = ScanOrder::new(view_distance);
        }
        let generating = self.world.generating.load(Ordering::Acquire);

        let mut in_range: HashSet<ChunkCoord, ChunkCoordBuildHasher> = HashSet::default();
        for &[dx, dy, dz] in &self.scan.offsets {
            let coord = window.center.offset(dx, dy, dz);
            in_range.insert(coord);

            let Some(chunk) = self.world.chunk(coord) else {
                if generating {
                    self.creation.submit(CreateJob { coord });
                }
                continue;
            };

            match chunk.state() {
                ChunkState::Uninitialized => {
                    self.terrain.submit(TerrainJob { coord });
                },
                ChunkState::TerrainGenerated => {
                    self.mesh.submit(MeshJob { coord });
                },
                ChunkState::MeshGenerated => {
                    chunk.update_game_object(self.model_factory.as_ref());
                    activate(&mut self.active, &chunk, live);
                },
                ChunkState::UpToDate => activate(&mut self.active, &chunk, live),
            }
        }

        let finished: Vec<ChunkCoord> = self.world.meshed.iter().map(|c| *c).collect();
        for coord in finished {
            self.world.meshed.remove(&coord);
            self.resident.insert(coord);
        }

        let leaving: HashSet<ChunkCoord, ChunkCoordBuildHasher> = self
            .resident
            .iter()
            .chain(self.active.keys())
            .filter(|coord| !in_range.contains(coord))
            .copied()
            .collect();
        for coord in leaving {
            if let Some(id) = self.active.remove(&coord) {
                live.remove(&id);
            }
            self.resident.remove(&coord);
            if let Some(chunk) = self.world.chunk(coord) {
                chunk.clear_mesh();
            }
            debug!("Demoted chunk {coord}");
        }
    }

    /// Marks every chunk's mesh stale so it is rebuilt on the next scans.
    pub fn regenerate_entire_mesh(&self) {
        let chunks = self.world.chunks.read();
        for chunk in chunks.values() {
            chunk.invalidate_mesh();
        }
        info!("Invalidated meshes of {} chunks", chunks.len());
    }

    /// Applies a new configuration.
    ///
    /// A changed meshing technique triggers [`Self::regenerate_entire_mesh`].
    /// Terrain and worker settings only take effect on a new manager.
    pub fn apply_config(&mut self, config: &WorldConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.set_generate_chunks(config.generate_chunks);
        let previous = {
            let mut technique = self.world.technique.write();
            std::mem::replace(&mut *technique, config.meshing_technique)
        };
        if previous != config.meshing_technique {
            info!(
                "Meshing technique changed: {previous} -> {}",
                config.meshing_technique
            );
            self.regenerate_entire_mesh();
        }
        Ok(())
    }

    /// Enables or disables creation of chunks missing from the map.
    pub fn set_generate_chunks(&self, enabled: bool) {
        self.world.generating.store(enabled, Ordering::Release);
    }

    /// Returns true if missing chunks are being created.
    #[must_use]
    pub fn is_generating(&self) -> bool {
        self.world.generating.load(Ordering::Acquire)
    }

    /// Returns the active meshing technique.
    #[must_use]
    pub fn technique(&self) -> MeshingTechnique {
        *self.world.technique.read()
    }

    /// Returns the chunk at `coord`, if loaded.
    #[must_use]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<Arc<Chunk>> {
        self.world.chunk(coord)
    }

    /// Number of chunks in the map.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.world.chunks.read().len()
    }

    /// Returns true if `coord` is currently exposed in the live-object set.
    #[must_use]
    pub fn is_active(&self, coord: ChunkCoord) -> bool {
        self.active.contains_key(&coord)
    }

    /// Collects residency and pipeline counters.
    #[must_use]
    pub fn stats(&self) -> ManagerStats {
        let mut stats = ManagerStats {
            loaded_chunks: self.chunk_count(),
            active_chunks: self.active.len(),
            pending_creation: self.creation.pending(),
            pending_terrain: self.terrain.pending(),
            pending_mesh: self.mesh.pending(),
            ..ManagerStats::default()
        };
        for &coord in self.active.keys() {
            if let Some(chunk) = self.world.chunk(coord) {
                let (vertices, indices) = chunk.mesh_counts();
                stats.vertices += vertices;
                stats.indices += indices;
            }
        }
        stats
    }

    /// Serializes every chunk with terrain as a world file, ordered by coordinate.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut chunks: Vec<Arc<Chunk>> = self
            .world
            .chunks
            .read()
            .values()
            .filter(|c| c.state().has_terrain())
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.coord());
        save::encode_world(chunks.iter().map(|c| &**c))
    }

    /// Loads a world file, replacing chunks at the same coordinates.
    ///
    /// The whole file is parsed before anything changes, so a malformed file
    /// leaves the world untouched. Replaced chunks keep their game objects,
    /// and every mesh is invalidated so seams are recomputed.
    pub fn deserialize(&self, data: &[u8]) -> SaveResult<usize> {
        let loaded = save::decode_world(data)?;
        let count = loaded.len();
        {
            let mut chunks = self.world.chunks.write();
            for chunk in loaded {
                let coord = chunk.coord();
                let object = chunks
                    .get(&coord)
                    .and_then(|old| old.game_object().cloned())
                    .unwrap_or_else(|| {
                        let origin = Transform::from_translation(coord.world_origin_vec3());
                        GameObject::new(origin).shared()
                    });
                chunks.insert(coord, Arc::new(chunk.with_game_object(object)));
            }
        }
        self.regenerate_entire_mesh();
        info!("Loaded {count} chunks");
        Ok(count)
    }

    /// Writes the world file to `path`, creating parent directories.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> SaveResult<usize> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = self.serialize();
        fs::write(path, &bytes)?;
        let count = self
            .world
            .chunks
            .read()
            .values()
            .filter(|c| c.state().has_terrain())
            .count();
        info!("Saved {count} chunks ({} bytes) to {}", bytes.len(), path.display());
        Ok(count)
    }

    /// Reads a world file from `path`; see [`Self::deserialize`].
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> SaveResult<usize> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let count = self.deserialize(&bytes)?;
        info!("Loaded world from {}", path.display());
        Ok(count)
    }

    /// Stops and joins all workers. Called automatically on drop.
    pub fn shutdown(&mut self) {
        let workers =
            self.creation.worker_count() + self.terrain.worker_count() + self.mesh.worker_count();
        if workers == 0 {
            return;
        }
        self.creation.shutdown();
        self.terrain.shutdown();
        self.mesh.shutdown();
        info!("Chunk manager shut down");
    }
}

impl Drop for ChunkManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ChunkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkManager")
            .field("chunks", &self.chunk_count())
            .field("active", &self.active.len())
            .field("technique", &self.technique())
            .field("creation", &self.creation)
            .field("terrain", &self.terrain)
            .field("mesh", &self.mesh)
            .finish_non_exhaustive()
    }
}
