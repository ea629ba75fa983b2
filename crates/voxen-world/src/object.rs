//! Game objects and the render-model seam.
//!
//! The world never touches GPU resources itself. A [`ModelFactory`] supplied by
//! the caller turns mesh arrays into an opaque [`RenderModel`], and each chunk
//! carries a [`GameObject`] that pairs that model with a world transform.

use ahash::AHashMap;
use glam::{Mat4, Quat, Vec3};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use voxen_common::GameObjectId;

use crate::mesh::MeshData;

/// Renderable produced from a mesh. Opaque to the world.
pub trait RenderModel: Send + Sync + fmt::Debug {
    /// Number of vertices uploaded.
    fn vertex_count(&self) -> usize;
    /// Number of indices uploaded.
    fn index_count(&self) -> usize;
}

/// Builds renderables from mesh data.
///
/// Only called from the thread driving [`ChunkManager::update`](crate::ChunkManager::update).
pub trait ModelFactory {
    /// Creates a renderable for a non-empty mesh.
    fn create_model(&self, mesh: &MeshData) -> Arc<dyn RenderModel>;
}

/// Position, rotation and scale of a game object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// World-space translation
    pub translation: Vec3,
    /// Rotation
    pub rotation: Quat,
    /// Per-axis scale
    pub scale: Vec3,
}

impl Transform {
    /// A transform that only translates.
    #[must_use]
    pub const fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Model matrix.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_translation(Vec3::ZERO)
    }
}

/// An object in the caller's live-object registry.
#[derive(Debug, Clone)]
pub struct GameObject {
    id: GameObjectId,
    /// World transform
    pub transform: Transform,
    /// Current renderable, `None` when there is nothing to draw
    pub model: Option<Arc<dyn RenderModel>>,
}

impl GameObject {
    /// Creates an object with a fresh ID and no model.
    #[must_use]
    pub fn new(transform: Transform) -> Self {
        Self {
            id: GameObjectId::new(),
            transform,
            model: None,
        }
    }

    /// Wraps the object for sharing between a chunk and the registry.
    #[must_use]
    pub fn shared(self) -> SharedGameObject {
        Arc::new(RwLock::new(self))
    }

    /// Returns the object ID.
    #[must_use]
    pub const fn id(&self) -> GameObjectId {
        self.id
    }
}

/// A game object shared between its chunk and the live-object registry.
pub type SharedGameObject = Arc<RwLock<GameObject>>;

/// Caller-owned registry of live objects, keyed by ID.
pub type GameObjectMap = AHashMap<GameObjectId, SharedGameObject>;

/// Renderable that keeps the mesh in CPU memory.
#[derive(Debug, Clone, Default)]
pub struct CpuModel {
    /// Copied mesh
    pub mesh: MeshData,
}

impl RenderModel for CpuModel {
    fn vertex_count(&self) -> usize {
        self.mesh.vertices.len()
    }

    fn index_count(&self) -> usize {
        self.mesh.indices.len()
    }
}

/// Headless [`ModelFactory`] producing [`CpuModel`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuModelFactory;

impl ModelFactory for CpuModelFactory {
    fn create_model(&self, mesh: &MeshData) -> Arc<dyn RenderModel> {
        Arc::new(CpuModel { mesh: mesh.clone() })
    }
}
