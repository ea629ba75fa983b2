//! Mesh buffers and face directions.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::block::BlockType;

/// Vertex layout handed to the render backend.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    /// Chunk-local position
    pub position: [f32; 3],
    /// Linear RGB color
    pub color: [f32; 3],
    /// Outward face normal
    pub normal: [f32; 3],
    /// Texture coordinates, scaled by quad size for tiling
    pub uv: [f32; 2],
    /// Block type byte widened for the shader
    pub block_type: u32,
}

/// Vertex and index arrays for one chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertices, four per quad
    pub vertices: Vec<Vertex>,
    /// Triangle indices, six per quad
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Creates an empty mesh.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Returns true if the mesh has no geometry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of quads (faces) in the mesh.
    #[must_use]
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    /// Number of triangles in the mesh.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Appends a quad. `corners` run counter-clockwise in the quad's (u, v)
    /// plane; `flip` reverses the triangle winding.
    pub(crate) fn push_quad(
        &mut self,
        corners: [[f32; 3]; 4],
        uvs: [[f32; 2]; 4],
        direction: Direction,
        block_type: BlockType,
        flip: bool,
    ) {
        let base = self.vertices.len() as u32;
        let color = block_type.color();
        let normal = direction.normal().to_array();
        for (position, uv) in corners.into_iter().zip(uvs) {
            self.vertices.push(Vertex {
                position,
                color,
                normal,
                uv,
                block_type: u32::from(block_type.as_u8()),
            });
        }
        let order: [u32; 6] = if flip {
            [0, 2, 1, 0, 3, 2]
        } else {
            [0, 1, 2, 0, 2, 3]
        };
        self.indices.extend(order.iter().map(|i| base + i));
    }

    /// Releases all geometry and its backing memory.
    pub fn release(&mut self) {
        self.vertices = Vec::new();
        self.indices = Vec::new();
    }
}

/// One of the six axis-aligned face directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// +Y
    Top,
    /// -Y
    Bottom,
    /// -Z
    Front,
    /// +Z
    Back,
    /// -X
    Left,
    /// +X
    Right,
}

impl Direction {
    /// All directions, in index order.
    pub const ALL: [Self; 6] = [
        Self::Top,
        Self::Bottom,
        Self::Front,
        Self::Back,
        Self::Left,
        Self::Right,
    ];

    /// Stable index in `0..6`.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Axis of the face normal: 0 = X, 1 = Y, 2 = Z.
    #[must_use]
    pub const fn axis(self) -> usize {
        match self {
            Self::Left | Self::Right => 0,
            Self::Top | Self::Bottom => 1,
            Self::Front | Self::Back => 2,
        }
    }

    /// True if the normal points along the positive axis.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        matches!(self, Self::Top | Self::Back | Self::Right)
    }

    /// The direction facing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
            Self::Front => Self::Back,
            Self::Back => Self::Front,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Unit step along the normal.
    #[must_use]
    pub const fn offset(self) -> [i32; 3] {
        match self {
            Self::Top => [0, 1, 0],
            Self::Bottom => [0, -1, 0],
            Self::Front => [0, 0, -1],
            Self::Back => [0, 0, 1],
            Self::Left => [-1, 0, 0],
            Self::Right => [1, 0, 0],
        }
    }

    /// Outward unit normal.
    #[must_use]
    pub fn normal(self) -> Vec3 {
        let [x, y, z] = self.offset();
        Vec3::new(x as f32, y as f32, z as f32)
    }

    /// In-plane axes `(u, v)` for faces with this normal.
    ///
    /// X faces span (Y, Z), Y faces span (X, Z), Z faces span (X, Y).
    #[must_use]
    pub const fn plane_axes(self) -> (usize, usize) {
        match self.axis() {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        }
    }
}
