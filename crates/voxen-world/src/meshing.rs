//! Simple and greedy chunk meshers.
//!
//! Both meshers share one exposure test: a face is emitted when the adjacent
//! voxel is AIR, or when it lies across a chunk boundary whose neighbor is not
//! available. Missing neighbors therefore never leave holes; at worst they
//! produce a hidden face that is culled on the next remesh.
//!
//! Neighbor voxels come from [`BoundaryPlane`] snapshots taken before the
//! chunk being meshed is locked, so the meshers never touch another chunk.

use serde::{Deserialize, Serialize};
use std::fmt;
use voxen_common::{ConfigError, CHUNK_AREA, CHUNK_SIZE, CHUNK_VOLUME};

use crate::block::{Block, BlockType};
use crate::chunk::block_index;
use crate::mesh::{Direction, MeshData};

/// Meshing algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshingTechnique {
    /// One quad per exposed voxel face
    Simple,
    /// Coplanar same-type faces merged into rectangles
    #[default]
    Greedy,
}

impl TryFrom<i32> for MeshingTechnique {
    type Error = ConfigError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Simple),
            1 => Ok(Self::Greedy),
            other => Err(ConfigError::InvalidMeshingTechnique(other)),
        }
    }
}

impl fmt::Display for MeshingTechnique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => f.write_str("simple"),
            Self::Greedy => f.write_str("greedy"),
        }
    }
}

/// Copy of the outermost voxel layer on one face of a chunk.
///
/// Indexed by the face's in-plane axes, see [`Direction::plane_axes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryPlane {
    blocks: Box<[BlockType; CHUNK_AREA]>,
}

impl BoundaryPlane {
    /// Copies the layer of `blocks` that touches `face`.
    #[must_use]
    pub fn extract(blocks: &[Block; CHUNK_VOLUME], face: Direction) -> Self {
        let axis = face.axis();
        let (ua, va) = face.plane_axes();
        let layer = if face.is_positive() { CHUNK_SIZE - 1 } else { 0 };
        let mut plane = Box::new([BlockType::Air; CHUNK_AREA]);
        for v in 0..CHUNK_SIZE {
            for u in 0..CHUNK_SIZE {
                let mut pos = [0; 3];
                pos[axis] = layer;
                pos[ua] = u;
                pos[va] = v;
                plane[u + v * CHUNK_SIZE] = blocks[block_index(pos[0], pos[1], pos[2])].block_type;
            }
        }
        Self { blocks: plane }
    }

    /// A plane made of a single block type.
    #[must_use]
    pub fn uniform(block_type: BlockType) -> Self {
        Self {
            blocks: Box::new([block_type; CHUNK_AREA]),
        }
    }

    /// Block at in-plane coordinate `(u, v)`.
    #[must_use]
    pub fn get(&self, u: usize, v: usize) -> BlockType {
        self.blocks[u + v * CHUNK_SIZE]
    }
}

/// Boundary planes of the six face neighbors, `None` where a neighbor is absent.
#[derive(Debug, Clone, Default)]
pub struct NeighborFaces {
    planes: [Option<BoundaryPlane>; 6],
}

impl NeighborFaces {
    /// No neighbors resolved.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Sets the plane of the neighbor lying in `direction`.
    pub fn set(&mut self, direction: Direction, plane: BoundaryPlane) {
        self.planes[direction.index()] = Some(plane);
    }

    /// Plane of the neighbor lying in `direction`.
    #[must_use]
    pub fn get(&self, direction: Direction) -> Option<&BoundaryPlane> {
        self.planes[direction.index()].as_ref()
    }

    /// Number of resolved neighbors.
    #[must_use]
    pub fn resolved(&self) -> usize {
        self.planes.iter().filter(|p| p.is_some()).count()
    }
}

/// Builds a mesh with the selected technique.
#[must_use]
pub fn generate_mesh(
    technique: MeshingTechnique,
    blocks: &[Block; CHUNK_VOLUME],
    neighbors: &NeighborFaces,
) -> MeshData {
    match technique {
        MeshingTechnique::Simple => generate_simple_mesh(blocks, neighbors),
        MeshingTechnique::Greedy => generate_greedy_mesh(blocks, neighbors),
    }
}

/// One unit quad per exposed face.
#[must_use]
pub fn generate_simple_mesh(blocks: &[Block; CHUNK_VOLUME], neighbors: &NeighborFaces) -> MeshData {
    let mut mesh = MeshData::new();
    for z in 0..CHUNK_SIZE {
        for y in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let block_type = blocks[block_index(x, y, z)].block_type;
                if block_type.is_air() {
                    continue;
                }
                let pos = [x, y, z];
                for dir in Direction::ALL {
                    if is_face_exposed(blocks, neighbors, pos, dir) {
                        let (ua, va) = dir.plane_axes();
                        let origin = (pos[ua], pos[va]);
                        emit_quad(&mut mesh, dir, pos[dir.axis()], origin, (1, 1), block_type);
                    }
                }
            }
        }
    }
    mesh
}

/// Merges coplanar exposed faces of the same type into maximal rectangles.
#[must_use]
pub fn generate_greedy_mesh(blocks: &[Block; CHUNK_VOLUME], neighbors: &NeighborFaces) -> MeshData {
    let mut mesh = MeshData::new();
    let mut mask = [None::<BlockType>; CHUNK_AREA];
    let mut visited = [false; CHUNK_AREA];

    for dir in Direction::ALL {
        let axis = dir.axis();
        let (ua, va) = dir.plane_axes();

        for layer in 0..CHUNK_SIZE {
            for v in 0..CHUNK_SIZE {
                for u in 0..CHUNK_SIZE {
                    let mut pos = [0; 3];
                    pos[axis] = layer;
                    pos[ua] = u;
                    pos[va] = v;
                    let block_type = blocks[block_index(pos[0], pos[1], pos[2])].block_type;
                    mask[u + v * CHUNK_SIZE] = (!block_type.is_air()
                        && is_face_exposed(blocks, neighbors, pos, dir))
                    .then_some(block_type);
                }
            }
            visited.fill(false);

            for v in 0..CHUNK_SIZE {
                let mut u = 0;
                while u < CHUNK_SIZE {
                    let cell = u + v * CHUNK_SIZE;
                    let Some(block_type) = mask[cell].filter(|_| !visited[cell]) else {
                        u += 1;
                        continue;
                    };
                    let same = |c: usize| mask[c] == Some(block_type) && !visited[c];

                    let mut width = 1;
                    while u + width < CHUNK_SIZE && same(cell + width) {
                        width += 1;
                    }

                    let mut height = 1;
                    'grow: while v + height < CHUNK_SIZE {
                        let row = u + (v + height) * CHUNK_SIZE;
                        for k in 0..width {
                            if !same(row + k) {
                                break 'grow;
                            }
                        }
                        height += 1;
                    }

                    for dv in 0..height {
                        let row = u + (v + dv) * CHUNK_SIZE;
                        visited[row..row + width].fill(true);
                    }
                    emit_quad(&mut mesh, dir, layer, (u, v), (width, height), block_type);
                    u += width;
                }
            }
        }
    }
    mesh
}

/// Type of the voxel adjacent to `pos` in `dir`, `None` if it lies in an absent neighbor.
fn adjacent(
    blocks: &[Block; CHUNK_VOLUME],
    neighbors: &NeighborFaces,
    pos: [usize; 3],
    dir: Direction,
) -> Option<BlockType> {
    let axis = dir.axis();
    let mut next = pos;
    if dir.is_positive() && pos[axis] + 1 < CHUNK_SIZE {
        next[axis] += 1;
    } else if !dir.is_positive() && pos[axis] > 0 {
        next[axis] -= 1;
    } else {
        let (ua, va) = dir.plane_axes();
        return neighbors.get(dir).map(|plane| plane.get(pos[ua], pos[va]));
    }
    Some(blocks[block_index(next[0], next[1], next[2])].block_type)
}

fn is_face_exposed(
    blocks: &[Block; CHUNK_VOLUME],
    neighbors: &NeighborFaces,
    pos: [usize; 3],
    dir: Direction,
) -> bool {
    adjacent(blocks, neighbors, pos, dir).map_or(true, BlockType::is_air)
}

/// Emits a `size.0 x size.1` quad on the `dir` face of `layer`, starting at `origin` in (u, v).
fn emit_quad(
    mesh: &mut MeshData,
    dir: Direction,
    layer: usize,
    origin: (usize, usize),
    size: (usize, usize),
    block_type: BlockType,
) {
    let axis = dir.axis();
    let (ua, va) = dir.plane_axes();
    let plane = (if dir.is_positive() { layer + 1 } else { layer }) as f32;
    let (u0, v0) = origin;
    let (w, h) = size;
    let corner = |u: usize, v: usize| {
        let mut p = [0.0; 3];
        p[axis] = plane;
        p[ua] = u as f32;
        p[va] = v as f32;
        p
    };
    let corners = [
        corner(u0, v0),
        corner(u0 + w, v0),
        corner(u0 + w, v0 + h),
        corner(u0, v0 + h),
    ];
    let (wf, hf) = (w as f32, h as f32);
    let uvs = [[0.0, 0.0], [wf, 0.0], [wf, hf], [0.0, hf]];
    // u x v points along +X and +Z for X/Z faces but along -Y for Y faces.
    let right_handed = axis != 1;
    mesh.push_quad(corners, uvs, dir, block_type, dir.is_positive() != right_handed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn empty_blocks() -> Box<[Block; CHUNK_VOLUME]> {
        Box::new([Block::AIR; CHUNK_VOLUME])
    }

    fn solid_blocks(block_type: BlockType) -> Box<[Block; CHUNK_VOLUME]> {
        Box::new([Block::new(block_type); CHUNK_VOLUME])
    }

    fn enclosed_by(block_type: BlockType) -> NeighborFaces {
        let mut neighbors = NeighborFaces::none();
        for dir in Direction::ALL {
            neighbors.set(dir, BoundaryPlane::uniform(block_type));
        }
        neighbors
    }

    /// Expands every quad into the unit faces it covers.
    fn unit_faces(mesh: &MeshData) -> BTreeSet<([i32; 3], usize, u32)> {
        let mut faces = BTreeSet::new();
        for quad in mesh.vertices.chunks(4) {
            let dir = Direction::ALL
                .into_iter()
                .find(|d| d.normal().to_array() == quad[0].normal)
                .expect("axis-aligned normal");
            let axis = dir.axis();
            let (ua, va) = dir.plane_axes();
            let lo = |a: usize| quad.iter().map(|v| v.position[a] as i32).min().expect("corners");
            let hi = |a: usize| quad.iter().map(|v| v.position[a] as i32).max().expect("corners");
            let plane = quad[0].position[axis] as i32;
            let layer = if dir.is_positive() { plane - 1 } else { plane };
            for u in lo(ua)..hi(ua) {
                for v in lo(va)..hi(va) {
                    let mut p = [0; 3];
                    p[axis] = layer;
                    p[ua] = u;
                    p[va] = v;
                    faces.insert((p, dir.index(), quad[0].block_type));
                }
            }
        }
        faces
    }

    fn assert_outward_winding(mesh: &MeshData) {
        for tri in mesh.indices.chunks(3) {
            let p = |i: u32| Vec3::from_array(mesh.vertices[i as usize].position);
            let n = Vec3::from_array(mesh.vertices[tri[0] as usize].normal);
            let geometric = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
            assert!(geometric.dot(n) > 0.0, "triangle {tri:?} faces inward");
        }
    }

    #[test]
    fn test_single_voxel_simple() {
        let mut blocks = empty_blocks();
        blocks[block_index(8, 8, 8)] = Block::new(BlockType::Stone);
        let mesh = generate_simple_mesh(&blocks, &NeighborFaces::none());
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert_outward_winding(&mesh);
    }

    #[test]
    fn test_single_voxel_greedy_matches_simple() {
        let mut blocks = empty_blocks();
        blocks[block_index(0, 15, 3)] = Block::new(BlockType::Grass);
        let simple = generate_simple_mesh(&blocks, &NeighborFaces::none());
        let greedy = generate_greedy_mesh(&blocks, &NeighborFaces::none());
        assert_eq!(greedy.vertices.len(), 24);
        assert_eq!(greedy.indices.len(), 36);
        assert_eq!(unit_faces(&simple), unit_faces(&greedy));
    }

    #[test]
    fn test_full_enclosure_has_no_faces() {
        let blocks = solid_blocks(BlockType::Stone);
        let neighbors = enclosed_by(BlockType::Stone);
        assert!(generate_simple_mesh(&blocks, &neighbors).is_empty());
        assert!(generate_greedy_mesh(&blocks, &neighbors).is_empty());
    }

    #[test]
    fn test_absent_neighbors_render_boundary() {
        let blocks = solid_blocks(BlockType::Stone);
        let simple = generate_simple_mesh(&blocks, &NeighborFaces::none());
        let greedy = generate_greedy_mesh(&blocks, &NeighborFaces::none());
        assert_eq!(simple.quad_count(), 6 * CHUNK_AREA);
        assert_eq!(greedy.quad_count(), 6);
        assert_outward_winding(&greedy);
    }

    #[test]
    fn test_single_air_neighbor_face() {
        let blocks = solid_blocks(BlockType::Dirt);
        let mut neighbors = enclosed_by(BlockType::Stone);
        neighbors.set(Direction::Right, BoundaryPlane::uniform(BlockType::Air));
        let greedy = generate_greedy_mesh(&blocks, &neighbors);
        assert_eq!(greedy.quad_count(), 1);
        assert_eq!(greedy.vertices[0].normal, [1.0, 0.0, 0.0]);
        assert!(greedy.vertices.iter().all(|v| v.position[0] == 16.0));
        assert_eq!(generate_simple_mesh(&blocks, &neighbors).quad_count(), CHUNK_AREA);
    }

    #[test]
    fn test_greedy_merges_flat_layer_with_tiled_uvs() {
        let mut blocks = empty_blocks();
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                blocks[block_index(x, 0, z)] = Block::new(BlockType::Sand);
            }
        }
        let greedy = generate_greedy_mesh(&blocks, &NeighborFaces::none());
        assert_eq!(greedy.quad_count(), 6);
        let top = greedy
            .vertices
            .chunks(4)
            .find(|q| q[0].normal == [0.0, 1.0, 0.0])
            .expect("top face");
        assert!(top.iter().any(|v| v.uv == [16.0, 16.0]));
        assert!(top.iter().all(|v| v.position[1] == 1.0));
        assert_outward_winding(&greedy);
    }

    #[test]
    fn test_boundary_plane_extract() {
        let mut blocks = empty_blocks();
        blocks[block_index(15, 2, 5)] = Block::new(BlockType::Wood);
        let right = BoundaryPlane::extract(&blocks, Direction::Right);
        // X faces span (Y, Z).
        assert_eq!(right.get(2, 5), BlockType::Wood);
        let left = BoundaryPlane::extract(&blocks, Direction::Left);
        assert_eq!(left.get(2, 5), BlockType::Air);
    }

    #[test]
    fn test_technique_from_int() {
        assert_eq!(MeshingTechnique::try_from(0).ok(), Some(MeshingTechnique::Simple));
        assert_eq!(MeshingTechnique::try_from(1).ok(), Some(MeshingTechnique::Greedy));
        assert!(matches!(
            MeshingTechnique::try_from(2),
            Err(ConfigError::InvalidMeshingTechnique(2))
        ));
    }

    fn block_strategy() -> impl Strategy<Value = Block> {
        (0u8..8).prop_map(|b| {
            let ty = match b {
                4 => BlockType::Dirt,
                5 => BlockType::Grass,
                6 => BlockType::Stone,
                7 => BlockType::Water,
                _ => BlockType::Air,
            };
            Block::new(ty)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_greedy_silhouette_matches_simple(
            cells in proptest::collection::vec(block_strategy(), CHUNK_VOLUME),
            capped in any::<bool>(),
        ) {
            let mut blocks = empty_blocks();
            blocks.copy_from_slice(&cells);
            let mut neighbors = NeighborFaces::none();
            if capped {
                neighbors.set(Direction::Top, BoundaryPlane::uniform(BlockType::Stone));
                neighbors.set(Direction::Left, BoundaryPlane::uniform(BlockType::Air));
            }
            let simple = generate_simple_mesh(&blocks, &neighbors);
            let greedy = generate_greedy_mesh(&blocks, &neighbors);
            prop_assert_eq!(unit_faces(&simple), unit_faces(&greedy));
            prop_assert!(greedy.vertices.len() <= simple.vertices.len());
            prop_assert!(greedy.indices.len() <= simple.indices.len());
        }
    }
}
