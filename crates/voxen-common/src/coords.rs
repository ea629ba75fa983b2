//! Coordinate types for chunk and voxel positions.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::hash::{morton_encode, splitmix64};

/// Edge length of a cubic chunk, in voxels.
pub const CHUNK_SIZE: usize = 16;

/// [`CHUNK_SIZE`] as a signed integer for coordinate arithmetic.
pub const CHUNK_SIZE_I32: i32 = CHUNK_SIZE as i32;

/// Number of voxels on one face of a chunk.
pub const CHUNK_AREA: usize = CHUNK_SIZE * CHUNK_SIZE;

/// Number of voxels in a chunk.
pub const CHUNK_VOLUME: usize = CHUNK_AREA * CHUNK_SIZE;

/// Chunk coordinate (identifies a chunk in the world grid).
///
/// Equality is by value. Hashing feeds the Morton/SplitMix64 spatial hash
/// to the hasher, so neighbouring chunks land in unrelated buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// X coordinate in chunk space
    pub x: i32,
    /// Y coordinate in chunk space
    pub y: i32,
    /// Z coordinate in chunk space
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the chunk containing a world-space position (floor division per axis).
    #[must_use]
    pub fn from_world_pos(pos: Vec3) -> Self {
        let size = CHUNK_SIZE as f32;
        Self {
            x: (pos.x / size).floor() as i32,
            y: (pos.y / size).floor() as i32,
            z: (pos.z / size).floor() as i32,
        }
    }

    /// Returns the chunk containing a world voxel coordinate.
    #[must_use]
    pub const fn from_voxel(x: i32, y: i32, z: i32) -> Self {
        Self {
            x: x.div_euclid(CHUNK_SIZE_I32),
            y: y.div_euclid(CHUNK_SIZE_I32),
            z: z.div_euclid(CHUNK_SIZE_I32),
        }
    }

    /// World-space voxel coordinate of this chunk's minimum corner.
    #[must_use]
    pub const fn world_origin(self) -> [i32; 3] {
        [
            self.x.wrapping_mul(CHUNK_SIZE_I32),
            self.y.wrapping_mul(CHUNK_SIZE_I32),
            self.z.wrapping_mul(CHUNK_SIZE_I32),
        ]
    }

    /// World-space position of this chunk's minimum corner.
    #[must_use]
    pub fn world_origin_vec3(self) -> Vec3 {
        let [x, y, z] = self.world_origin();
        Vec3::new(x as f32, y as f32, z as f32)
    }

    /// Returns the coordinate displaced by the given chunk offset.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x.wrapping_add(dx),
            y: self.y.wrapping_add(dy),
            z: self.z.wrapping_add(dz),
        }
    }

    /// Squared distance to another chunk, in chunk units.
    #[must_use]
    pub const fn distance_squared(self, other: Self) -> i64 {
        let dx = (self.x as i64) - (other.x as i64);
        let dy = (self.y as i64) - (other.y as i64);
        let dz = (self.z as i64) - (other.z as i64);
        dx * dx + dy * dy + dz * dz
    }

    /// Spatial hash: Morton interleave followed by a SplitMix64 finalizer.
    #[must_use]
    pub const fn spatial_hash(self) -> u64 {
        splitmix64(morton_encode(self.x, self.y, self.z))
    }
}

impl Hash for ChunkCoord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.spatial_hash());
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_division_on_negative_positions() {
        assert_eq!(
            ChunkCoord::from_world_pos(Vec3::new(-0.1, -16.0, -16.1)),
            ChunkCoord::new(-1, -1, -2)
        );
        assert_eq!(ChunkCoord::from_voxel(-1, 15, 16), ChunkCoord::new(-1, 0, 1));
    }

    #[test]
    fn test_offset_and_distance() {
        let a = ChunkCoord::new(1, 2, 3);
        let b = a.offset(2, -1, 0);
        assert_eq!(b, ChunkCoord::new(3, 1, 3));
        assert_eq!(a.distance_squared(b), 5);
    }

    #[test]
    fn test_display() {
        assert_eq!(ChunkCoord::new(-1, 0, 7).to_string(), "(-1, 0, 7)");
    }
}
