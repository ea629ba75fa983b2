//! Block types.

use serde::{Deserialize, Serialize};

/// Voxel type, stored as one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum BlockType {
    /// Empty space
    #[default]
    Air = 0,
    /// Dirt
    Dirt = 1,
    /// Grass-topped soil
    Grass = 2,
    /// Stone
    Stone = 3,
    /// Sand
    Sand = 4,
    /// Water
    Water = 5,
    /// Wood
    Wood = 6,
    /// Leaves
    Leaves = 7,
}

impl BlockType {
    /// Every block type, in byte order.
    pub const ALL: [Self; 8] = [
        Self::Air,
        Self::Dirt,
        Self::Grass,
        Self::Stone,
        Self::Sand,
        Self::Water,
        Self::Wood,
        Self::Leaves,
    ];

    /// Returns the persisted byte value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parses a persisted byte value.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Air),
            1 => Some(Self::Dirt),
            2 => Some(Self::Grass),
            3 => Some(Self::Stone),
            4 => Some(Self::Sand),
            5 => Some(Self::Water),
            6 => Some(Self::Wood),
            7 => Some(Self::Leaves),
            _ => None,
        }
    }

    /// Returns true for empty space.
    #[must_use]
    pub const fn is_air(self) -> bool {
        matches!(self, Self::Air)
    }

    /// Vertex color used when meshing this block type.
    #[must_use]
    pub const fn color(self) -> [f32; 3] {
        match self {
            Self::Grass => [0.0, 0.8, 0.0],
            Self::Dirt => [0.6, 0.3, 0.0],
            Self::Stone => [0.5, 0.5, 0.5],
            Self::Sand => [0.9, 0.8, 0.6],
            Self::Water => [0.0, 0.0, 0.8],
            Self::Wood => [0.4, 0.2, 0.0],
            Self::Leaves => [0.0, 0.5, 0.0],
            Self::Air => [1.0, 1.0, 1.0],
        }
    }
}

/// A single voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Block {
    /// The voxel's type
    pub block_type: BlockType,
}

impl Block {
    /// Empty space.
    pub const AIR: Self = Self::new(BlockType::Air);

    /// Creates a block of the given type.
    #[must_use]
    pub const fn new(block_type: BlockType) -> Self {
        Self { block_type }
    }

    /// Returns true for empty space.
    #[must_use]
    pub const fn is_air(self) -> bool {
        self.block_type.is_air()
    }
}

impl From<BlockType> for Block {
    fn from(block_type: BlockType) -> Self {
        Self::new(block_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_round_trip() {
        for ty in BlockType::ALL {
            assert_eq!(BlockType::from_u8(ty.as_u8()), Some(ty));
        }
        assert_eq!(BlockType::from_u8(8), None);
        assert_eq!(BlockType::from_u8(b'\n'), None);
    }

    #[test]
    fn test_default_is_air() {
        assert!(Block::default().is_air());
        assert!(!Block::from(BlockType::Stone).is_air());
    }
}
