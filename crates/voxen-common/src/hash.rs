//! Spatial hashing for chunk coordinates.
//!
//! Chunk keys are hashed by interleaving the low 21 bits of each axis into a
//! 63-bit Morton code and then running it through the SplitMix64 finalizer.
//! Coordinates are biased by 2^20 first so that small negative and positive
//! values share the same code space. Within `[-2^20, 2^20)` per axis the Morton
//! code is injective; beyond that the axis wraps.

use std::hash::{BuildHasherDefault, Hasher};

/// Number of bits kept per axis in the Morton code.
pub const MORTON_AXIS_BITS: u32 = 21;

const MORTON_AXIS_MASK: u64 = (1 << MORTON_AXIS_BITS) - 1;
const MORTON_BIAS: i64 = 1 << (MORTON_AXIS_BITS - 1);

/// Spreads the low 21 bits of `v` so that two zero bits follow each bit.
#[must_use]
pub const fn spread_bits(v: u64) -> u64 {
    let mut x = v & MORTON_AXIS_MASK;
    x = (x | (x << 32)) & 0x001f_0000_0000_ffff;
    x = (x | (x << 16)) & 0x001f_0000_ff00_00ff;
    x = (x | (x << 8)) & 0x100f_00f0_0f00_f00f;
    x = (x | (x << 4)) & 0x10c3_0c30_c30c_30c3;
    x = (x | (x << 2)) & 0x1249_2492_4924_9249;
    x
}

/// Inverse of [`spread_bits`].
#[must_use]
pub const fn compact_bits(v: u64) -> u64 {
    let mut x = v & 0x1249_2492_4924_9249;
    x = (x | (x >> 2)) & 0x10c3_0c30_c30c_30c3;
    x = (x | (x >> 4)) & 0x100f_00f0_0f00_f00f;
    x = (x | (x >> 8)) & 0x001f_0000_ff00_00ff;
    x = (x | (x >> 16)) & 0x001f_0000_0000_ffff;
    x = (x | (x >> 32)) & MORTON_AXIS_MASK;
    x
}

const fn bias(v: i32) -> u64 {
    ((v as i64 + MORTON_BIAS) as u64) & MORTON_AXIS_MASK
}

const fn unbias(v: u64) -> i32 {
    (v as i64 - MORTON_BIAS) as i32
}

/// Interleaves three signed coordinates into a 63-bit Morton code.
#[must_use]
pub const fn morton_encode(x: i32, y: i32, z: i32) -> u64 {
    spread_bits(bias(x)) | (spread_bits(bias(y)) << 1) | (spread_bits(bias(z)) << 2)
}

/// Recovers the coordinates encoded by [`morton_encode`].
///
/// Exact for inputs within `[-2^20, 2^20)` on every axis.
#[must_use]
pub const fn morton_decode(code: u64) -> (i32, i32, i32) {
    (
        unbias(compact_bits(code)),
        unbias(compact_bits(code >> 1)),
        unbias(compact_bits(code >> 2)),
    )
}

/// SplitMix64 finalizer (avalanche mix).
#[must_use]
pub const fn splitmix64(v: u64) -> u64 {
    let mut z = v.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Pass-through hasher for keys that already carry a well-mixed `u64`.
///
/// [`ChunkCoord`](crate::ChunkCoord) writes its spatial hash with a single
/// `write_u64`, which this hasher returns unchanged. Any other input is
/// folded in byte-wise and re-mixed.
#[derive(Debug, Default, Clone, Copy)]
pub struct MortonHasher {
    state: u64,
}

impl Hasher for MortonHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state = splitmix64(self.state ^ u64::from(b));
        }
    }

    fn write_u64(&mut self, v: u64) {
        self.state ^= v;
    }
}

/// `BuildHasher` for maps keyed by chunk coordinate.
pub type ChunkCoordBuildHasher = BuildHasherDefault<MortonHasher>;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const RANGE: std::ops::Range<i32> = -(1 << 20)..(1 << 20);

    #[test]
    fn test_morton_interleaves_axes() {
        let origin = morton_encode(0, 0, 0);
        assert_eq!(morton_encode(1, 0, 0) ^ origin, 0b001);
        assert_eq!(morton_encode(0, 1, 0) ^ origin, 0b010);
        assert_eq!(morton_encode(0, 0, 1) ^ origin, 0b100);
    }

    #[test]
    fn test_splitmix_known_value() {
        // First output of SplitMix64 seeded with 0.
        assert_eq!(splitmix64(0), 0xe220_a839_7b1d_cdaf);
    }

    #[test]
    fn test_neighbours_spread_across_buckets() {
        let mut low_bits = std::collections::HashSet::new();
        for x in 0..4 {
            for z in 0..4 {
                low_bits.insert(splitmix64(morton_encode(x, 0, z)) & 0xff);
            }
        }
        assert!(low_bits.len() > 8);
    }

    proptest! {
        #[test]
        fn prop_morton_round_trip(x in RANGE, y in RANGE, z in RANGE) {
            prop_assert_eq!(morton_decode(morton_encode(x, y, z)), (x, y, z));
        }
    }
}
