//! Run-length coding of block arrays.
//!
//! A stream is a sequence of `(type byte, count byte)` pairs with `count` in
//! `1..=255`. Longer runs are split into several pairs.

use crate::block::{Block, BlockType};
use crate::save::SaveError;

/// Longest run a single pair can hold.
pub const MAX_RUN: usize = u8::MAX as usize;

/// Appends the run-length encoding of `blocks` to `out`.
pub fn encode_runs(blocks: &[Block], out: &mut Vec<u8>) {
    let mut iter = blocks.iter().peekable();
    while let Some(&first) = iter.next() {
        let mut count = 1;
        while count < MAX_RUN && iter.peek().is_some_and(|b| **b == first) {
            iter.next();
            count += 1;
        }
        out.push(first.block_type.as_u8());
        out.push(count as u8);
    }
}

/// Decodes runs from `bytes[start..]` until `target` is full.
///
/// Returns the offset just past the last pair consumed.
pub fn decode_runs(bytes: &[u8], start: usize, target: &mut [Block]) -> Result<usize, SaveError> {
    let mut filled = 0;
    let mut pos = start;
    while filled < target.len() {
        let Some(&[type_byte, count_byte]) = bytes.get(pos..pos + 2) else {
            return Err(SaveError::TruncatedRuns { decoded: filled });
        };
        let block_type = BlockType::from_u8(type_byte).ok_or(SaveError::UnknownBlockType {
            value: type_byte,
            offset: pos,
        })?;
        let count = usize::from(count_byte);
        if count == 0 {
            return Err(SaveError::ZeroLengthRun { offset: pos });
        }
        if filled + count > target.len() {
            return Err(SaveError::RunOverflow { offset: pos });
        }
        target[filled..filled + count].fill(Block::new(block_type));
        filled += count;
        pos += 2;
    }
    Ok(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use voxen_common::CHUNK_VOLUME;

    #[test]
    fn test_uniform_chunk_splits_long_runs() {
        let blocks = [Block::new(BlockType::Stone); CHUNK_VOLUME];
        let mut out = Vec::new();
        encode_runs(&blocks, &mut out);
        // 16 full runs of 255 plus a final run of 16.
        assert_eq!(out.len(), 17 * 2);
        assert!(out.chunks(2).take(16).all(|p| p == [3, 255]));
        assert_eq!(&out[32..], &[3, 16]);

        let mut decoded = [Block::AIR; CHUNK_VOLUME];
        let end = decode_runs(&out, 0, &mut decoded).expect("decode");
        assert_eq!(end, out.len());
        assert_eq!(decoded, blocks);
    }

    #[test]
    fn test_decode_errors() {
        let mut target = [Block::AIR; 8];
        assert!(matches!(
            decode_runs(&[1, 4, 2], 0, &mut target),
            Err(SaveError::TruncatedRuns { decoded: 4 })
        ));
        assert!(matches!(
            decode_runs(&[9, 8], 0, &mut target),
            Err(SaveError::UnknownBlockType { value: 9, offset: 0 })
        ));
        assert!(matches!(
            decode_runs(&[1, 0], 0, &mut target),
            Err(SaveError::ZeroLengthRun { offset: 0 })
        ));
        assert!(matches!(
            decode_runs(&[1, 4, 2, 5], 0, &mut target),
            Err(SaveError::RunOverflow { offset: 2 })
        ));
    }

    proptest! {
        #[test]
        fn prop_runs_round_trip(types in proptest::collection::vec(0u8..8, 1..600)) {
            let blocks: Vec<Block> = types
                .iter()
                .map(|&t| Block::new(BlockType::from_u8(t).unwrap_or_default()))
                .collect();
            let mut out = Vec::new();
            encode_runs(&blocks, &mut out);
            prop_assert!(out.chunks(2).all(|p| p[1] >= 1));
            let mut decoded = vec![Block::AIR; blocks.len()];
            let end = decode_runs(&out, 0, &mut decoded).expect("decode");
            prop_assert_eq!(end, out.len());
            prop_assert_eq!(decoded, blocks);
        }
    }
}
