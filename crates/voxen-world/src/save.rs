//! Chunk records and the world save format.
//!
//! # Chunk record
//!
//! ```text
//! +----------------+----------------+----------------+----------------------+
//! | origin x (i32) | origin y (i32) | origin z (i32) | RLE runs (2 bytes ea) |
//! +----------------+----------------+----------------+----------------------+
//! ```
//!
//! The origin is the chunk's minimum corner in world voxels, little-endian.
//! Runs follow the format in [`crate::rle`] and cover exactly 4096 blocks.
//!
//! # World file
//!
//! Chunk records joined by `\n`, with no length prefix. A record's length is
//! found by decoding it: after the header, runs are consumed until 4096
//! blocks are covered, and only then is a separator expected. Header or count
//! bytes that happen to equal `\n` are therefore never taken as a boundary.

use std::io;
use thiserror::Error;
use voxen_common::{ChunkCoord, CHUNK_SIZE_I32, CHUNK_VOLUME};

use crate::block::Block;
use crate::chunk::Chunk;
use crate::rle;

/// Size of the chunk record header in bytes.
pub const HEADER_LEN: usize = 12;

/// Byte separating chunk records in a world file.
pub const RECORD_SEPARATOR: u8 = b'\n';

/// Errors raised while reading persisted chunks.
#[derive(Debug, Error)]
pub enum SaveError {
    /// Fewer than 12 header bytes
    #[error("Truncated chunk header: {len} of {HEADER_LEN} bytes")]
    TruncatedHeader {
        /// Bytes available
        len: usize,
    },

    /// Origin not a multiple of the chunk size
    #[error("Chunk origin ({x}, {y}, {z}) is not on the chunk grid")]
    MisalignedOrigin {
        /// Origin X
        x: i32,
        /// Origin Y
        y: i32,
        /// Origin Z
        z: i32,
    },

    /// Stream ended before 4096 blocks were decoded
    #[error("Truncated block runs: {decoded} of {CHUNK_VOLUME} blocks decoded")]
    TruncatedRuns {
        /// Blocks decoded so far
        decoded: usize,
    },

    /// Type byte with no block type
    #[error("Unknown block type byte {value} at offset {offset}")]
    UnknownBlockType {
        /// Offending byte
        value: u8,
        /// Byte offset
        offset: usize,
    },

    /// Run with a count of zero
    #[error("Zero-length run at offset {offset}")]
    ZeroLengthRun {
        /// Byte offset
        offset: usize,
    },

    /// Run extending past the end of the chunk
    #[error("Run at offset {offset} overflows the chunk")]
    RunOverflow {
        /// Byte offset
        offset: usize,
    },

    /// Record not followed by a separator
    #[error("Expected record separator at offset {offset}")]
    MissingSeparator {
        /// Byte offset
        offset: usize,
    },

    /// Extra bytes after a single record
    #[error("{count} trailing bytes after chunk record")]
    TrailingBytes {
        /// Number of extra bytes
        count: usize,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for save operations.
pub type SaveResult<T> = Result<T, SaveError>;

/// Appends the record for a chunk to `out`.
pub fn encode_chunk(coord: ChunkCoord, blocks: &[Block; CHUNK_VOLUME], out: &mut Vec<u8>) {
    for v in coord.world_origin() {
        out.extend_from_slice(&v.to_le_bytes());
    }
    rle::encode_runs(blocks, out);
}

/// Decodes one record from the start of `bytes`.
///
/// Returns the coordinate, the blocks and the number of bytes consumed.
pub fn decode_chunk(bytes: &[u8]) -> SaveResult<(ChunkCoord, Box<[Block; CHUNK_VOLUME]>, usize)> {
    decode_chunk_at(bytes, 0)
}

fn decode_chunk_at(
    bytes: &[u8],
    start: usize,
) -> SaveResult<(ChunkCoord, Box<[Block; CHUNK_VOLUME]>, usize)> {
    let header = bytes
        .get(start..start + HEADER_LEN)
        .ok_or(SaveError::TruncatedHeader {
            len: bytes.len().saturating_sub(start),
        })?;
    let mut origin = [0i32; 3];
    for (axis, word) in origin.iter_mut().zip(header.chunks_exact(4)) {
        *axis = i32::from_le_bytes([word[0], word[1], word[2], word[3]]);
    }
    let [x, y, z] = origin;
    if origin.iter().any(|v| v.rem_euclid(CHUNK_SIZE_I32) != 0) {
        return Err(SaveError::MisalignedOrigin { x, y, z });
    }
    let coord = ChunkCoord::from_voxel(x, y, z);

    let mut blocks = Box::new([Block::AIR; CHUNK_VOLUME]);
    let end = rle::decode_runs(bytes, start + HEADER_LEN, blocks.as_mut_slice())?;
    Ok((coord, blocks, end - start))
}

/// Encodes chunks as a world file.
pub fn encode_world<'a>(chunks: impl IntoIterator<Item = &'a Chunk>) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, chunk) in chunks.into_iter().enumerate() {
        if i > 0 {
            out.push(RECORD_SEPARATOR);
        }
        chunk.with_blocks(|blocks| encode_chunk(chunk.coord(), blocks, &mut out));
    }
    out
}

/// Decodes a world file into detached chunks with terrain.
///
/// A trailing separator is accepted.
pub fn decode_world(bytes: &[u8]) -> SaveResult<Vec<Chunk>> {
    let mut chunks = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let (coord, blocks, used) = decode_chunk_at(bytes, offset)?;
        chunks.push(Chunk::from_blocks(coord, blocks));
        offset += used;
        match bytes.get(offset) {
            None => break,
            Some(&RECORD_SEPARATOR) => offset += 1,
            Some(_) => return Err(SaveError::MissingSeparator { offset }),
        }
    }
    Ok(chunks)
}
