//! # Voxen World
//!
//! Infinite voxel world management for Voxen.
//!
//! This crate handles:
//! - Chunk storage and the chunk lifecycle
//! - Seeded procedural terrain
//! - Simple and greedy meshing with cross-chunk face culling
//! - Streaming chunks around a viewer on background worker pools
//! - Run-length encoded world files

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod block;
pub mod chunk;
pub mod config;
pub mod error;
pub mod manager;
pub mod mesh;
pub mod meshing;
pub mod object;
pub mod pipeline;
pub mod rle;
pub mod save;
pub mod state;
pub mod terrain;
pub mod world_noise;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::block::*;
    pub use crate::chunk::*;
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::manager::*;
    pub use crate::mesh::*;
    pub use crate::meshing::*;
    pub use crate::object::*;
    pub use crate::pipeline::*;
    pub use crate::save::*;
    pub use crate::state::*;
    pub use crate::terrain::*;
    pub use crate::world_noise::*;
}

pub use prelude::*;
