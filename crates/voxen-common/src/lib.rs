//! # Voxen Common
//!
//! Common types, utilities, and shared abstractions for the Voxen voxel world.
//!
//! This crate provides foundational types used across all Voxen crates:
//! - Chunk coordinates and world-to-chunk conversion
//! - The spatial hash used by coordinate-keyed maps
//! - ID types for live game objects
//! - Configuration error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod hash;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::hash::*;
    pub use crate::ids::*;
}

pub use prelude::*;
