//! ID types for live game objects.

use std::sync::atomic::{AtomicU64, Ordering};

static GAME_OBJECT_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Key of a game object in the caller's live-object registry.
///
/// Ids are process-local and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameObjectId(u64);

impl GameObjectId {
    /// Allocates the next unused id.
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(GAME_OBJECT_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}
