//! Entity handle with generational index
//!
//! Entities are lightweight handles (8 bytes) that reference slots in the World.
//! The generation counter prevents use-after-free bugs.

use serde::{Deserialize, Serialize};

/// Fixed slot capacity of a [`World`](crate::ecs::World).
pub const MAX_ENTITIES: usize = 1024;

/// Entity handle (generation-indexed for safety)
///
/// Format: [32-bit index | 32-bit generation]
/// - Index: slot in the world's component arrays
/// - Generation: 0 for a dead slot, bumped every time the slot is reused
///
/// Example:
/// ```ignore
/// let entity = world.create();
/// world.destroy(entity);
/// assert!(!world.is_alive(entity)); // generation mismatch
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    /// Sentinel returned when the slot pool is exhausted. Never alive.
    pub const DEAD: Entity = Entity {
        index: u32::MAX,
        generation: 0,
    };

    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// True for the `DEAD` sentinel or any handle carrying generation 0.
    pub fn is_dead(&self) -> bool {
        self.generation == 0
    }

    /// Serialize to 64-bit integer (for save files and debug overlays)
    pub fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    /// Deserialize from 64-bit integer
    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::DEAD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_preserve_index_and_generation() {
        let e = Entity::new(17, 3);
        let back = Entity::from_bits(e.to_bits());
        assert_eq!(back, e);
        assert_eq!(back.index(), 17);
        assert_eq!(back.generation(), 3);
    }

    #[test]
    fn dead_sentinel() {
        assert!(Entity::DEAD.is_dead());
        assert_eq!(Entity::default(), Entity::DEAD);
        assert!(!Entity::new(0, 1).is_dead());
    }
}
