//! Reference-counted texture bookkeeping without a GPU.

use std::collections::HashMap;
use warren_core::assets::{TextureHandle, TextureProvider};

#[derive(Debug)]
struct Slot {
    path: String,
    generation: u32,
    refs: u32,
}

/// [`TextureProvider`] that only tracks paths and reference counts.
#[derive(Debug, Default)]
pub struct HeadlessTextures {
    slots: Vec<Slot>,
    by_path: HashMap<String, u32>,
}

impl HeadlessTextures {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, handle: TextureHandle) -> Option<&Slot> {
        self.slots
            .get(handle.id as usize)
            .filter(|s| !handle.is_none() && s.generation == handle.generation && s.refs > 0)
    }

    pub fn ref_count(&self, handle: TextureHandle) -> u32 {
        self.slot(handle).map_or(0, |s| s.refs)
    }

    pub fn path(&self, handle: TextureHandle) -> Option<&str> {
        self.slot(handle).map(|s| s.path.as_str())
    }

    /// Number of textures with at least one reference.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.refs > 0).count()
    }
}

impl TextureProvider for HeadlessTextures {
    fn acquire(&mut self, path: &str) -> TextureHandle {
        if let Some(&id) = self.by_path.get(path) {
            let slot = &mut self.slots[id as usize];
            slot.refs += 1;
            return TextureHandle::new(id, slot.generation);
        }

        let id = match self.slots.iter().position(|s| s.refs == 0) {
            Some(free) => {
                let slot = &mut self.slots[free];
                slot.generation = slot.generation.wrapping_add(1).max(1);
                slot.path = path.to_string();
                slot.refs = 1;
                free as u32
            }
            None => {
                self.slots.push(Slot {
                    path: path.to_string(),
                    generation: 1,
                    refs: 1,
                });
                (self.slots.len() - 1) as u32
            }
        };
        self.by_path.insert(path.to_string(), id);
        tracing::debug!(path, id, "texture acquired");
        TextureHandle::new(id, self.slots[id as usize].generation)
    }

    fn add_ref(&mut self, handle: TextureHandle) {
        if self.slot(handle).is_none() {
            return;
        }
        self.slots[handle.id as usize].refs += 1;
    }

    fn release(&mut self, handle: TextureHandle) {
        if self.slot(handle).is_none() {
            return;
        }
        let slot = &mut self.slots[handle.id as usize];
        slot.refs -= 1;
        if slot.refs == 0 {
            self.by_path.remove(&slot.path);
            tracing::debug!(path = %slot.path, "texture freed");
        }
    }

    fn is_valid(&self, handle: TextureHandle) -> bool {
        self.slot(handle).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_path_shares_a_handle() {
        let mut textures = HeadlessTextures::new();
        let a = textures.acquire("hero.png");
        let b = textures.acquire("hero.png");
        assert_eq!(a, b);
        assert_eq!(textures.ref_count(a), 2);
        assert_eq!(textures.path(a), Some("hero.png"));
    }

    #[test]
    fn last_release_invalidates() {
        let mut textures = HeadlessTextures::new();
        let a = textures.acquire("coin.png");
        textures.add_ref(a);
        textures.release(a);
        assert!(textures.is_valid(a));
        textures.release(a);
        assert!(!textures.is_valid(a));
        assert_eq!(textures.live_count(), 0);

        // Slot reuse bumps the generation, so the stale handle stays invalid.
        let b = textures.acquire("door.png");
        assert_eq!(b.id, a.id);
        assert!(!textures.is_valid(a));
        assert!(textures.is_valid(b));
    }

    #[test]
    fn none_handle_is_ignored() {
        let mut textures = HeadlessTextures::new();
        textures.add_ref(TextureHandle::NONE);
        textures.release(TextureHandle::NONE);
        assert!(!textures.is_valid(TextureHandle::NONE));
    }
}
