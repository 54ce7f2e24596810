//! The loaded tile world: map source, derived collision grid and the queue
//! of runtime tile edits.

use crate::grid::CollisionGrid;
use crate::map::TileMap;

/// A pending gid write. Applied at the end of the tick.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TileEdit {
    pub layer: usize,
    pub tx: i32,
    pub ty: i32,
    pub gid: u32,
}

#[derive(Debug, Default)]
pub struct TileWorld {
    map: Option<TileMap>,
    grid: CollisionGrid,
    generation: u64,
    pending: Vec<TileEdit>,
}

impl TileWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current map. Pending edits from the previous map are dropped.
    pub fn load(&mut self, mut map: TileMap, collision_layer: Option<&str>) {
        let grid = CollisionGrid::build(&mut map, collision_layer);
        tracing::info!(
            width = map.width,
            height = map.height,
            layers = map.layers.len(),
            tilesets = map.tilesets.len(),
            "tile map loaded"
        );
        self.map = Some(map);
        self.grid = grid;
        self.generation += 1;
        self.pending.clear();
    }

    pub fn unload(&mut self) {
        self.map = None;
        self.grid = CollisionGrid::empty();
        self.generation += 1;
        self.pending.clear();
    }

    pub fn has_map(&self) -> bool {
        self.map.is_some()
    }

    pub fn map(&self) -> Option<&TileMap> {
        self.map.as_ref()
    }

    pub fn grid(&self) -> &CollisionGrid {
        &self.grid
    }

    /// Bumped by every load; 0 before the first.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending_edits(&self) -> &[TileEdit] {
        &self.pending
    }

    /// Queue a gid write. Rejected when no map is loaded or the target is out of range.
    pub fn set_tile_gid(&mut self, layer: usize, tx: i32, ty: i32, gid: u32) -> bool {
        let Some(map) = &self.map else {
            return false;
        };
        let Some(target) = map.layers.get(layer) else {
            return false;
        };
        if target.gid_at(tx, ty).is_none() {
            return false;
        }
        self.pending.push(TileEdit { layer, tx, ty, gid });
        true
    }

    /// Write every queued edit in order and refresh collision for collision layers.
    ///
    /// Returns the number of edits written.
    pub fn apply_tile_edits(&mut self) -> usize {
        let Some(map) = self.map.as_mut() else {
            self.pending.clear();
            return 0;
        };
        let mut applied = 0;
        for edit in self.pending.drain(..) {
            let Some(layer) = map.layers.get_mut(edit.layer) else {
                continue;
            };
            if !layer.set_gid(edit.tx, edit.ty, edit.gid) {
                continue;
            }
            applied += 1;
            if layer.collision {
                self.grid.refresh_tile(map, edit.tx, edit.ty);
            }
        }
        applied
    }
}
