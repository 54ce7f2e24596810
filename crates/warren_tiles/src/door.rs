//! Door tile registry.
//!
//! A door is a set of tile cells animated together. The registry remembers
//! which layer, tileset and base tile each cell shows, then turns an
//! animation time into gid edits on the [`TileWorld`].

use crate::map::{GidFlags, GID_FLAG_MASK, GID_MASK};
use crate::world::TileWorld;
use warren_core::ecs::DoorHandle;

/// One resolved door cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DoorTile {
    pub tx: i32,
    pub ty: i32,
    pub layer: usize,
    pub tileset: usize,
    /// Base tile that owns the animation.
    pub local_id: u32,
    pub first_gid: u32,
    /// Flip bits carried into every emitted gid.
    pub flip_bits: u32,
}

#[derive(Debug, Clone, Default)]
struct DoorRecord {
    active: bool,
    cells: Vec<(i32, i32)>,
    tiles: Vec<DoorTile>,
    resolved_for: Option<u64>,
}

#[derive(Debug, Default)]
pub struct DoorRegistry {
    records: Vec<DoorRecord>,
}

impl DoorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a door made of the given tile cells. Reuses the first free slot.
    pub fn register(&mut self, cells: &[(i32, i32)]) -> Option<DoorHandle> {
        let record = DoorRecord {
            active: true,
            cells: cells.to_vec(),
            tiles: Vec::new(),
            resolved_for: None,
        };
        let idx = match self.records.iter().position(|r| !r.active) {
            Some(idx) => {
                self.records[idx] = record;
                idx
            }
            None => {
                self.records.push(record);
                self.records.len() - 1
            }
        };
        DoorHandle::from_raw(idx as u32 + 1)
    }

    pub fn unregister(&mut self, handle: DoorHandle) {
        if let Some(record) = self.record_mut(handle) {
            *record = DoorRecord::default();
        }
    }

    pub fn is_registered(&self, handle: DoorHandle) -> bool {
        self.slot(handle)
            .and_then(|idx| self.records.get(idx))
            .is_some_and(|r| r.active)
    }

    pub fn active_count(&self) -> usize {
        self.records.iter().filter(|r| r.active).count()
    }

    fn slot(&self, handle: DoorHandle) -> Option<usize> {
        (handle.raw() as usize).checked_sub(1)
    }

    fn record_mut(&mut self, handle: DoorHandle) -> Option<&mut DoorRecord> {
        let idx = self.slot(handle)?;
        self.records.get_mut(idx).filter(|r| r.active)
    }

    /// Resolved cells of a door against the current map.
    pub fn tiles(&mut self, world: &TileWorld, handle: DoorHandle) -> &[DoorTile] {
        match self.resolve(world, handle) {
            Some(record) => &record.tiles,
            None => &[],
        }
    }

    fn resolve(&mut self, world: &TileWorld, handle: DoorHandle) -> Option<&DoorRecord> {
        let map = world.map()?;
        let generation = world.generation();
        let record = self.record_mut(handle)?;
        if record.resolved_for != Some(generation) {
            record.tiles = record
                .cells
                .iter()
                .filter_map(|&(tx, ty)| {
                    let (layer, raw) = map
                        .layers
                        .iter()
                        .enumerate()
                        .rev()
                        .find_map(|(i, l)| l.gid_at(tx, ty).filter(|&g| g & GID_MASK != 0).map(|g| (i, g)))?;
                    let (gid, _) = GidFlags::split(raw);
                    let (tileset, local_id) = map.tileset_for_gid(gid)?;
                    Some(DoorTile {
                        tx,
                        ty,
                        layer,
                        tileset,
                        local_id,
                        first_gid: map.tilesets[tileset].first_gid,
                        flip_bits: raw & GID_FLAG_MASK,
                    })
                })
                .collect();
            if record.tiles.len() != record.cells.len() {
                tracing::warn!(
                    door = handle.raw(),
                    cells = record.cells.len(),
                    resolved = record.tiles.len(),
                    "door cells without a tile"
                );
            }
            record.resolved_for = Some(generation);
        }
        Some(record)
    }

    /// Total duration of the first cell's animation, 0 without one.
    pub fn primary_animation_duration(&mut self, world: &TileWorld, handle: DoorHandle) -> u32 {
        let Some(map) = world.map() else {
            return 0;
        };
        let Some(first) = self.tiles(world, handle).first().copied() else {
            return 0;
        };
        map.tilesets[first.tileset]
            .animation(first.local_id)
            .map_or(0, |a| a.total_duration_ms())
    }

    /// Queue the frame shown `t_ms` into the animation for every cell.
    ///
    /// Reverse playback is used while closing. Cells without an animation are left alone.
    pub fn apply_state(&mut self, world: &mut TileWorld, handle: DoorHandle, t_ms: f32, forward: bool) {
        let tiles = self.tiles(world, handle).to_vec();
        let edits: Vec<_> = {
            let Some(map) = world.map() else {
                return;
            };
            tiles
                .iter()
                .filter_map(|tile| {
                    let anim = map.tilesets[tile.tileset].animation(tile.local_id)?;
                    let frame = anim.frame_at(t_ms, forward)?;
                    Some((tile, (tile.first_gid + frame) | tile.flip_bits))
                })
                .collect()
        };
        for (tile, gid) in edits {
            world.set_tile_gid(tile.layer, tile.tx, tile.ty, gid);
        }
    }
}
