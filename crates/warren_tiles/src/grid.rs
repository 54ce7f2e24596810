//! Subtile collision grid.
//!
//! Derived from a [`TileMap`]: one [`SubtileMask`] and one dynamic flag per
//! tile. All pixel-space queries treat a rectangle as center + half extents.

use crate::map::TileMap;
use crate::mask::SubtileMask;
use warren_core::math::next_down;

pub const TILE_SIZE: i32 = 32;
pub const SUBTILE_SIZE: i32 = 8;
pub const SUBTILES_PER_TILE: i32 = TILE_SIZE / SUBTILE_SIZE;

const AXIS_PASSES: usize = 4;
const MTV_PASSES: usize = 8;

/// Coarse classification of a tile cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TileKind {
    /// Outside the map.
    Void,
    Walkable,
    /// Some, but not all, subtiles blocked.
    Partial,
    Solid,
}

impl TileKind {
    fn of(mask: SubtileMask) -> Self {
        if mask.is_full() {
            TileKind::Solid
        } else if mask.is_empty() {
            TileKind::Walkable
        } else {
            TileKind::Partial
        }
    }
}

/// Penetration depths of a query rect into one blocked subtile.
#[derive(Debug, Copy, Clone)]
struct Overlap {
    /// Distance to push toward -x to clear the subtile.
    left: f32,
    right: f32,
    /// Distance to push toward -y.
    up: f32,
    down: f32,
}

impl Overlap {
    /// Signed correction along x choosing the shorter push.
    fn resolve_x(&self) -> f32 {
        if self.left < self.right {
            -self.left
        } else {
            self.right
        }
    }

    fn resolve_y(&self) -> f32 {
        if self.up < self.down {
            -self.up
        } else {
            self.down
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CollisionGrid {
    width: i32,
    height: i32,
    masks: Vec<SubtileMask>,
    dynamic: Vec<bool>,
}

impl CollisionGrid {
    /// Grid with no tiles. Every query reports blocked / no resolution.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a map, taking each tile from the topmost collision layer.
    ///
    /// Layers named `collision_layer` are flagged as collision layers first.
    pub fn build(map: &mut TileMap, collision_layer: Option<&str>) -> Self {
        if map.tile_width as i32 != TILE_SIZE || map.tile_height as i32 != TILE_SIZE {
            tracing::warn!(
                tile_width = map.tile_width,
                tile_height = map.tile_height,
                engine_tile = TILE_SIZE,
                "map tile size differs from engine tile size"
            );
        }
        if let Some(name) = collision_layer {
            if map.mark_collision_layer(name) == 0 {
                tracing::warn!(layer = name, "collision layer not found in map");
            }
        }

        let width = map.width as i32;
        let height = map.height as i32;
        let count = (map.width * map.height) as usize;
        let mut grid = Self {
            width,
            height,
            masks: vec![SubtileMask::EMPTY; count],
            dynamic: vec![false; count],
        };
        for ty in 0..height {
            for tx in 0..width {
                grid.write_cell(map, tx, ty);
            }
        }
        grid
    }

    /// Recompute one tile after its gid changed.
    pub fn refresh_tile(&mut self, map: &TileMap, tx: i32, ty: i32) {
        if self.cell(tx, ty).is_none() || !map.in_bounds(tx, ty) {
            return;
        }
        self.write_cell(map, tx, ty);
    }

    fn write_cell(&mut self, map: &TileMap, tx: i32, ty: i32) {
        let Some(idx) = self.cell(tx, ty) else {
            return;
        };
        let raw = map.collision_gid_at(tx, ty);
        let (mask, dynamic) = map.decode_gid(raw).unwrap_or_default();
        self.masks[idx] = mask;
        self.dynamic[idx] = dynamic;
    }

    fn cell(&self, tx: i32, ty: i32) -> Option<usize> {
        if tx < 0 || ty < 0 || tx >= self.width || ty >= self.height {
            return None;
        }
        Some(ty as usize * self.width as usize + tx as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Size in tiles.
    pub fn size_tiles(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Size in pixels.
    pub fn size_px(&self) -> (i32, i32) {
        (self.width * TILE_SIZE, self.height * TILE_SIZE)
    }

    fn size_subtiles(&self) -> (i32, i32) {
        (self.width * SUBTILES_PER_TILE, self.height * SUBTILES_PER_TILE)
    }

    pub fn tile_at(&self, tx: i32, ty: i32) -> TileKind {
        match self.cell(tx, ty) {
            Some(idx) => TileKind::of(self.masks[idx]),
            None => TileKind::Void,
        }
    }

    pub fn subtile_mask_at(&self, tx: i32, ty: i32) -> SubtileMask {
        self.cell(tx, ty)
            .map(|idx| self.masks[idx])
            .unwrap_or_default()
    }

    pub fn is_dynamic(&self, tx: i32, ty: i32) -> bool {
        self.cell(tx, ty).is_some_and(|idx| self.dynamic[idx])
    }

    /// Subtile coordinates are global (`tile * 4 + local`). Outside the map is blocked.
    pub fn is_walkable_subtile(&self, sx: i32, sy: i32) -> bool {
        if sx < 0 || sy < 0 {
            return false;
        }
        let Some(idx) = self.cell(sx / SUBTILES_PER_TILE, sy / SUBTILES_PER_TILE) else {
            return false;
        };
        let col = (sx % SUBTILES_PER_TILE) as u32;
        let row = (sy % SUBTILES_PER_TILE) as u32;
        !self.masks[idx].is_blocked(col, row)
    }

    pub fn is_walkable_point(&self, px: f32, py: f32) -> bool {
        if self.is_empty() {
            return false;
        }
        self.is_walkable_subtile(subtile_coord(px), subtile_coord(py))
    }

    /// Every subtile touched by the rect is walkable. The right and bottom
    /// edges are exclusive, so a rect flush against a wall does not touch it.
    pub fn is_walkable_rect(&self, cx: f32, cy: f32, hx: f32, hy: f32) -> bool {
        if self.is_empty() {
            return false;
        }
        let mut right = cx + hx;
        let mut bottom = cy + hy;
        if hx > 0.0 {
            right = next_down(right);
        }
        if hy > 0.0 {
            bottom = next_down(bottom);
        }
        let (sx0, sx1) = (subtile_coord(cx - hx), subtile_coord(right));
        let (sy0, sy1) = (subtile_coord(cy - hy), subtile_coord(bottom));
        (sy0..=sy1).all(|sy| (sx0..=sx1).all(|sx| self.is_walkable_subtile(sx, sy)))
    }

    /// Sample a padded rect every half subtile from `(x0, y0)` to `(x1, y1)`.
    ///
    /// `max_range > 0` rejects segments longer than it.
    #[allow(clippy::too_many_arguments)]
    pub fn line_of_sight(
        &self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        max_range: f32,
        hx: f32,
        hy: f32,
    ) -> bool {
        if self.is_empty() {
            return false;
        }
        let dx = x1 - x0;
        let dy = y1 - y0;
        let dist2 = dx * dx + dy * dy;
        if dist2 <= 0.0 {
            return true;
        }
        if max_range > 0.0 && dist2 > max_range * max_range {
            return false;
        }
        let step = SUBTILE_SIZE as f32 * 0.5;
        let steps = ((dist2.sqrt() / step).ceil() as i32).max(1);
        let inv = 1.0 / steps as f32;
        (0..=steps).all(|i| {
            let t = i as f32 * inv;
            self.is_walkable_rect(x0 + dx * t, y0 + dy * t, hx, hy)
        })
    }

    /// Visit every blocked subtile the rect overlaps with positive area.
    fn for_each_overlap(&self, cx: f32, cy: f32, hx: f32, hy: f32, mut visit: impl FnMut(Overlap)) {
        let (sub_w, sub_h) = self.size_subtiles();
        let left = cx - hx;
        let right = cx + hx;
        let top = cy - hy;
        let bottom = cy + hy;

        let min_sx = subtile_coord(left).max(0);
        let max_sx = subtile_coord(right).min(sub_w - 1);
        let min_sy = subtile_coord(top).max(0);
        let max_sy = subtile_coord(bottom).min(sub_h - 1);

        let size = SUBTILE_SIZE as f32;
        for sy in min_sy..=max_sy {
            for sx in min_sx..=max_sx {
                if self.is_walkable_subtile(sx, sy) {
                    continue;
                }
                let tile_left = sx as f32 * size;
                let tile_right = tile_left + size;
                let tile_top = sy as f32 * size;
                let tile_bottom = tile_top + size;
                if right <= tile_left || left >= tile_right {
                    continue;
                }
                if bottom <= tile_top || top >= tile_bottom {
                    continue;
                }
                visit(Overlap {
                    left: right - tile_left,
                    right: tile_right - left,
                    up: bottom - tile_top,
                    down: tile_bottom - top,
                });
            }
        }
    }

    fn can_resolve(&self, hx: f32, hy: f32) -> bool {
        !self.is_empty() && hx > 0.0 && hy > 0.0
    }

    /// Push the rect out of blocked subtiles along one axis.
    ///
    /// Each pass applies the largest single correction among the overlapped
    /// subtiles; up to four passes. Returns whether the rect moved.
    pub fn resolve_rect_axis(&self, cx: &mut f32, cy: &mut f32, hx: f32, hy: f32, axis_x: bool) -> bool {
        if !self.can_resolve(hx, hy) {
            return false;
        }
        let mut moved = false;
        for _ in 0..AXIS_PASSES {
            let mut best: Option<f32> = None;
            self.for_each_overlap(*cx, *cy, hx, hy, |o| {
                let r = if axis_x { o.resolve_x() } else { o.resolve_y() };
                if best.map_or(true, |b| r.abs() > b.abs()) {
                    best = Some(r);
                }
            });
            let Some(delta) = best else {
                break;
            };
            if axis_x {
                *cx += delta;
            } else {
                *cy += delta;
            }
            moved = true;
        }
        moved
    }

    /// Minimum translation cleanup: per subtile pick the cheaper axis, then
    /// apply the largest of those corrections; up to eight passes.
    pub fn resolve_rect_mtv(&self, cx: &mut f32, cy: &mut f32, hx: f32, hy: f32) -> bool {
        if !self.can_resolve(hx, hy) {
            return false;
        }
        let mut moved = false;
        for _ in 0..MTV_PASSES {
            let mut best: Option<(f32, bool)> = None;
            self.for_each_overlap(*cx, *cy, hx, hy, |o| {
                let rx = o.resolve_x();
                let ry = o.resolve_y();
                let use_x = rx.abs() < ry.abs();
                let candidate = if use_x { rx } else { ry };
                if best.map_or(true, |(b, _)| candidate.abs() > b.abs()) {
                    best = Some((candidate, use_x));
                }
            });
            let Some((delta, use_x)) = best else {
                break;
            };
            if use_x {
                *cx += delta;
            } else {
                *cy += delta;
            }
            moved = true;
        }
        moved
    }

    /// Axis resolution on x, then on y.
    pub fn resolve_rect_slide(&self, cx: &mut f32, cy: &mut f32, hx: f32, hy: f32) -> bool {
        let moved_x = self.resolve_rect_axis(cx, cy, hx, hy, true);
        let moved_y = self.resolve_rect_axis(cx, cy, hx, hy, false);
        moved_x || moved_y
    }
}

#[inline]
fn subtile_coord(px: f32) -> i32 {
    (px / SUBTILE_SIZE as f32).floor() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{TileLayer, Tileset, GID_FLIP_V};

    const EPS: f32 = 1e-4;

    fn full() -> SubtileMask {
        SubtileMask::FULL
    }

    /// `w x h` map with solid tiles (gid 1) at `solid` and walkable elsewhere.
    fn grid_with(w: u32, h: u32, solid: &[(i32, i32)]) -> (TileMap, CollisionGrid) {
        let mut map = TileMap::new(w, h, 32);
        let half: SubtileMask = "[0000],[0000],[1111],[1111]".parse().unwrap();
        map.tilesets.push(
            Tileset::new("walls", 1, 4)
                .with_collider(0, full())
                .with_collider(1, half)
                .with_dynamic(1),
        );
        let mut layer = TileLayer::empty("walls", w, h);
        for &(tx, ty) in solid {
            layer.set_gid(tx, ty, 1);
        }
        map.layers.push(TileLayer::empty("ground", w, h));
        map.layers.push(layer);
        let grid = CollisionGrid::build(&mut map, Some("walls"));
        (map, grid)
    }

    #[test]
    fn build_classifies_tiles() {
        let (mut map, _) = grid_with(3, 2, &[(1, 0)]);
        map.layers[1].set_gid(2, 1, 2 | GID_FLIP_V);
        let grid = CollisionGrid::build(&mut map, None);

        assert_eq!(grid.tile_at(1, 0), TileKind::Solid);
        assert_eq!(grid.tile_at(0, 0), TileKind::Walkable);
        assert_eq!(grid.tile_at(2, 1), TileKind::Partial);
        assert_eq!(grid.tile_at(-1, 0), TileKind::Void);
        assert_eq!(grid.tile_at(3, 0), TileKind::Void);
        assert!(grid.is_dynamic(2, 1));
        assert!(!grid.is_dynamic(1, 0));
        // Vertical flip moves the blocked half to the top rows.
        assert_eq!(grid.subtile_mask_at(2, 1).bits(), 0x00FF);
        assert_eq!(grid.size_tiles(), (3, 2));
        assert_eq!(grid.size_px(), (96, 64));
    }

    #[test]
    fn non_collision_layers_are_ignored() {
        let mut map = TileMap::new(1, 1, 32);
        map.tilesets.push(Tileset::new("walls", 1, 1).with_collider(0, full()));
        let mut deco = TileLayer::empty("decor", 1, 1);
        deco.set_gid(0, 0, 1);
        map.layers.push(deco);
        let grid = CollisionGrid::build(&mut map, Some("walls"));
        assert_eq!(grid.tile_at(0, 0), TileKind::Walkable);
    }

    #[test]
    fn walkable_rect_respects_solid_tile_bounds() {
        let (_, grid) = grid_with(3, 3, &[(1, 1)]);
        // Inside the solid tile.
        assert!(!grid.is_walkable_rect(48.0, 48.0, 2.0, 2.0));
        // Overlapping its left edge.
        assert!(!grid.is_walkable_rect(30.0, 48.0, 3.0, 3.0));
        // Flush against its left edge: exclusive right edge.
        assert!(grid.is_walkable_rect(28.0, 48.0, 4.0, 4.0));
        // Flush above its top edge.
        assert!(grid.is_walkable_rect(48.0, 28.0, 4.0, 4.0));
        // Fully outside.
        assert!(grid.is_walkable_rect(12.0, 12.0, 4.0, 4.0));
        // Outside the map is never walkable.
        assert!(!grid.is_walkable_rect(-4.0, 12.0, 2.0, 2.0));
    }

    #[test]
    fn walkable_subtile_and_point() {
        let (_, grid) = grid_with(2, 1, &[(1, 0)]);
        assert!(grid.is_walkable_subtile(3, 0));
        assert!(!grid.is_walkable_subtile(4, 0));
        assert!(!grid.is_walkable_subtile(-1, 0));
        assert!(!grid.is_walkable_subtile(0, 4));
        assert!(grid.is_walkable_point(31.9, 5.0));
        assert!(!grid.is_walkable_point(32.0, 5.0));
    }

    #[test]
    fn axis_resolution_lands_flush_on_x() {
        let (_, grid) = grid_with(2, 1, &[(1, 0)]);
        let (mut cx, mut cy) = (31.0, 31.4);
        assert!(grid.resolve_rect_axis(&mut cx, &mut cy, 4.0, 0.5, true));
        assert!((cx - 28.0).abs() < EPS);
        assert_eq!(cy, 31.4);
        assert!(grid.is_walkable_rect(cx, cy, 4.0, 0.5));
    }

    #[test]
    fn axis_resolution_on_y() {
        let (_, grid) = grid_with(1, 2, &[(0, 1)]);
        let (mut cx, mut cy) = (16.0, 31.5);
        assert!(grid.resolve_rect_axis(&mut cx, &mut cy, 6.0, 2.0, false));
        assert!((cy - 30.0).abs() < EPS);
        assert_eq!(cx, 16.0);
    }

    #[test]
    fn axis_resolution_skips_degenerate_extents() {
        let (_, grid) = grid_with(2, 1, &[(1, 0)]);
        let (mut cx, mut cy) = (33.0, 16.0);
        assert!(!grid.resolve_rect_axis(&mut cx, &mut cy, 0.0, 4.0, true));
        assert!(!grid.resolve_rect_mtv(&mut cx, &mut cy, 4.0, -1.0));
        assert_eq!((cx, cy), (33.0, 16.0));

        let empty = CollisionGrid::empty();
        assert!(!empty.resolve_rect_slide(&mut cx, &mut cy, 4.0, 4.0));
        assert!(!empty.is_walkable_point(1.0, 1.0));
    }

    #[test]
    fn mtv_pushes_out_of_ceiling_without_lateral_shove() {
        // Solid row of tiles along the top; rect pokes 1px into it.
        let (_, grid) = grid_with(3, 2, &[(0, 0), (1, 0), (2, 0)]);
        let (mut cx, mut cy) = (48.0, 37.0);
        assert!(grid.resolve_rect_mtv(&mut cx, &mut cy, 6.0, 6.0));
        assert_eq!(cx, 48.0);
        assert!((cy - 38.0).abs() < EPS);
    }

    #[test]
    fn slide_resolves_corner_overlap() {
        let (_, grid) = grid_with(2, 2, &[(1, 1)]);
        let (mut cx, mut cy) = (30.0, 30.0);
        assert!(grid.resolve_rect_slide(&mut cx, &mut cy, 4.0, 4.0));
        assert!(grid.is_walkable_rect(cx, cy, 4.0, 4.0));
    }

    #[test]
    fn line_of_sight_blocked_by_wall() {
        let (_, grid) = grid_with(3, 1, &[(1, 0)]);
        assert!(!grid.line_of_sight(16.0, 16.0, 80.0, 16.0, 0.0, 1.0, 1.0));
        assert!(grid.line_of_sight(4.0, 4.0, 24.0, 28.0, 0.0, 1.0, 1.0));
        // Zero-length is always visible.
        assert!(grid.line_of_sight(48.0, 16.0, 48.0, 16.0, 10.0, 1.0, 1.0));
        // Range limit.
        assert!(!grid.line_of_sight(4.0, 4.0, 24.0, 28.0, 10.0, 1.0, 1.0));
    }

    #[test]
    fn refresh_tile_picks_up_edits() {
        let (mut map, mut grid) = grid_with(2, 1, &[]);
        assert_eq!(grid.tile_at(1, 0), TileKind::Walkable);
        map.layers[1].set_gid(1, 0, 1);
        grid.refresh_tile(&map, 1, 0);
        assert_eq!(grid.tile_at(1, 0), TileKind::Solid);

        // Out of range is ignored.
        grid.refresh_tile(&map, 7, 0);
    }
}
