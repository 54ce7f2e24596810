//! Parsed tile map source.
//!
//! Produced by an external map loader (or deserialized from JSON by headless
//! hosts). Gids are 1-based global tile ids with flip flags packed into the
//! top three bits; 0 means "no tile".

use crate::mask::SubtileMask;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const GID_FLIP_H: u32 = 0x8000_0000;
pub const GID_FLIP_V: u32 = 0x4000_0000;
pub const GID_FLIP_D: u32 = 0x2000_0000;
pub const GID_FLAG_MASK: u32 = GID_FLIP_H | GID_FLIP_V | GID_FLIP_D;
pub const GID_MASK: u32 = 0x1FFF_FFFF;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct GidFlags {
    pub horizontal: bool,
    pub vertical: bool,
    pub diagonal: bool,
}

impl GidFlags {
    /// Split a raw gid into its bare id and flip flags.
    pub fn split(raw_gid: u32) -> (u32, GidFlags) {
        let flags = GidFlags {
            horizontal: raw_gid & GID_FLIP_H != 0,
            vertical: raw_gid & GID_FLIP_V != 0,
            diagonal: raw_gid & GID_FLIP_D != 0,
        };
        (raw_gid & GID_MASK, flags)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationFrame {
    pub tile_id: u32,
    pub duration_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TileAnimation {
    pub frames: Vec<AnimationFrame>,
}

impl TileAnimation {
    pub fn total_duration_ms(&self) -> u32 {
        self.frames.iter().map(|f| f.duration_ms).sum()
    }

    /// Local tile id shown `t_ms` into the animation. Reverse playback walks
    /// the frames from last to first. Past the end the final frame of the
    /// chosen direction holds.
    pub fn frame_at(&self, t_ms: f32, forward: bool) -> Option<u32> {
        let total = self.total_duration_ms();
        if self.frames.is_empty() || total == 0 {
            return None;
        }
        let ordered: Box<dyn Iterator<Item = &AnimationFrame>> = if forward {
            Box::new(self.frames.iter())
        } else {
            Box::new(self.frames.iter().rev())
        };
        let mut acc = 0u32;
        let mut last = None;
        for frame in ordered {
            acc += frame.duration_ms;
            last = Some(frame.tile_id);
            if t_ms < acc as f32 {
                return Some(frame.tile_id);
            }
        }
        last
    }
}

/// Tileset metadata relevant to simulation: per-tile colliders, dynamic
/// markers and animations. Keys are local tile ids.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tileset {
    #[serde(default)]
    pub name: String,
    pub first_gid: u32,
    pub tile_count: u32,
    #[serde(default)]
    pub colliders: BTreeMap<u32, SubtileMask>,
    /// Tiles whose occupancy changes at runtime (doors and the like).
    #[serde(default)]
    pub dynamic: BTreeSet<u32>,
    #[serde(default)]
    pub animations: BTreeMap<u32, TileAnimation>,
}

impl Tileset {
    pub fn new(name: &str, first_gid: u32, tile_count: u32) -> Self {
        Self {
            name: name.to_string(),
            first_gid,
            tile_count,
            ..Default::default()
        }
    }

    pub fn with_collider(mut self, local_id: u32, mask: SubtileMask) -> Self {
        self.colliders.insert(local_id, mask);
        self
    }

    pub fn with_dynamic(mut self, local_id: u32) -> Self {
        self.dynamic.insert(local_id);
        self
    }

    pub fn with_animation(mut self, local_id: u32, frames: &[(u32, u32)]) -> Self {
        let frames = frames
            .iter()
            .map(|&(tile_id, duration_ms)| AnimationFrame { tile_id, duration_ms })
            .collect();
        self.animations.insert(local_id, TileAnimation { frames });
        self
    }

    /// Local id of a bare gid, if this tileset owns it.
    pub fn local_id(&self, gid: u32) -> Option<u32> {
        let local = gid.checked_sub(self.first_gid)?;
        (local < self.tile_count).then_some(local)
    }

    pub fn collider(&self, local_id: u32) -> SubtileMask {
        self.colliders.get(&local_id).copied().unwrap_or_default()
    }

    pub fn is_dynamic(&self, local_id: u32) -> bool {
        self.dynamic.contains(&local_id)
    }

    pub fn animation(&self, local_id: u32) -> Option<&TileAnimation> {
        self.animations.get(&local_id)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TileLayer {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Row-major raw gids, `width * height` entries.
    pub gids: Vec<u32>,
    /// Layer contributes to the collision grid.
    #[serde(default)]
    pub collision: bool,
}

impl TileLayer {
    /// Layer of the given size with every cell empty.
    pub fn empty(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            gids: vec![0; (width * height) as usize],
            collision: false,
        }
    }

    pub fn with_collision(mut self, collision: bool) -> Self {
        self.collision = collision;
        self
    }

    fn cell(&self, tx: i32, ty: i32) -> Option<usize> {
        if tx < 0 || ty < 0 || tx as u32 >= self.width || ty as u32 >= self.height {
            return None;
        }
        let idx = ty as usize * self.width as usize + tx as usize;
        (idx < self.gids.len()).then_some(idx)
    }

    pub fn gid_at(&self, tx: i32, ty: i32) -> Option<u32> {
        self.cell(tx, ty).map(|i| self.gids[i])
    }

    pub fn set_gid(&mut self, tx: i32, ty: i32, raw_gid: u32) -> bool {
        match self.cell(tx, ty) {
            Some(i) => {
                self.gids[i] = raw_gid;
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TileMap {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    #[serde(default)]
    pub tilesets: Vec<Tileset>,
    /// Bottom to top draw order.
    #[serde(default)]
    pub layers: Vec<TileLayer>,
}

impl TileMap {
    pub fn new(width: u32, height: u32, tile_size: u32) -> Self {
        Self {
            width,
            height,
            tile_width: tile_size,
            tile_height: tile_size,
            ..Default::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn in_bounds(&self, tx: i32, ty: i32) -> bool {
        tx >= 0 && ty >= 0 && (tx as u32) < self.width && (ty as u32) < self.height
    }

    /// Tileset index and local id owning a bare gid.
    pub fn tileset_for_gid(&self, gid: u32) -> Option<(usize, u32)> {
        self.tilesets
            .iter()
            .enumerate()
            .find_map(|(i, ts)| ts.local_id(gid).map(|local| (i, local)))
    }

    /// Collision mask (flips applied) and dynamic flag of a raw gid.
    ///
    /// The diagonal flag does not affect collision.
    pub fn decode_gid(&self, raw_gid: u32) -> Option<(SubtileMask, bool)> {
        let (gid, flags) = GidFlags::split(raw_gid);
        if gid == 0 {
            return None;
        }
        let (ts_index, local) = self.tileset_for_gid(gid)?;
        let tileset = &self.tilesets[ts_index];
        let mut mask = tileset.collider(local);
        if flags.horizontal {
            mask = mask.flip_h();
        }
        if flags.vertical {
            mask = mask.flip_v();
        }
        Some((mask, tileset.is_dynamic(local)))
    }

    pub fn layer_index(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name == name)
    }

    /// Topmost non-empty raw gid among collision layers at a tile.
    pub fn collision_gid_at(&self, tx: i32, ty: i32) -> u32 {
        self.layers
            .iter()
            .rev()
            .filter(|l| l.collision)
            .filter_map(|l| l.gid_at(tx, ty))
            .find(|&gid| gid != 0)
            .unwrap_or(0)
    }

    /// Flag layers named `name` as collision-bearing.
    pub fn mark_collision_layer(&mut self, name: &str) -> usize {
        let mut marked = 0;
        for layer in self.layers.iter_mut().filter(|l| l.name == name) {
            layer.collision = true;
            marked += 1;
        }
        marked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall_map() -> TileMap {
        let wall: SubtileMask = "[1111],[1111],[1111],[1111]".parse().unwrap();
        let corner: SubtileMask = "[1000],[0000],[0000],[0000]".parse().unwrap();
        let mut map = TileMap::new(2, 1, 32);
        map.tilesets.push(
            Tileset::new("walls", 1, 4)
                .with_collider(0, wall)
                .with_collider(1, corner)
                .with_dynamic(1),
        );
        let mut layer = TileLayer::empty("walls", 2, 1).with_collision(true);
        layer.set_gid(0, 0, 1);
        layer.set_gid(1, 0, 2 | GID_FLIP_H);
        map.layers.push(layer);
        map
    }

    #[test]
    fn decode_applies_flips() {
        let map = wall_map();
        let (mask, dynamic) = map.decode_gid(2 | GID_FLIP_H).unwrap();
        assert!(mask.is_blocked(3, 0));
        assert!(dynamic);

        let (mask, _) = map.decode_gid(2 | GID_FLIP_D).unwrap();
        assert!(mask.is_blocked(0, 0));

        assert!(map.decode_gid(0).is_none());
        assert!(map.decode_gid(99).is_none());
    }

    #[test]
    fn collision_gid_prefers_topmost_layer() {
        let mut map = wall_map();
        let mut top = TileLayer::empty("overlay", 2, 1).with_collision(true);
        top.set_gid(0, 0, 3);
        map.layers.push(top);
        assert_eq!(map.collision_gid_at(0, 0), 3);
        assert_eq!(map.collision_gid_at(1, 0), 2 | GID_FLIP_H);
        assert_eq!(map.collision_gid_at(5, 0), 0);
    }

    #[test]
    fn animation_frames_forward_and_reverse() {
        let ts = Tileset::new("door", 1, 8).with_animation(0, &[(0, 100), (1, 100), (2, 100)]);
        let anim = ts.animation(0).unwrap();
        assert_eq!(anim.total_duration_ms(), 300);
        assert_eq!(anim.frame_at(0.0, true), Some(0));
        assert_eq!(anim.frame_at(150.0, true), Some(1));
        assert_eq!(anim.frame_at(999.0, true), Some(2));
        assert_eq!(anim.frame_at(50.0, false), Some(2));
        assert_eq!(anim.frame_at(999.0, false), Some(0));
    }

    #[test]
    fn map_deserializes_from_json() {
        let json = r#"{
            "width": 1, "height": 1, "tile_width": 32, "tile_height": 32,
            "tilesets": [{ "first_gid": 1, "tile_count": 1,
                           "colliders": { "0": "[1111],[1111],[1111],[1111]" } }],
            "layers": [{ "name": "walls", "width": 1, "height": 1, "gids": [1] }]
        }"#;
        let map = TileMap::from_json(json).unwrap();
        assert!(map.tilesets[0].collider(0).is_full());
        assert!(!map.layers[0].collision);
    }
}
