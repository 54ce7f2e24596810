//! Warren Tiles
//!
//! Tile map source types, the subtile collision grid derived from them,
//! queued runtime tile edits and the door tile registry.

pub mod door;
pub mod grid;
pub mod map;
pub mod mask;
pub mod world;

pub use door::{DoorRegistry, DoorTile};
pub use grid::{CollisionGrid, TileKind, SUBTILES_PER_TILE, SUBTILE_SIZE, TILE_SIZE};
pub use map::{AnimationFrame, GidFlags, TileAnimation, TileLayer, TileMap, Tileset};
pub use mask::{MaskParseError, SubtileMask};
pub use world::{TileEdit, TileWorld};
