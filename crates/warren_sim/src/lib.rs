//! Warren Sim
//!
//! The per-tick simulation over a [`warren_core::ecs::World`]:
//! - Proximity/trigger pairs with enter, stay and exit views
//! - Velocity integration, tile collision and entity separation
//! - Carry-and-throw (liftable) objects and pointer dragging into storage
//! - Sprite sheet animation
//! - Pursuit AI, player movement and the gameplay consumers of proximity
//! - [`Game`] state with its standard system table, and a frame driver

pub mod animation;
pub mod doors;
pub mod follow;
pub mod game;
pub mod gameplay;
pub mod gravity_gun;
pub mod liftable;
pub mod movement;
pub mod native;
pub mod physics;
pub mod proximity;
pub mod runner;

pub use game::{register_systems, Game, SharedPhysicsBackend, SharedTextures};
pub use gameplay::{player_stats, vendor_hint, Purchase, VendorHint};
pub use gravity_gun::storage_status;
pub use native::{NativePhysicsBackend, NullPhysicsBackend, TrackingPhysicsBackend};
pub use physics::{PhysicsConfig, PhysicsSolver};
pub use proximity::{Proximity, ProximityPair};
pub use runner::Simulation;
