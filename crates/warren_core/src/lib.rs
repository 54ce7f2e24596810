//! Warren Core
//!
//! Contains the fundamental simulation building blocks:
//! - Fixed-capacity entity store with generational handles
//! - Phased system scheduler
//! - Fixed-step simulation clock
//! - Math re-exports and external asset handle contracts

pub mod assets;
pub mod ecs;
pub mod math;
pub mod systems;
pub mod time;

pub use glam;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
