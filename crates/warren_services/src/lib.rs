//! Warren Services Layer
//!
//! Host-facing services: per-tick input snapshots, settings, and a headless
//! texture provider for hosts without a renderer.

pub mod input;
pub mod settings;
pub mod textures;

pub use input::{Button, Buttons, InputLatch, InputState};
pub use settings::{PhysicsSettings, PlayerSettings, Settings, SettingsError, SimulationSettings, WorldSettings};
pub use textures::HeadlessTextures;
