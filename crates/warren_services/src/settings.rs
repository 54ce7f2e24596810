//! Settings management

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Engine settings. Every field has a default, so partial files are accepted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub simulation: SimulationSettings,
    pub player: PlayerSettings,
    pub world: WorldSettings,
    pub physics: PhysicsSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub tick_hz: f32,
    /// Longest frame the accumulator will catch up on, in seconds.
    pub max_frame_dt: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Pixels per second.
    pub speed: f32,
    /// Seconds a new direction must be held before facing commits to it.
    pub facing_change_time: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    pub collision_layer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    pub solver_iterations: u32,
    /// Weight multiplier for bodies that moved on their own this tick.
    pub intent_weight: f32,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_hz: 60.0,
            max_frame_dt: 0.25,
        }
    }
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            speed: 120.0,
            facing_change_time: 0.04,
        }
    }
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            collision_layer: "walls".to_string(),
        }
    }
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            solver_iterations: 4,
            intent_weight: 2.0,
        }
    }
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::from_json(&text)?;
        tracing::info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if !(self.simulation.tick_hz > 0.0) {
            return Err(SettingsError::Invalid {
                field: "simulation.tick_hz",
                reason: format!("must be positive, got {}", self.simulation.tick_hz),
            });
        }
        if !(self.simulation.max_frame_dt > 0.0) {
            return Err(SettingsError::Invalid {
                field: "simulation.max_frame_dt",
                reason: format!("must be positive, got {}", self.simulation.max_frame_dt),
            });
        }
        if self.physics.solver_iterations == 0 {
            return Err(SettingsError::Invalid {
                field: "physics.solver_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let settings = Settings::from_json("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.simulation.tick_hz, 60.0);
        assert_eq!(settings.player.speed, 120.0);
        assert_eq!(settings.world.collision_layer, "walls");
        assert_eq!(settings.physics.solver_iterations, 4);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let settings = Settings::from_json(r#"{ "player": { "speed": 90.0 } }"#).unwrap();
        assert_eq!(settings.player.speed, 90.0);
        assert_eq!(settings.player.facing_change_time, 0.04);
        assert_eq!(settings.simulation.max_frame_dt, 0.25);
    }

    #[test]
    fn rejects_bad_values() {
        let err = Settings::from_json(r#"{ "simulation": { "tick_hz": 0.0 } }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { field: "simulation.tick_hz", .. }));
        assert!(matches!(
            Settings::from_json("not json"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn json_round_trip() {
        let mut settings = Settings::default();
        settings.world.collision_layer = "solid".into();
        let text = settings.to_json().unwrap();
        assert_eq!(Settings::from_json(&text).unwrap(), settings);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Settings::load("/nonexistent/warren/settings.json").unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }
}
