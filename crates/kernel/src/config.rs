use std::path::Path;

use glam::Vec3;
use glade_input::KeyBindings;
use glade_physics::{BodyParams, PhysicsConfig};
use serde::{Deserialize, Serialize};

use crate::animation::AnimationSpec;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Top-level engine configuration. Every field has a default, so a config
/// file only needs the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub surface: SurfaceConfig,
    /// Longest frame delta fed to the pipeline, in seconds.
    pub max_frame_delta: f32,
    /// Optional frame rate cap for the run loop.
    pub max_fps: Option<u32>,
    pub world: WorldConfig,
    pub player: PlayerConfig,
    pub characters: CharacterConfig,
    pub camera: CameraConfig,
    pub physics: PhysicsConfig,
    pub keys: KeyBindings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            surface: SurfaceConfig::default(),
            max_frame_delta: 0.25,
            max_fps: None,
            world: WorldConfig::default(),
            player: PlayerConfig::default(),
            characters: CharacterConfig::default(),
            camera: CameraConfig::default(),
            physics: PhysicsConfig::default(),
            keys: KeyBindings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World scene holding the spawn markers.
    pub path: String,
    /// Uniform scale applied to the world scene and its marker positions.
    pub scale: f32,
    /// Markers are top-level nodes named `<prefix><entity name>`.
    pub marker_prefix: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            path: "models/gltf/world.gltf".into(),
            scale: 50.0,
            marker_prefix: "placeholder-".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub name: String,
    pub model: String,
    pub scale: f32,
    /// Ground speed in world units per second.
    pub speed: f32,
    /// Heading slerp rate; the per-frame fraction is `rotation_speed * dt`.
    pub rotation_speed: f32,
    pub body: Option<BodyParams>,
    /// Marker to spawn at. Spawns at the origin when unset.
    pub spawn_marker: Option<String>,
    pub animation: Option<AnimationSpec>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            name: "player".into(),
            model: "models/gltf/Cat.gltf".into(),
            scale: 4.0,
            speed: 50.0,
            rotation_speed: 5.0,
            body: Some(BodyParams {
                mass: 1_000_000.0,
                kind: glade_physics::BodyKind::Kinematic,
            }),
            spawn_marker: None,
            animation: Some(AnimationSpec::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    /// Spawned in this order, each at its marker.
    pub names: Vec<String>,
    /// Model path with `{name}` substituted.
    pub model_pattern: String,
    pub scale: f32,
    pub body: Option<BodyParams>,
    pub animation: Option<AnimationSpec>,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            names: ["ninja", "pinkblob", "dog", "wizard", "mushroom"]
                .into_iter()
                .map(String::from)
                .collect(),
            model_pattern: "models/gltf/{name}.gltf".into(),
            scale: 3.0,
            body: None,
            animation: Some(AnimationSpec::default()),
        }
    }
}

impl CharacterConfig {
    pub fn model_path(&self, name: &str) -> String {
        self.model_pattern.replace("{name}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 10.0, 250.0),
            target: Vec3::ZERO,
            fov_degrees: 30.0,
            near: 1.0,
            far: 5000.0,
            min_distance: 5.0,
            max_distance: 200.0,
        }
    }
}

impl EngineConfig {
    /// Load a JSON config file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |name: &str, v: f32| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be positive, got {v}")))
            }
        };
        positive("max_frame_delta", self.max_frame_delta)?;
        positive("world.scale", self.world.scale)?;
        positive("player.scale", self.player.scale)?;
        positive("player.speed", self.player.speed)?;
        positive("player.rotation_speed", self.player.rotation_speed)?;
        positive("characters.scale", self.characters.scale)?;
        positive("physics.fixed_step", self.physics.fixed_step)?;
        if self.physics.max_substeps == 0 {
            return Err(ConfigError::Invalid("physics.max_substeps must be at least 1".into()));
        }
        if self.camera.min_distance > self.camera.max_distance {
            return Err(ConfigError::Invalid(format!(
                "camera.min_distance {} exceeds max_distance {}",
                self.camera.min_distance, self.camera.max_distance
            )));
        }
        if self.max_fps == Some(0) {
            return Err(ConfigError::Invalid("max_fps must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.characters.names.len(), 5);
        assert_eq!(config.characters.model_path("dog"), "models/gltf/dog.gltf");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glade.json");
        std::fs::write(
            &path,
            r#"{"player": {"speed": 12.5}, "characters": {"names": ["ninja"]}}"#,
        )
        .unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.player.speed, 12.5);
        assert_eq!(config.player.scale, 4.0);
        assert_eq!(config.characters.names, vec!["ninja".to_string()]);
        assert_eq!(config.world.scale, 50.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = EngineConfig::default();
        config.world.scale = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = EngineConfig::default();
        config.camera.min_distance = 500.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = EngineConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            EngineConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
