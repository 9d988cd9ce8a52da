//! Glade kernel: entities, locomotion, physics sync, world assembly and the
//! frame scheduler.
//!
//! # Invariants
//! - An entity update mutates only that entity's own transform and capability state.
//! - Input is drained once at frame start; every entity sees the same snapshot.
//! - Physics sync follows body kind: kinematic pushed before the step, dynamic pulled after.
//! - A collision box is sized once, at registration.
//! - A failing entity is faulted and skipped; the frame loop keeps going.
//! - Disposing an entity removes it from the world in the same call.

pub mod animation;
pub mod assembly;
pub mod camera;
pub mod clock;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod locomotion;
pub mod world;

pub use animation::{AnimationPlayer, AnimationSpec, advance_animations};
pub use assembly::{AssemblyError, SpawnPoint, assemble, marker_names, resolve_markers};
pub use camera::OrbitCamera;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{CameraConfig, CharacterConfig, ConfigError, EngineConfig, PlayerConfig, SurfaceConfig, WorldConfig};
pub use engine::{Engine, EngineState, FrameStats, StopHandle};
pub use entity::{Behavior, Entity, FrameContext, PlayerController, RenderHandle, SpawnParams};
pub use error::{BehaviorError, EngineError, EntityError};
pub use locomotion::{Locomotion, intent, look_rotation};
pub use world::World;
