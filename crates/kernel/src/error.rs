use glade_assets::AssetError;
use glade_physics::PhysicsError;
use glade_render::RenderError;

use crate::assembly::AssemblyError;
use crate::config::ConfigError;
use crate::engine::EngineState;

/// Errors that stop engine startup or the run loop.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("asset load failed: {0}")]
    Asset(#[from] AssetError),
    #[error("world assembly failed: {0}")]
    Assembly(#[from] AssemblyError),
    #[error("physics failure: {0}")]
    Physics(#[from] PhysicsError),
    #[error("render failure: {0}")]
    Render(#[from] RenderError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("engine is {actual:?}, expected {expected:?}")]
    InvalidState {
        expected: EngineState,
        actual: EngineState,
    },
}

/// Error type returned by custom [`crate::entity::Behavior`]s.
pub type BehaviorError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single entity's update. The frame loop isolates these.
#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    #[error("entity {name} produced a non-finite transform")]
    NonFiniteTransform { name: String },
    #[error("entity {name} behavior failed: {source}")]
    Behavior {
        name: String,
        #[source]
        source: BehaviorError,
    },
}
