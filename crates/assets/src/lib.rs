//! Model loading: scene graphs, bounds and animation clips.
//!
//! The engine consumes models through the [`ModelLoader`] trait and never
//! sees raw files. Only startup awaits a loader.

mod gltf;
mod loader;
mod model;

pub use gltf::parse_gltf;
pub use loader::{GltfLoader, MemoryLoader, ModelLoader};
pub use model::{AnimationClip, Model, SceneNode};

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("glTF parse error in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid glTF document {path}: {reason}")]
    InvalidDocument { path: String, reason: String },
    #[error("glTF document {0} has no scene")]
    MissingScene(String),
    #[error("model {0} has no root node")]
    EmptyModel(String),
}
