use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::AssetError;
use crate::gltf::parse_gltf;
use crate::model::Model;

/// Asynchronous model source.
///
/// The engine only awaits loads during startup; the frame loop never does.
#[allow(async_fn_in_trait)]
pub trait ModelLoader {
    async fn load(&self, path: &str) -> Result<Model, AssetError>;
}

/// Loads `.gltf` JSON documents relative to an asset root directory.
#[derive(Debug, Clone)]
pub struct GltfLoader {
    root: PathBuf,
}

impl GltfLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ModelLoader for GltfLoader {
    async fn load(&self, path: &str) -> Result<Model, AssetError> {
        let full = self.root.join(path);
        if !full.is_file() {
            return Err(AssetError::NotFound(path.to_string()));
        }
        let text = std::fs::read_to_string(&full).map_err(|source| AssetError::Io {
            path: path.to_string(),
            source,
        })?;
        tracing::debug!(path, bytes = text.len(), "model read");
        parse_gltf(path, &text)
    }
}

/// Serves prebuilt models from memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    models: BTreeMap<String, Model>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model under its own path.
    pub fn insert(&mut self, model: Model) {
        self.models.insert(model.path.clone(), model);
    }

    pub fn with(mut self, model: Model) -> Self {
        self.insert(model);
        self
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl ModelLoader for MemoryLoader {
    async fn load(&self, path: &str) -> Result<Model, AssetError> {
        self.models
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SceneNode;

    #[test]
    fn gltf_loader_reads_from_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("models")).unwrap();
        std::fs::write(
            dir.path().join("models/box.gltf"),
            r#"{"scenes": [{"nodes": [0]}], "nodes": [{"name": "Box"}]}"#,
        )
        .unwrap();

        let loader = GltfLoader::new(dir.path());
        let model = pollster::block_on(loader.load("models/box.gltf")).unwrap();
        assert_eq!(model.path, "models/box.gltf");
        assert_eq!(model.primary().unwrap().name, "Box");
    }

    #[test]
    fn gltf_loader_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = GltfLoader::new(dir.path());
        let err = pollster::block_on(loader.load("nope.gltf")).unwrap_err();
        assert!(matches!(err, AssetError::NotFound(p) if p == "nope.gltf"));
    }

    #[test]
    fn memory_loader_round_trip() {
        let loader = MemoryLoader::new().with(Model::new(
            "a.gltf",
            vec![SceneNode::new("A")],
            Vec::new(),
        ));
        assert_eq!(loader.len(), 1);
        let model = pollster::block_on(loader.load("a.gltf")).unwrap();
        assert_eq!(model.nodes.len(), 1);
        assert!(pollster::block_on(loader.load("b.gltf")).is_err());
    }
}
