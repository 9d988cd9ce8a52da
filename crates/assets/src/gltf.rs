//! glTF 2.0 JSON (`.gltf`) import.
//!
//! Reads the scene graph (names, TRS or matrix transforms, hierarchy), mesh
//! bounds from the POSITION accessor's min/max, and animation clip durations
//! from the sampler input accessors. Binary buffers are never touched.

use std::collections::BTreeMap;

use glam::{Mat4, Quat, Vec3};
use glade_common::{Aabb, Transform};
use serde::Deserialize;

use crate::AssetError;
use crate::model::{AnimationClip, Model, SceneNode};

#[derive(Debug, Deserialize)]
struct Document {
    scene: Option<usize>,
    #[serde(default)]
    scenes: Vec<DocScene>,
    #[serde(default)]
    nodes: Vec<DocNode>,
    #[serde(default)]
    meshes: Vec<DocMesh>,
    #[serde(default)]
    accessors: Vec<DocAccessor>,
    #[serde(default)]
    animations: Vec<DocAnimation>,
}

#[derive(Debug, Deserialize)]
struct DocScene {
    #[serde(default)]
    nodes: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct DocNode {
    name: Option<String>,
    #[serde(default)]
    children: Vec<usize>,
    mesh: Option<usize>,
    translation: Option<[f32; 3]>,
    rotation: Option<[f32; 4]>,
    scale: Option<[f32; 3]>,
    matrix: Option<[f32; 16]>,
}

#[derive(Debug, Deserialize)]
struct DocMesh {
    #[serde(default)]
    primitives: Vec<DocPrimitive>,
}

#[derive(Debug, Deserialize)]
struct DocPrimitive {
    #[serde(default)]
    attributes: BTreeMap<String, usize>,
}

#[derive(Debug, Deserialize)]
struct DocAccessor {
    min: Option<Vec<f32>>,
    max: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct DocAnimation {
    name: Option<String>,
    #[serde(default)]
    samplers: Vec<DocSampler>,
}

#[derive(Debug, Deserialize)]
struct DocSampler {
    input: usize,
}

/// Parse a glTF JSON document into a [`Model`].
pub fn parse_gltf(path: &str, text: &str) -> Result<Model, AssetError> {
    let doc: Document = serde_json::from_str(text).map_err(|source| AssetError::Parse {
        path: path.to_string(),
        source,
    })?;
    let invalid = |reason: String| AssetError::InvalidDocument {
        path: path.to_string(),
        reason,
    };

    let scene_index = doc.scene.unwrap_or(0);
    let scene = doc
        .scenes
        .get(scene_index)
        .ok_or_else(|| AssetError::MissingScene(path.to_string()))?;

    let mut nodes = Vec::with_capacity(scene.nodes.len());
    for &index in &scene.nodes {
        let mut visiting = Vec::new();
        nodes.push(build_node(&doc, index, &mut visiting).map_err(invalid)?);
    }

    let clips = doc
        .animations
        .iter()
        .enumerate()
        .map(|(i, anim)| AnimationClip {
            name: anim.name.clone().unwrap_or_else(|| format!("animation_{i}")),
            duration: anim
                .samplers
                .iter()
                .filter_map(|s| doc.accessors.get(s.input))
                .filter_map(|a| a.max.as_ref().and_then(|m| m.first().copied()))
                .fold(0.0f32, f32::max),
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        path,
        nodes = nodes.len(),
        clips = clips.len(),
        "glTF parsed"
    );
    Ok(Model::new(path, nodes, clips))
}

fn build_node(doc: &Document, index: usize, visiting: &mut Vec<usize>) -> Result<SceneNode, String> {
    if visiting.contains(&index) {
        return Err(format!("node {index} is its own ancestor"));
    }
    let node = doc
        .nodes
        .get(index)
        .ok_or_else(|| format!("node index {index} out of range"))?;

    visiting.push(index);
    let mut children = Vec::with_capacity(node.children.len());
    for &child in &node.children {
        children.push(build_node(doc, child, visiting)?);
    }
    visiting.pop();

    let mesh_bounds = match node.mesh {
        Some(mesh) => mesh_bounds(doc, mesh)?,
        None => Aabb::EMPTY,
    };

    Ok(SceneNode {
        name: node.name.clone().unwrap_or_default(),
        transform: node_transform(node),
        mesh_bounds,
        children,
    })
}

fn node_transform(node: &DocNode) -> Transform {
    if let Some(m) = node.matrix {
        let (scale, rotation, position) = Mat4::from_cols_array(&m).to_scale_rotation_translation();
        return Transform {
            position,
            rotation,
            scale,
        };
    }
    Transform {
        position: node.translation.map(Vec3::from_array).unwrap_or(Vec3::ZERO),
        rotation: node
            .rotation
            .map(|r| Quat::from_array(r).normalize())
            .unwrap_or(Quat::IDENTITY),
        scale: node.scale.map(Vec3::from_array).unwrap_or(Vec3::ONE),
    }
}

fn mesh_bounds(doc: &Document, mesh: usize) -> Result<Aabb, String> {
    let mesh = doc
        .meshes
        .get(mesh)
        .ok_or_else(|| format!("mesh index {mesh} out of range"))?;

    let mut bounds = Aabb::EMPTY;
    for primitive in &mesh.primitives {
        let Some(&accessor) = primitive.attributes.get("POSITION") else {
            continue;
        };
        let accessor = doc
            .accessors
            .get(accessor)
            .ok_or_else(|| format!("accessor index {accessor} out of range"))?;
        if let (Some(min), Some(max)) = (&accessor.min, &accessor.max) {
            if min.len() >= 3 && max.len() >= 3 {
                bounds = bounds.union(&Aabb::new(
                    Vec3::new(min[0], min[1], min[2]),
                    Vec3::new(max[0], max[1], max[2]),
                ));
            }
        }
    }
    Ok(bounds)
}
