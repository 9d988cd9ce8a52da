use glade_common::{Aabb, Transform};

/// A node of a loaded scene graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    /// Transform relative to the parent node.
    pub transform: Transform,
    /// Bounds of the node's own mesh in node space. Empty if it has none.
    pub mesh_bounds: Aabb,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            mesh_bounds: Aabb::EMPTY,
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_mesh_bounds(mut self, bounds: Aabb) -> Self {
        self.mesh_bounds = bounds;
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    /// Bounds of this node and its descendants, in this node's own space.
    pub fn local_bounds(&self) -> Aabb {
        self.children
            .iter()
            .fold(self.mesh_bounds, |acc, child| acc.union(&child.subtree_bounds()))
    }

    /// Bounds of this node and its descendants, in the parent's space.
    pub fn subtree_bounds(&self) -> Aabb {
        self.local_bounds().transformed(&self.transform.matrix())
    }
}

/// A named animation clip.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// Native length in seconds.
    pub duration: f32,
}

/// A loaded model: the scene root's children plus its animation clips.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub path: String,
    pub nodes: Vec<SceneNode>,
    pub clips: Vec<AnimationClip>,
}

impl Model {
    pub fn new(path: impl Into<String>, nodes: Vec<SceneNode>, clips: Vec<AnimationClip>) -> Self {
        Self {
            path: path.into(),
            nodes,
            clips,
        }
    }

    /// The first top-level node, which is what gets spawned for a model.
    pub fn primary(&self) -> Option<&SceneNode> {
        self.nodes.first()
    }

    /// Top-level nodes with the given name.
    pub fn find_children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SceneNode> + 'a {
        self.nodes.iter().filter(move |n| n.name == name)
    }

    /// Bounds of the whole scene in scene space.
    pub fn bounds(&self) -> Aabb {
        self.nodes
            .iter()
            .fold(Aabb::EMPTY, |acc, node| acc.union(&node.subtree_bounds()))
    }
}
