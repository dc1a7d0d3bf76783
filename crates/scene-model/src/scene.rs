//! Scene graph: a node arena with local transforms and cached world matrices.
//!
//! Loaded model geometry is marked with the `selectable` tag. Everything
//! else that lives in the graph (camera rig, lights, helpers, grid) stays
//! untagged so framing and picking can ignore it.
//!
//! World matrices are cached per node and only refreshed by
//! [`SceneGraph::update_world_matrices`]. Between calls, a moved node's cached
//! matrix is stale.

use std::collections::HashMap;
use std::path::Path;

use glam::{DMat4, DQuat, DVec3, EulerRot};
use lumina_common::{LuminaError, LuminaResult};
use serde::{Deserialize, Serialize};

use crate::bounds::Aabb;

/// Stable handle to a node. Handles are never reused after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node represents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Pure transform node.
    Group,
    /// Renderable geometry with bounds in the node's local space.
    Mesh { bounds: Aabb },
    Light,
    /// Grid, axes, gizmos and other editor scaffolding.
    Helper,
    /// Camera rig.
    Camera,
}

/// Local transform of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
        scale: DVec3::ONE,
    };

    pub fn from_position(position: DVec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn matrix(&self) -> DMat4 {
        DMat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A single scene-graph node.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub selectable: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    world: DMat4,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            transform: Transform::IDENTITY,
            selectable: false,
            parent: None,
            children: Vec::new(),
            world: DMat4::IDENTITY,
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn mesh(name: impl Into<String>, bounds: Aabb) -> Self {
        Self::new(name, NodeKind::Mesh { bounds })
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn at(self, position: DVec3) -> Self {
        self.with_transform(Transform::from_position(position))
    }

    /// Tag the node as part of the loaded model.
    pub fn selectable(mut self) -> Self {
        self.selectable = true;
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Cached world matrix as of the last propagation pass.
    pub fn world_matrix(&self) -> &DMat4 {
        &self.world
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh { .. })
    }

    /// World-space bounds of a mesh node from its cached world matrix.
    pub fn world_bounds(&self) -> Option<Aabb> {
        match &self.kind {
            NodeKind::Mesh { bounds } => Some(bounds.transformed(&self.world)),
            _ => None,
        }
    }
}

/// Arena-backed scene graph.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    slots: Vec<Option<SceneNode>>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `node` under `parent` (or at the top level).
    pub fn insert(&mut self, parent: Option<NodeId>, mut node: SceneNode) -> LuminaResult<NodeId> {
        if let Some(p) = parent {
            if self.node(p).is_none() {
                return Err(LuminaError::scene(format!(
                    "parent node {} does not exist",
                    p.index()
                )));
            }
        }

        let id = NodeId(self.slots.len());
        node.parent = parent;
        node.children.clear();
        node.world = match parent.and_then(|p| self.node(p)) {
            Some(p) => p.world * node.transform.matrix(),
            None => node.transform.matrix(),
        };
        self.slots.push(Some(node));

        match parent {
            Some(p) => {
                if let Some(parent_node) = self.node_mut(p) {
                    parent_node.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        Ok(id)
    }

    /// Remove a node and its whole subtree. Returns the number of nodes removed.
    pub fn remove(&mut self, id: NodeId) -> usize {
        let parent = match self.node(id) {
            Some(node) => node.parent,
            None => return 0,
        };
        match parent {
            Some(p) => {
                if let Some(parent_node) = self.node_mut(p) {
                    parent_node.children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }

        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.slots.get_mut(current.0).and_then(Option::take) {
                stack.extend(node.children);
                removed += 1;
            }
        }
        removed
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Replace a node's local transform. The cached world matrix is left
    /// stale until the next propagation pass.
    pub fn set_transform(&mut self, id: NodeId, transform: Transform) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.transform = transform;
                true
            }
            None => false,
        }
    }

    /// Find the first node with the given name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        let mut found = None;
        self.traverse(|id, node| {
            if found.is_none() && node.name == name {
                found = Some(id);
            }
        });
        found
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Recompute every world matrix from the roots down, dirty or not.
    pub fn update_world_matrices(&mut self) {
        let mut stack: Vec<(NodeId, DMat4)> =
            self.roots.iter().rev().map(|r| (*r, DMat4::IDENTITY)).collect();

        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.node_mut(id) else {
                continue;
            };
            node.world = parent_world * node.transform.matrix();
            let world = node.world;
            stack.extend(node.children.iter().rev().map(|c| (*c, world)));
        }
    }

    /// Depth-first, pre-order traversal in insertion order.
    pub fn traverse(&self, mut visit: impl FnMut(NodeId, &SceneNode)) {
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if let Some(node) = self.node(id) {
                visit(id, node);
                stack.extend(node.children.iter().rev());
            }
        }
    }

    /// Build a graph from a parsed description.
    pub fn from_description(desc: &SceneDescription) -> LuminaResult<Self> {
        let mut graph = SceneGraph::new();
        let mut by_name: HashMap<&str, NodeId> = HashMap::new();

        for (index, entry) in desc.nodes.iter().enumerate() {
            if by_name.contains_key(entry.name.as_str()) {
                return Err(LuminaError::scene(format!(
                    "duplicate node name '{}' at index {index}",
                    entry.name
                )));
            }
            let parent = match &entry.parent {
                Some(name) => Some(*by_name.get(name.as_str()).ok_or_else(|| {
                    LuminaError::scene(format!(
                        "node '{}' references unknown parent '{name}' (parents must come first)",
                        entry.name
                    ))
                })?),
                None => None,
            };

            let [rx, ry, rz] = entry.rotation_deg.map(f64::to_radians);
            let mut node = SceneNode::new(entry.name.clone(), entry.kind.clone()).with_transform(
                Transform {
                    position: entry.position,
                    rotation: DQuat::from_euler(EulerRot::XYZ, rx, ry, rz),
                    scale: entry.scale,
                },
            );
            node.selectable = entry.selectable;

            let id = graph.insert(parent, node)?;
            by_name.insert(entry.name.as_str(), id);
        }

        tracing::debug!(nodes = graph.len(), "built scene graph from description");
        Ok(graph)
    }

    /// Load and build a graph from a JSON scene description file.
    pub fn load(path: &Path) -> LuminaResult<Self> {
        let content = LuminaError::read_file(path)?;
        let desc: SceneDescription =
            serde_json::from_str(&content).map_err(|source| LuminaError::ParseAt {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_description(&desc)
    }
}

/// Serialized scene layout (`scene.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneDescription {
    pub nodes: Vec<NodeDescription>,
}

/// One node entry of a scene description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDescription {
    pub name: String,

    /// Name of a node listed earlier in the file.
    #[serde(default)]
    pub parent: Option<String>,

    #[serde(flatten)]
    pub kind: NodeKind,

    #[serde(default)]
    pub position: DVec3,

    /// Euler angles in degrees, applied in X, Y, Z order.
    #[serde(default)]
    pub rotation_deg: [f64; 3],

    #[serde(default = "unit_scale")]
    pub scale: DVec3,

    #[serde(default)]
    pub selectable: bool,
}

fn unit_scale() -> DVec3 {
    DVec3::ONE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::new(DVec3::splat(-0.5), DVec3::splat(0.5))
    }

    #[test]
    fn test_insert_and_traverse_order() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(None, SceneNode::group("model")).unwrap();
        let a = graph.insert(Some(root), SceneNode::mesh("a", unit_box())).unwrap();
        let light = graph.insert(None, SceneNode::new("sun", NodeKind::Light)).unwrap();
        let b = graph.insert(Some(root), SceneNode::mesh("b", unit_box())).unwrap();

        let mut order = vec![];
        graph.traverse(|id, _| order.push(id));
        assert_eq!(order, vec![root, a, b, light]);
        assert_eq!(graph.find("b"), Some(b));
    }

    #[test]
    fn test_insert_rejects_unknown_parent() {
        let mut graph = SceneGraph::new();
        let err = graph
            .insert(Some(NodeId(7)), SceneNode::group("orphan"))
            .unwrap_err();
        assert!(matches!(err, LuminaError::Scene { .. }));
    }

    #[test]
    fn test_world_matrix_is_stale_until_update() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(None, SceneNode::group("model")).unwrap();
        let mesh = graph
            .insert(Some(root), SceneNode::mesh("part", unit_box()).at(DVec3::new(1.0, 0.0, 0.0)))
            .unwrap();

        graph.set_transform(root, Transform::from_position(DVec3::new(0.0, 10.0, 0.0)));
        let stale = graph.node(mesh).unwrap().world_matrix().w_axis.truncate();
        assert_eq!(stale, DVec3::new(1.0, 0.0, 0.0));

        graph.update_world_matrices();
        let fresh = graph.node(mesh).unwrap().world_matrix().w_axis.truncate();
        assert_eq!(fresh, DVec3::new(1.0, 10.0, 0.0));
    }

    #[test]
    fn test_remove_drops_subtree_and_never_reuses_ids() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(None, SceneNode::group("model")).unwrap();
        graph.insert(Some(root), SceneNode::mesh("a", unit_box())).unwrap();
        graph.insert(Some(root), SceneNode::mesh("b", unit_box())).unwrap();

        assert_eq!(graph.remove(root), 3);
        assert_eq!(graph.len(), 0);
        assert!(graph.is_empty());
        assert_eq!(graph.remove(root), 0);

        let next = graph.insert(None, SceneNode::group("again")).unwrap();
        assert_eq!(next.index(), 3);
    }

    #[test]
    fn test_world_bounds_follow_parent_scale() {
        let mut graph = SceneGraph::new();
        let root = graph
            .insert(
                None,
                SceneNode::group("model").with_transform(Transform {
                    scale: DVec3::splat(2.0),
                    ..Transform::IDENTITY
                }),
            )
            .unwrap();
        let mesh = graph.insert(Some(root), SceneNode::mesh("a", unit_box())).unwrap();
        graph.update_world_matrices();

        let bounds = graph.node(mesh).unwrap().world_bounds().unwrap();
        assert_eq!(bounds, Aabb::new(DVec3::splat(-1.0), DVec3::ONE));
    }

    #[test]
    fn test_description_parsing() {
        let json = r#"{
            "nodes": [
                { "name": "rig", "type": "camera" },
                { "name": "model", "type": "group", "position": [0, 1, 0] },
                { "name": "hull", "parent": "model", "type": "mesh", "selectable": true,
                  "bounds": { "min": [-1, -1, -1], "max": [1, 1, 1] } },
                { "name": "grid", "type": "helper" }
            ]
        }"#;
        let desc: SceneDescription = serde_json::from_str(json).unwrap();
        let graph = SceneGraph::from_description(&desc).unwrap();

        assert_eq!(graph.len(), 4);
        let hull = graph.node(graph.find("hull").unwrap()).unwrap();
        assert!(hull.selectable);
        assert!(hull.is_mesh());
        assert_eq!(hull.transform.scale, DVec3::ONE);
        assert!(!graph.node(graph.find("grid").unwrap()).unwrap().selectable);
    }

    #[test]
    fn test_description_rejects_forward_parent_reference() {
        let desc = SceneDescription {
            nodes: vec![NodeDescription {
                name: "hull".to_string(),
                parent: Some("model".to_string()),
                kind: NodeKind::Group,
                position: DVec3::ZERO,
                rotation_deg: [0.0; 3],
                scale: DVec3::ONE,
                selectable: false,
            }],
        };
        assert!(SceneGraph::from_description(&desc).is_err());
    }
}
