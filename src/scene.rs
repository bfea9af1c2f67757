//! JSON model description consumed by the CLI, and the tree built from it

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::path::Path;

use anyhow::Context;
use codvis_core::{GraphNode, ModelMetadata, NodeId, NodeKind, NodeTree, Vec3};
use serde::{Deserialize, Serialize};

/// One entity of an imported source model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    #[serde(default = "default_size")]
    pub size: f32,
    #[serde(default)]
    pub position: Option<[f32; 3]>,
    /// Resolved type reference, e.g. the class a variable is declared as.
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Attractions toward siblings, by sibling name.
    #[serde(default)]
    pub links: Vec<SceneLink>,
    #[serde(default)]
    pub children: Vec<SceneNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneLink {
    pub target: String,
    #[serde(default = "default_strength")]
    pub strength: f32,
}

fn default_size() -> f32 {
    1.0
}

fn default_strength() -> f32 {
    1.0
}

pub fn load_scene(path: &Path) -> anyhow::Result<SceneNode> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading model file {}", path.display()))?;
    let scene = serde_json::from_str(&text)
        .with_context(|| format!("parsing model file {}", path.display()))?;
    Ok(scene)
}

/// Stable starting offset in `[-1, 1]^3` derived from a node's name and its
/// child-slot path from the root. Same-named siblings get distinct offsets.
fn stable_offset(name: &str, path: &[usize]) -> Vec3 {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    path.hash(&mut hasher);
    let hash = hasher.finish();

    let unit = |bits: u64| ((bits & 0x1f_ffff) as f32 / 0x1f_ffff as f32) * 2.0 - 1.0;
    Vec3::new(unit(hash), unit(hash >> 21), unit(hash >> 42))
}

/// Build the node tree for `scene`. Nodes without an explicit position are
/// scattered within `spread` of the origin.
pub fn build_tree(scene: &SceneNode, spread: f32) -> anyhow::Result<(NodeTree, NodeId)> {
    let mut tree = NodeTree::new();
    let root = tree.insert(graph_node(scene, spread, &[]));
    attach_children(&mut tree, root, scene, spread, &[])?;
    Ok((tree, root))
}

fn graph_node(scene: &SceneNode, spread: f32, path: &[usize]) -> GraphNode {
    let position = scene
        .position
        .map(Vec3::from)
        .unwrap_or_else(|| stable_offset(&scene.name, path) * spread);
    let mut node = GraphNode::new(position, scene.name.clone(), scene.size, scene.kind.clone());
    if scene.type_name.is_some() || !scene.attributes.is_empty() {
        node.set_model_metadata(ModelMetadata {
            type_name: scene.type_name.clone(),
            attributes: scene.attributes.clone(),
        });
    }
    node
}

fn attach_children(
    tree: &mut NodeTree,
    parent: NodeId,
    scene: &SceneNode,
    spread: f32,
    path: &[usize],
) -> anyhow::Result<()> {
    let mut by_name = HashMap::new();
    let mut ids = Vec::with_capacity(scene.children.len());
    for (slot, child) in scene.children.iter().enumerate() {
        let child_path = [path, &[slot]].concat();
        let id = tree.add_child_node(parent, graph_node(child, spread, &child_path))?;
        by_name.entry(child.name.as_str()).or_insert(id);
        attach_children(tree, id, child, spread, &child_path)?;
        ids.push(id);
    }

    for (child, &id) in scene.children.iter().zip(&ids) {
        for link in &child.links {
            let Some(&target) = by_name.get(link.target.as_str()) else {
                tracing::warn!(
                    "Ignoring link from {} to unknown sibling {}",
                    child.name,
                    link.target
                );
                continue;
            };
            tree.link_nodes(id, target, link.strength)?;
        }
    }
    Ok(())
}
