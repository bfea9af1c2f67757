//! Test fixtures for building node trees

use std::collections::HashMap;

use crate::model::{GraphNode, ModelMetadata, NodeId, NodeKind};
use crate::tree::NodeTree;
use crate::vector::Vec3;

pub fn node(name: &str, kind: NodeKind) -> GraphNode {
    GraphNode::new(Vec3::ZERO, name, 1.0, kind)
}

/// A small model of one source file:
///
/// ```text
/// app (namespace)
/// ├── Engine (class)
/// │   ├── start (function)
/// │   ├── Engine (variable, type Config)
/// │   └── Config (class)
/// │       └── load (function)
/// ├── Widget (class)
/// │   └── draw (function)
/// └── main (function)
///     └── counter (variable)
/// ```
pub fn sample_tree() -> (NodeTree, HashMap<&'static str, NodeId>) {
    let mut tree = NodeTree::new();
    let mut ids = HashMap::new();

    let app = tree.insert(node("app", NodeKind::Namespace));
    ids.insert("app", app);

    let engine = tree.add_child_node(app, node("Engine", NodeKind::Class)).unwrap();
    ids.insert("Engine", engine);
    ids.insert("start", tree.add_child_node(engine, node("start", NodeKind::Function)).unwrap());

    let mut alias = node("Engine", NodeKind::Variable);
    alias.set_model_metadata(ModelMetadata::with_type("Config"));
    ids.insert("Engine.alias", tree.add_child_node(engine, alias).unwrap());

    let config = tree.add_child_node(engine, node("Config", NodeKind::Class)).unwrap();
    ids.insert("Config", config);
    ids.insert("load", tree.add_child_node(config, node("load", NodeKind::Function)).unwrap());

    let widget = tree.add_child_node(app, node("Widget", NodeKind::Class)).unwrap();
    ids.insert("Widget", widget);
    ids.insert("draw", tree.add_child_node(widget, node("draw", NodeKind::Function)).unwrap());

    let main = tree.add_child_node(app, node("main", NodeKind::Function)).unwrap();
    ids.insert("main", main);
    ids.insert("counter", tree.add_child_node(main, node("counter", NodeKind::Variable)).unwrap());

    (tree, ids)
}

/// Deterministic pseudo-random tree of `count` nodes. Each new node hangs
/// under a previously created one.
pub fn generated_tree(count: usize, seed: u64) -> (NodeTree, NodeId) {
    let mut tree = NodeTree::new();
    let root = tree.insert(node("n0", NodeKind::Namespace));
    let mut created = vec![root];
    let mut state = seed;

    for i in 1..count {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        let parent = created[((state >> 33) as usize) % created.len()];
        let child = tree
            .add_child_node(parent, node(&format!("n{i}"), NodeKind::Function))
            .unwrap();
        created.push(child);
    }

    (tree, root)
}

/// Reference post-order enumeration, independent of the cached indices.
pub fn postorder(tree: &NodeTree, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    for &child in tree.children(root) {
        out.extend(postorder(tree, child));
    }
    out.push(root);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_tree_shape() {
        let (tree, ids) = sample_tree();
        assert_eq!(tree.len(), 10);
        assert_eq!(tree.roots(), vec![ids["app"]]);
        assert_eq!(tree.children(ids["Engine"]).len(), 3);
    }

    #[test]
    fn test_generated_tree_is_deterministic() {
        let (a, root_a) = generated_tree(40, 7);
        let (b, root_b) = generated_tree(40, 7);
        let names = |t: &NodeTree, r| {
            postorder(t, r)
                .into_iter()
                .map(|id| t.node(id).unwrap().name().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&a, root_a), names(&b, root_b));
    }
}
