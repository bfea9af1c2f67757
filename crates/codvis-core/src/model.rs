//! Core data structures for layout nodes

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::vector::Vec3;

/// Arena handle for a node inside a [`crate::NodeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct NodeId(pub u64);

impl From<NodeIndex> for NodeId {
    fn from(idx: NodeIndex) -> Self {
        NodeId(idx.index() as u64)
    }
}

impl From<NodeId> for NodeIndex {
    fn from(id: NodeId) -> Self {
        NodeIndex::new(id.0 as usize)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of code entity a node represents.
///
/// Serialized as a lowercase string; anything the importer emits that is not
/// one of the known kinds is kept verbatim in `Other`. Kinds compare by their
/// string form, so `Other("class")` equals `Class`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    Class,
    Variable,
    Function,
    Namespace,
    Other(String),
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Class => "class",
            NodeKind::Variable => "variable",
            NodeKind::Function => "function",
            NodeKind::Namespace => "namespace",
            NodeKind::Other(other) => other,
        }
    }
}

impl PartialEq for NodeKind {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for NodeKind {}

impl Hash for NodeKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl From<&str> for NodeKind {
    fn from(value: &str) -> Self {
        match value {
            "class" => NodeKind::Class,
            "variable" => NodeKind::Variable,
            "function" => NodeKind::Function,
            "namespace" => NodeKind::Namespace,
            other => NodeKind::Other(other.to_string()),
        }
    }
}

impl From<String> for NodeKind {
    fn from(value: String) -> Self {
        NodeKind::from(value.as_str())
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a node as seen by the importer and the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub name: String,
    pub kind: NodeKind,
}

/// Importer payload attached to a node.
///
/// `type_name` is the resolved type reference, e.g. the class a variable is
/// declared as. It drives alias resolution in
/// [`crate::NodeTree::child_by_name_and_kind`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub type_name: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ModelMetadata {
    pub fn with_type(type_name: impl Into<String>) -> Self {
        ModelMetadata {
            type_name: Some(type_name.into()),
            attributes: BTreeMap::new(),
        }
    }
}

/// Anything the force computation can treat as a particle.
pub trait LayoutNode {
    fn position(&self) -> Vec3;
    fn size(&self) -> f32;
    fn name(&self) -> &str;
    fn kind(&self) -> &NodeKind;
    /// Attraction toward the node at `scope_index` in the current scope, if linked.
    fn link_strength(&self, scope_index: usize) -> Option<f32>;
}

/// A single node: one entry of the hierarchical index and one particle of
/// the layout.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    position: Vec3,
    size: f32,
    metadata: NodeMetadata,
    model_metadata: Option<ModelMetadata>,
    pub(crate) children: Vec<NodeId>,
    links: BTreeMap<usize, f32>,
    pub(crate) index: usize,
    finalized_index: Option<usize>,
    drawable_index: Option<usize>,
}

impl GraphNode {
    pub fn new(position: Vec3, name: impl Into<String>, size: f32, kind: NodeKind) -> Self {
        GraphNode {
            position,
            size,
            metadata: NodeMetadata {
                name: name.into(),
                kind,
            },
            model_metadata: None,
            children: Vec::new(),
            links: BTreeMap::new(),
            index: 1,
            finalized_index: None,
            drawable_index: None,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn set_size(&mut self, size: f32) {
        self.size = size;
    }

    pub fn metadata(&self) -> &NodeMetadata {
        &self.metadata
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.metadata.name = name.into();
    }

    pub fn kind(&self) -> &NodeKind {
        &self.metadata.kind
    }

    pub fn set_kind(&mut self, kind: NodeKind) {
        self.metadata.kind = kind;
    }

    pub fn model_metadata(&self) -> Option<&ModelMetadata> {
        self.model_metadata.as_ref()
    }

    pub fn set_model_metadata(&mut self, metadata: ModelMetadata) {
        self.model_metadata = Some(metadata);
    }

    /// Ordered child handles. Only [`crate::NodeTree::add_child`] mutates these.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Subtree-size index: 1 plus the number of descendants.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Records or overwrites the attraction toward scope position `scope_index`.
    pub fn set_link(&mut self, scope_index: usize, strength: f32) {
        self.links.insert(scope_index, strength);
    }

    pub fn link(&self, scope_index: usize) -> Option<f32> {
        self.links.get(&scope_index).copied()
    }

    pub fn links(&self) -> &BTreeMap<usize, f32> {
        &self.links
    }

    pub fn finalized_index(&self) -> Option<usize> {
        self.finalized_index
    }

    pub fn set_finalized_index(&mut self, index: usize) {
        if let Some(previous) = self.finalized_index.replace(index) {
            tracing::debug!(
                "Finalized index of {} reassigned: {} -> {}",
                self.metadata.name,
                previous,
                index
            );
        }
    }

    pub fn drawable_index(&self) -> Option<usize> {
        self.drawable_index
    }

    pub fn set_drawable_index(&mut self, index: usize) {
        if let Some(previous) = self.drawable_index.replace(index) {
            tracing::debug!(
                "Drawable index of {} reassigned: {} -> {}",
                self.metadata.name,
                previous,
                index
            );
        }
    }

    /// Whether a query for `kind` accepts this node. A query for a class
    /// also accepts a variable, which may be an alias of a class.
    pub fn matches_kind(&self, kind: &NodeKind) -> bool {
        self.metadata.kind == *kind
            || (*kind == NodeKind::Class && self.metadata.kind == NodeKind::Variable)
    }
}

impl LayoutNode for GraphNode {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn size(&self) -> f32 {
        self.size
    }

    fn name(&self) -> &str {
        &self.metadata.name
    }

    fn kind(&self) -> &NodeKind {
        &self.metadata.kind
    }

    fn link_strength(&self, scope_index: usize) -> Option<f32> {
        self.link(scope_index)
    }
}
