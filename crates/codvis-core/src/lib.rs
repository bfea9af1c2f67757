//! Codvis Core: hierarchical node index and force-directed layout

pub mod error;
pub mod force;
pub mod model;
pub mod simulation;
pub mod tree;
pub mod vector;


#[cfg(test)]
pub mod test_utils;

pub use error::{LayoutError, TreeError};
pub use force::{LayoutParams, containment, gravity_force, pair_force, total_force};
pub use model::{GraphNode, LayoutNode, ModelMetadata, NodeId, NodeKind, NodeMetadata};
pub use simulation::{
    Simulation, SimulationConfig, StepConfig, StepReport, assign_finalized_indices, step_scope,
    step_tree,
};
pub use tree::{Containment, NodeTree, Successor};
pub use vector::Vec3;
