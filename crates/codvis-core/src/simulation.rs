//! Two-phase simulation step: every force in a scope is computed against the
//! same frozen positions before any position is written.

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, TreeError};
use crate::force::LayoutParams;
use crate::model::NodeId;
use crate::tree::NodeTree;
use crate::vector::Vec3;

/// How a force turns into a displacement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    pub time_step: f32,
    /// Longest move a single node may make in one tick.
    pub max_displacement: f32,
}

impl Default for StepConfig {
    fn default() -> Self {
        StepConfig {
            time_step: 0.1,
            max_displacement: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub layout: LayoutParams,
    pub step: StepConfig,
    pub ticks: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            layout: LayoutParams::default(),
            step: StepConfig::default(),
            ticks: 200,
        }
    }
}

/// Summary of one step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepReport {
    pub moved: usize,
    pub max_displacement: f32,
}

impl StepReport {
    fn merge(&mut self, other: StepReport) {
        self.moved += other.moved;
        self.max_displacement = self.max_displacement.max(other.max_displacement);
    }
}

/// Advance every node of `scope` by one tick.
pub fn step_scope(
    tree: &mut NodeTree,
    scope: &[NodeId],
    config: &SimulationConfig,
) -> Result<StepReport, TreeError> {
    // Phase 1: read only.
    let mut displacements = Vec::with_capacity(scope.len());
    for &id in scope {
        let force = tree
            .total_force(id, scope, &config.layout)?
            .unwrap_or(Vec3::ZERO);
        displacements.push((force * config.step.time_step).clamp_length(config.step.max_displacement));
    }

    // Phase 2: commit.
    let mut report = StepReport::default();
    for (&id, displacement) in scope.iter().zip(displacements) {
        if !displacement.is_finite() {
            tracing::warn!("Skipping non-finite displacement for {}", id);
            continue;
        }
        let Some(node) = tree.node_mut(id) else {
            continue;
        };
        node.set_position(node.position() + displacement);

        let distance = displacement.length();
        if distance > 0.0 {
            report.moved += 1;
        }
        report.max_displacement = report.max_displacement.max(distance);
    }
    Ok(report)
}

/// Step every scope below `root`: the children of each node, parents first.
pub fn step_tree(
    tree: &mut NodeTree,
    root: NodeId,
    config: &SimulationConfig,
) -> Result<StepReport, TreeError> {
    if !tree.contains(root) {
        return Err(TreeError::UnknownNode(root));
    }

    let mut report = StepReport::default();
    for id in tree.preorder(root) {
        let scope = tree.children(id).to_vec();
        if scope.is_empty() {
            continue;
        }
        report.merge(step_scope(tree, &scope, config)?);
    }
    Ok(report)
}

/// Assign finalized indices in flattened order: a node's offset from
/// [`NodeTree::get_node`] becomes its finalized index.
pub fn assign_finalized_indices(tree: &mut NodeTree, root: NodeId) -> Result<usize, TreeError> {
    if !tree.contains(root) {
        return Err(TreeError::UnknownNode(root));
    }
    let mut order: Vec<NodeId> = tree.successors(root, 0).into_iter().map(|s| s.id).collect();
    order.push(root);

    for (offset, id) in order.iter().enumerate() {
        tree.set_finalized_index(*id, offset)?;
    }
    Ok(order.len())
}

/// Runs the layout for a fixed number of ticks.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self, LayoutError> {
        config.layout.validate()?;
        let step = config.step;
        if !step.time_step.is_finite() || step.time_step <= 0.0 {
            return Err(LayoutError::InvalidParams(format!(
                "time_step must be positive, got {}",
                step.time_step
            )));
        }
        if step.max_displacement.is_nan() || step.max_displacement <= 0.0 {
            return Err(LayoutError::InvalidParams(format!(
                "max_displacement must be positive, got {}",
                step.max_displacement
            )));
        }
        Ok(Simulation { config })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn tick(&self, tree: &mut NodeTree, root: NodeId) -> Result<StepReport, TreeError> {
        step_tree(tree, root, &self.config)
    }

    /// Run `ticks` steps and return the report of the last one.
    pub fn run(&self, tree: &mut NodeTree, root: NodeId, ticks: usize) -> Result<StepReport, TreeError> {
        let mut last = StepReport::default();
        for tick in 0..ticks {
            last = self.tick(tree, root)?;
            if tick % 50 == 0 {
                tracing::debug!(
                    "Tick {}: {} nodes moved, max displacement {:.4}",
                    tick,
                    last.moved,
                    last.max_displacement
                );
            }
        }
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GraphNode, NodeKind};

    fn scene() -> (NodeTree, NodeId, Vec<NodeId>) {
        let mut tree = NodeTree::new();
        let root = tree.insert(GraphNode::new(Vec3::ZERO, "root", 4.0, NodeKind::Namespace));
        let positions = [
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(-2.0, 1.0, 0.0),
            Vec3::new(0.0, -4.0, 2.0),
        ];
        let children = positions
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                tree.add_child_node(root, GraphNode::new(p, format!("n{i}"), 1.0, NodeKind::Class))
                    .unwrap()
            })
            .collect::<Vec<_>>();
        tree.link_nodes(children[0], children[1], 1.0).unwrap();
        (tree, root, children)
    }

    #[test]
    fn step_is_independent_of_scope_commit_order() {
        let config = SimulationConfig::default();
        let (mut tree, _root, children) = scene();

        let expected = children
            .iter()
            .map(|&id| {
                let force = tree.total_force(id, &children, &config.layout).unwrap().unwrap();
                tree.node(id).unwrap().position()
                    + (force * config.step.time_step).clamp_length(config.step.max_displacement)
            })
            .collect::<Vec<_>>();

        step_scope(&mut tree, &children, &config).unwrap();

        for (id, want) in children.iter().zip(expected) {
            let got = tree.node(*id).unwrap().position();
            assert!(got.distance(want) < 1e-5, "{id} moved to {got:?}, expected {want:?}");
        }
    }

    #[test]
    fn displacement_is_clamped() {
        let config = SimulationConfig {
            step: StepConfig {
                time_step: 100.0,
                max_displacement: 0.5,
            },
            ..SimulationConfig::default()
        };
        let (mut tree, _root, children) = scene();
        let report = step_scope(&mut tree, &children, &config).unwrap();
        assert_eq!(report.moved, 3);
        assert!(report.max_displacement <= 0.5 + 1e-5);
    }

    #[test]
    fn step_tree_leaves_root_in_place() {
        let (mut tree, root, _children) = scene();
        let sim = Simulation::new(SimulationConfig::default()).unwrap();
        sim.run(&mut tree, root, 10).unwrap();
        assert_eq!(tree.node(root).unwrap().position(), Vec3::ZERO);
    }

    #[test]
    fn finalized_indices_follow_flattened_order() {
        let (mut tree, root, _children) = scene();
        let count = assign_finalized_indices(&mut tree, root).unwrap();
        assert_eq!(count, 4);
        for offset in 0..count {
            let id = tree.get_node(root, offset).unwrap();
            assert_eq!(tree.node(id).unwrap().finalized_index(), Some(offset));
        }
    }

    #[test]
    fn rejects_invalid_step_config() {
        let config = SimulationConfig {
            step: StepConfig {
                time_step: 0.0,
                max_displacement: 1.0,
            },
            ..SimulationConfig::default()
        };
        assert!(Simulation::new(config).is_err());
    }
}
