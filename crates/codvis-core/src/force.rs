//! Per-node force computation for the force-directed layout
//!
//! Linked pairs attract along a logarithmic spring, unlinked pairs repel by
//! an inverse-square law, and every node is pulled toward a gravity center by
//! a force that grows without bound near the scope's boundary radius.

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, TreeError};
use crate::model::{LayoutNode, NodeId};
use crate::tree::NodeTree;
use crate::vector::Vec3;

/// Smallest distance used between two nodes, so coincident nodes never
/// divide by zero.
pub const MIN_SEPARATION: f32 = 0.1;

/// How far inside `max_size` an escaped node's gravity is clamped to.
pub const BOUNDARY_MARGIN: f32 = 0.1;

/// Spacing and containment parameters shared by every node of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    /// Spacing floor for linked pairs, added to both node sizes.
    pub min_distance: f32,
    /// Repulsion strength for unlinked pairs, added to both node sizes.
    pub max_distance: f32,
    /// Bounding radius of the scope around `gravity_center`.
    pub max_size: f32,
    pub gravity_force: f32,
    pub gravity_center: Vec3,
}

impl Default for LayoutParams {
    fn default() -> Self {
        LayoutParams {
            min_distance: 2.0,
            max_distance: 20.0,
            max_size: 100.0,
            gravity_force: 0.7,
            gravity_center: Vec3::ZERO,
        }
    }
}

impl LayoutParams {
    pub fn validate(&self) -> Result<(), LayoutError> {
        let scalars = [
            ("min_distance", self.min_distance),
            ("max_distance", self.max_distance),
            ("max_size", self.max_size),
            ("gravity_force", self.gravity_force),
        ];
        for (name, value) in scalars {
            if !value.is_finite() {
                return Err(LayoutError::InvalidParams(format!("{name} must be finite")));
            }
        }
        if !self.gravity_center.is_finite() {
            return Err(LayoutError::InvalidParams(
                "gravity_center must be finite".to_string(),
            ));
        }
        if self.min_distance <= 0.0 {
            return Err(LayoutError::InvalidParams(format!(
                "min_distance must be positive, got {}",
                self.min_distance
            )));
        }
        if self.max_distance < 0.0 {
            return Err(LayoutError::InvalidParams(format!(
                "max_distance must not be negative, got {}",
                self.max_distance
            )));
        }
        if self.max_size <= BOUNDARY_MARGIN {
            return Err(LayoutError::InvalidParams(format!(
                "max_size must exceed {BOUNDARY_MARGIN}, got {}",
                self.max_size
            )));
        }
        Ok(())
    }
}

/// Force exerted on `node` by `other`. `link` is the attraction strength
/// from `node` to `other`, if they are linked.
pub fn pair_force<N: LayoutNode + ?Sized>(
    node: &N,
    other: &N,
    link: Option<f32>,
    params: &LayoutParams,
) -> Vec3 {
    let diff = other.position() - node.position();
    let distance = diff.length().max(MIN_SEPARATION);
    let direction = diff.normalize();

    let scalar = match link {
        // Logarithmic spring; turns negative (pushes apart) below the spacing floor.
        Some(strength) => {
            let spacing = params.min_distance + node.size() + other.size();
            strength * (distance / spacing).log10()
        }
        None => -(params.max_distance + node.size() + other.size()) / (distance * distance),
    };

    direction * scalar
}

/// Gravity vector toward the center, clamped to `max_size - BOUNDARY_MARGIN`
/// when the node sits on or outside the boundary.
pub fn containment(position: Vec3, params: &LayoutParams) -> Vec3 {
    let gravity = params.gravity_center - position;
    if gravity.length() >= params.max_size {
        gravity.normalize() * (params.max_size - BOUNDARY_MARGIN)
    } else {
        gravity
    }
}

/// Pull toward the gravity center. Weak near the center and diverging as
/// the node approaches `max_size`.
pub fn gravity_force(position: Vec3, params: &LayoutParams) -> Vec3 {
    let gravity = containment(position, params);
    let distance = gravity.length();
    let magnitude = ((distance + params.max_size).log10()
        - (params.max_size - distance).log10())
        * params.gravity_force;

    if !magnitude.is_finite() {
        tracing::warn!(
            "Dropping non-finite gravity at distance {} (max_size {})",
            distance,
            params.max_size
        );
        return Vec3::ZERO;
    }

    gravity.normalize() * magnitude
}

/// Net force on `node` for one simulation step.
///
/// `scope` holds every node sharing the node's level, in the order its link
/// keys refer to. `self_slot` is the node's own position in `scope`, which
/// is skipped. Returns `None` for an empty scope.
pub fn total_force<N: LayoutNode + ?Sized>(
    node: &N,
    self_slot: Option<usize>,
    scope: &[&N],
    params: &LayoutParams,
) -> Option<Vec3> {
    if scope.is_empty() {
        return None;
    }

    let mut force = Vec3::ZERO;
    for (slot, other) in scope.iter().enumerate() {
        if Some(slot) == self_slot {
            continue;
        }
        force += pair_force(node, *other, node.link_strength(slot), params);
    }

    Some(force + gravity_force(node.position(), params))
}

impl NodeTree {
    /// Net force on `id` given the scope `scope`.
    ///
    /// Link keys of `id` are interpreted as positions in `scope`; if `id`
    /// itself appears in `scope` it is excluded from the pairwise sum.
    pub fn total_force(
        &self,
        id: NodeId,
        scope: &[NodeId],
        params: &LayoutParams,
    ) -> Result<Option<Vec3>, TreeError> {
        let node = self.node(id).ok_or(TreeError::UnknownNode(id))?;
        let nodes = scope
            .iter()
            .map(|&member| self.node(member).ok_or(TreeError::UnknownNode(member)))
            .collect::<Result<Vec<_>, _>>()?;
        let self_slot = scope.iter().position(|&member| member == id);

        Ok(total_force(node, self_slot, &nodes, params))
    }
}
