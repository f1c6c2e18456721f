//! Warp nodes: the control points of a non-rigid deformation field.
//!
//! Each node stores its rigid motion as a rotation vector `r` (axis × angle, the
//! log map of the rotation) plus a translation `t`, which is what the pose
//! optimizer updates. Skinning blends dual quaternions instead, so nodes are
//! converted every frame.
//!
//! ```text
//!  r = 0           →  identity rotation (exact branch, no axis is formed)
//!  r ≠ 0           →  axis = r / |r|,  angle = |r|
//!  back from dq    →  r = axis · angle, angle ∈ [0, π]
//! ```
//!
//! Angles above `π` come back as the equivalent rotation about the flipped axis,
//! e.g. `r = (0, 0, 1.9π)` returns `(0, 0, -0.1π)`; this wrap is left as is.

use bevy::prelude::*;
use nalgebra::{DualQuaternion, Quaternion, Translation3, Unit, UnitDualQuaternion, UnitQuaternion};
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

use crate::types::{Point, Value, Vector};

/// Rigid transform of one deformation-field node in log-map form.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WarpNode {
    /// Rotation vector: unit axis scaled by the angle in radians.
    pub r: Vector,
    /// Translation.
    pub t: Vector,
}

impl WarpNode {
    pub fn new(r: Vector, t: Vector) -> Self {
        Self { r, t }
    }

    pub fn identity() -> Self {
        Self::default()
    }

    /// Converts to a unit dual quaternion (rotate by `r`, then translate by `t`).
    pub fn to_dual_quaternion(&self) -> UnitDualQuaternion<Value> {
        let theta = self.r.norm();
        let rotation = if theta == 0.0 {
            UnitQuaternion::identity()
        } else {
            let axis = Unit::new_unchecked(self.r / theta);
            UnitQuaternion::from_axis_angle(&axis, theta)
        };
        UnitDualQuaternion::from_parts(Translation3::from(self.t), rotation)
    }

    /// Recovers `(r, t)` from a unit dual quaternion.
    ///
    /// An identity rotation yields `r = 0`.
    pub fn from_dual_quaternion(dq: &UnitDualQuaternion<Value>) -> Self {
        let r = dq
            .rotation()
            .axis_angle()
            .map(|(axis, angle)| axis.into_inner() * angle)
            .unwrap_or_else(Vector::zeros);
        Self {
            r,
            t: dq.translation().vector,
        }
    }

    /// Applies this node's transform to `p`.
    pub fn transform_point(&self, p: &Point) -> Point {
        self.to_dual_quaternion().transform_point(p)
    }
}

impl From<WarpNode> for UnitDualQuaternion<Value> {
    fn from(node: WarpNode) -> Self {
        node.to_dual_quaternion()
    }
}

impl From<UnitDualQuaternion<Value>> for WarpNode {
    fn from(dq: UnitDualQuaternion<Value>) -> Self {
        WarpNode::from_dual_quaternion(&dq)
    }
}

/// A set of warp nodes together with their cached dual quaternions.
///
/// Edit [`nodes`](WarpField::nodes) freely; the cache is rebuilt by
/// [`refresh`](WarpField::refresh), which [`TsdfPlugin`](crate::plugin::TsdfPlugin)
/// calls for every changed field each frame.
#[derive(Component, Debug, Clone, Default)]
pub struct WarpField {
    pub nodes: Vec<WarpNode>,
    dual_quats: Vec<UnitDualQuaternion<Value>>,
}

impl WarpField {
    /// Creates a field and fills its dual-quaternion cache.
    pub fn new(nodes: Vec<WarpNode>) -> Self {
        let mut field = Self {
            nodes,
            dual_quats: Vec::new(),
        };
        field.refresh();
        field
    }

    /// Recomputes every node's dual quaternion in parallel.
    pub fn refresh(&mut self) {
        self.dual_quats = self
            .nodes
            .par_iter()
            .with_min_len(256)
            .map(WarpNode::to_dual_quaternion)
            .collect();
    }

    /// Cached dual quaternions, one per node as of the last [`refresh`](WarpField::refresh).
    pub fn dual_quats(&self) -> &[UnitDualQuaternion<Value>] {
        &self.dual_quats
    }

    /// Dual-quaternion linear blend of `(node index, weight)` pairs.
    ///
    /// Each quaternion is flipped onto the hemisphere of the first before summing so
    /// antipodal representations of the same rotation don't cancel. Returns `None`
    /// for an empty or zero-weight blend. Indices must be below the cached node count.
    pub fn blend(&self, weights: &[(usize, Value)]) -> Option<UnitDualQuaternion<Value>> {
        let &(first, _) = weights.first()?;
        let pivot = self.dual_quats[first].real;

        let mut real = Quaternion::new(0.0, 0.0, 0.0, 0.0);
        let mut dual = Quaternion::new(0.0, 0.0, 0.0, 0.0);
        for &(i, w) in weights {
            let dq = &self.dual_quats[i];
            let w = if dq.real.dot(&pivot) < 0.0 { -w } else { w };
            real += dq.real * w;
            dual += dq.dual * w;
        }

        UnitDualQuaternion::try_new(DualQuaternion::from_real_and_dual(real, dual), 1.0e-12)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn zero_rotation_round_trip() {
        let node = WarpNode::new(Vector::zeros(), Vector::new(1.0, 2.0, 3.0));
        let dq = node.to_dual_quaternion();
        assert_eq!(*dq.rotation().quaternion(), *UnitQuaternion::<Value>::identity().quaternion());

        let back = WarpNode::from_dual_quaternion(&dq);
        assert_eq!(back.r, Vector::zeros());
        assert_relative_eq!(back.t, node.t, epsilon = 1e-6);
    }

    #[test]
    fn quarter_turn_round_trip() {
        let node = WarpNode::new(Vector::new(0.0, 0.0, FRAC_PI_2), Vector::zeros());
        let back: WarpNode = node.to_dual_quaternion().into();
        assert_relative_eq!(back.r, node.r, epsilon = 1e-5);
        assert_relative_eq!(back.t, node.t, epsilon = 1e-6);
    }

    #[test]
    fn general_round_trip() {
        let node = WarpNode::new(Vector::new(0.3, -1.1, 0.7), Vector::new(-4.0, 0.5, 2.25));
        let back = WarpNode::from_dual_quaternion(&node.to_dual_quaternion());
        assert_relative_eq!(back.r, node.r, epsilon = 1e-5);
        assert_relative_eq!(back.t, node.t, epsilon = 1e-5);
    }

    #[test]
    fn angles_past_pi_wrap_to_flipped_axis() {
        let node = WarpNode::new(Vector::new(0.0, 0.0, 1.9 * PI), Vector::zeros());
        let back = WarpNode::from_dual_quaternion(&node.to_dual_quaternion());
        assert_relative_eq!(back.r, Vector::new(0.0, 0.0, -0.1 * PI), epsilon = 1e-4);
    }

    #[test]
    fn transform_rotates_then_translates() {
        let node = WarpNode::new(Vector::new(0.0, 0.0, FRAC_PI_2), Vector::new(1.0, 0.0, 0.0));
        let p = node.transform_point(&Point::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point::new(1.0, 1.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn refresh_tracks_node_edits() {
        let mut field = WarpField::new(vec![WarpNode::identity(); 3]);
        assert_eq!(field.dual_quats().len(), 3);

        field.nodes[1].t = Vector::new(0.0, 5.0, 0.0);
        field.refresh();
        assert_relative_eq!(field.dual_quats()[1].translation().vector, Vector::new(0.0, 5.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn blend_of_translations_is_weighted_average() {
        let field = WarpField::new(vec![
            WarpNode::new(Vector::zeros(), Vector::new(2.0, 0.0, 0.0)),
            WarpNode::new(Vector::zeros(), Vector::new(0.0, 4.0, 0.0)),
        ]);
        let dq = field.blend(&[(0, 0.5), (1, 0.5)]).unwrap();
        assert_relative_eq!(dq.translation().vector, Vector::new(1.0, 2.0, 0.0), epsilon = 1e-5);

        assert!(field.blend(&[]).is_none());
        assert!(field.blend(&[(0, 0.0)]).is_none());
    }
}
