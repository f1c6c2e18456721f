//! Pinhole camera intrinsics relating pixel + depth samples to camera space.
//!
//! Camera space is right-handed with the camera looking down **-Z**. Image
//! `v` grows downwards while camera `y` grows upwards:
//!
//! ```text
//!   (u, v, d)  ──project──▶  (x, y, z) = ( d·(u-cx)/fx, -d·(v-cy)/fy, -d )
//!   (x, y, z)  ─unproject─▶  (u, v, d) = ( x·fx/d + cx, -y·fy/d + cy, -z )
//! ```

use bevy::prelude::Resource;

use crate::{
    error::{Result, TsdfError},
    types::{Value, Vector},
};

pub const KINECT_WIDTH: u32 = 640;
pub const KINECT_HEIGHT: u32 = 480;
pub const KINECT_DEPTH_FOCAL_LEN: Value = 571.26;
pub const KINECT_DEPTH_H_FOV: Value = 58.5;
pub const KINECT_DEPTH_V_FOV: Value = 45.6;
pub const KINECT_IMAGE_H_FOV: Value = 62.0;
pub const KINECT_IMAGE_V_FOV: Value = 48.6;
/// Closest depth (metres) the sensor reports reliably.
pub const KINECT_NEAREST_METER: Value = 0.3;

/// Camera intrinsics with cached inverse focal lengths.
///
/// Immutable once built; derive per-level copies with [`at_level`](Intrinsics::at_level).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    fx: Value,
    fy: Value,
    cx: Value,
    cy: Value,
    fx_inv: Value,
    fy_inv: Value,
}

impl Default for Intrinsics {
    fn default() -> Self {
        Self::kinect()
    }
}

impl Intrinsics {
    /// Builds intrinsics from focal lengths and principal point, all in pixels.
    ///
    /// No validation is done; see [`try_new`](Intrinsics::try_new).
    pub fn new(fx: Value, fy: Value, cx: Value, cy: Value) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            fx_inv: 1.0 / fx,
            fy_inv: 1.0 / fy,
        }
    }

    /// Like [`new`](Intrinsics::new), but rejects zero or non-finite focal lengths.
    pub fn try_new(fx: Value, fy: Value, cx: Value, cy: Value) -> Result<Self> {
        let valid = |f: Value| f.is_finite() && f != 0.0;
        if !valid(fx) || !valid(fy) {
            return Err(TsdfError::InvalidFocalLength);
        }
        Ok(Self::new(fx, fy, cx, cy))
    }

    /// Default depth camera: 640×480 with the principal point at the image centre.
    pub fn kinect() -> Self {
        Self::new(
            KINECT_DEPTH_FOCAL_LEN,
            KINECT_DEPTH_FOCAL_LEN,
            KINECT_WIDTH as Value / 2.0,
            KINECT_HEIGHT as Value / 2.0,
        )
    }

    pub fn fx(&self) -> Value {
        self.fx
    }

    pub fn fy(&self) -> Value {
        self.fy
    }

    pub fn cx(&self) -> Value {
        self.cx
    }

    pub fn cy(&self) -> Value {
        self.cy
    }

    pub fn fx_inv(&self) -> Value {
        self.fx_inv
    }

    pub fn fy_inv(&self) -> Value {
        self.fy_inv
    }

    /// Returns intrinsics for pyramid level `level`: every parameter divided by `2^level`.
    ///
    /// Level `0` yields an equal value.
    pub fn at_level(&self, level: u32) -> Self {
        let div = (2.0 as Value).powi(i32::try_from(level).unwrap_or(i32::MAX));
        Self::new(self.fx / div, self.fy / div, self.cx / div, self.cy / div)
    }

    /// Maps pixel `(u, v)` at depth `d` to a camera-space point.
    #[inline]
    pub fn project(&self, u: Value, v: Value, d: Value) -> (Value, Value, Value) {
        let x = d * (u - self.cx) * self.fx_inv;
        let y = -d * (v - self.cy) * self.fy_inv;
        let z = -d;
        (x, y, z)
    }

    /// Maps a camera-space point back to pixel `(u, v)` and depth `d`.
    ///
    /// `z` must be non-zero; the division is not guarded.
    #[inline]
    pub fn unproject(&self, x: Value, y: Value, z: Value) -> (Value, Value, Value) {
        let d = -z;
        let u = x * self.fx / d + self.cx;
        let v = -y * self.fy / d + self.cy;
        (u, v, d)
    }

    /// [`project`](Intrinsics::project) taking and returning `(u, v, d)` / `(x, y, z)` vectors.
    #[inline]
    pub fn project_vec(&self, uvd: Vector) -> Vector {
        let (x, y, z) = self.project(uvd.x, uvd.y, uvd.z);
        Vector::new(x, y, z)
    }

    /// [`unproject`](Intrinsics::unproject) taking and returning vectors.
    #[inline]
    pub fn unproject_vec(&self, xyz: Vector) -> Vector {
        let (u, v, d) = self.unproject(xyz.x, xyz.y, xyz.z);
        Vector::new(u, v, d)
    }
}

/// Intrinsics precomputed for each level of a resolution pyramid.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct IntrinsicsPyramid {
    levels: Vec<Intrinsics>,
}

impl IntrinsicsPyramid {
    /// Builds levels `0..num_levels` from `base`. At least one level is always kept.
    pub fn new(base: Intrinsics, num_levels: u32) -> Self {
        let levels = (0..num_levels.max(1)).map(|l| base.at_level(l)).collect();
        Self { levels }
    }

    /// Intrinsics for `level`, or `None` past the coarsest level.
    pub fn level(&self, level: usize) -> Option<&Intrinsics> {
        self.levels.get(level)
    }

    pub fn base(&self) -> &Intrinsics {
        &self.levels[0]
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Intrinsics> {
        self.levels.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn project_matches_pinhole_formula() {
        let intr = Intrinsics::new(500.0, 400.0, 320.0, 240.0);
        let (x, y, z) = intr.project(420.0, 140.0, 2.0);

        // x = 2 * 100 / 500, y = -2 * -100 / 400, z = -2
        assert_relative_eq!(x, 0.4, epsilon = 1e-6);
        assert_relative_eq!(y, 0.5, epsilon = 1e-6);
        assert_eq!(z, -2.0);
    }

    #[test]
    fn unproject_inverts_project() {
        let intr = Intrinsics::new(525.0, 520.0, 319.5, 239.5);
        for &(u, v, d) in &[(0.0, 0.0, 0.5), (100.25, 400.75, 1.3), (639.0, 479.0, 4.0), (12.0, 7.0, -1.0)] {
            let (x, y, z) = intr.project(u, v, d);
            let (u2, v2, d2) = intr.unproject(x, y, z);
            assert_relative_eq!(u2, u, epsilon = 1e-3);
            assert_relative_eq!(v2, v, epsilon = 1e-3);
            assert_relative_eq!(d2, d, epsilon = 1e-6);
        }
    }

    #[test]
    fn vector_overloads_agree_with_scalar_forms() {
        let intr = Intrinsics::kinect();
        let uvd = Vector::new(200.0, 300.0, 1.5);
        let xyz = intr.project_vec(uvd);
        let (x, y, z) = intr.project(200.0, 300.0, 1.5);
        assert_eq!(xyz, Vector::new(x, y, z));
        assert_relative_eq!(intr.unproject_vec(xyz), uvd, epsilon = 1e-3);
    }

    #[test]
    fn level_one_halves_everything() {
        let intr = Intrinsics::new(500.0, 500.0, 320.0, 240.0).at_level(1);
        assert_eq!(intr.fx(), 250.0);
        assert_eq!(intr.fy(), 250.0);
        assert_eq!(intr.cx(), 160.0);
        assert_eq!(intr.cy(), 120.0);
        assert_eq!(intr.fx_inv(), 1.0 / 250.0);
    }

    #[test]
    fn deep_levels_do_not_overflow() {
        let intr = Intrinsics::new(500.0, 500.0, 320.0, 240.0);
        assert_eq!(intr.at_level(10).fx(), 500.0 / 1024.0);
        let deep = intr.at_level(40);
        assert_eq!(deep.fx(), 500.0 / (1u64 << 40) as Value);
        assert!(deep.fx() > 0.0 && deep.fx_inv().is_finite());
    }

    #[test]
    fn level_zero_is_equivalent() {
        let intr = Intrinsics::new(571.26, 571.26, 320.0, 240.0);
        assert_eq!(intr.at_level(0), intr);
    }

    #[test]
    fn try_new_rejects_bad_focal_lengths() {
        assert_eq!(Intrinsics::try_new(0.0, 1.0, 0.0, 0.0), Err(TsdfError::InvalidFocalLength));
        assert_eq!(
            Intrinsics::try_new(1.0, Value::NAN, 0.0, 0.0),
            Err(TsdfError::InvalidFocalLength)
        );
        assert!(Intrinsics::try_new(1.0, 1.0, 0.0, 0.0).is_ok());
    }

    #[test]
    fn pyramid_levels_are_successive_halvings() {
        let pyramid = IntrinsicsPyramid::new(Intrinsics::new(500.0, 500.0, 320.0, 240.0), 3);
        assert_eq!(pyramid.len(), 3);
        assert_eq!(pyramid.level(2).map(|i| i.fx()), Some(125.0));
        assert!(pyramid.level(3).is_none());
        assert_eq!(IntrinsicsPyramid::new(Intrinsics::kinect(), 0).len(), 1);
    }
}
