use nalgebra::{Point3, Vector3};

/// Scalar value used for distances, weights and camera-space coordinates.
pub type Value = f32;

/// A 3D point with [`Value`] components.
pub type Point = Point3<Value>;

/// A 3D vector with [`Value`] components.
pub type Vector = Vector3<Value>;

/// A TSDF producer: maps a world-space [`Point`] to a `(distance, weight)` pair.
///
/// Used by [`TsdfVolume::fill`](crate::volume::TsdfVolume::fill) to seed a volume.
pub type SdfFunction = dyn Fn(Point) -> (Value, Value) + Sync;
