use std::sync::Arc;

use bevy::prelude::*;
use ndarray::{Array3, Zip};

use crate::{
    codec::{ActiveEncoding, TsdfEncoding},
    error::{Result, TsdfError},
    grid::VoxelGrid,
    sampler::sample_trilinear,
    types::{Point, SdfFunction, Value},
};

/// A dense TSDF volume of packed voxels in encoding `E`.
///
/// The grid covers integer coordinates `origin .. origin + dims` on each axis, so
/// negative coordinates are addressable by choosing a negative origin.
///
/// Values are stored as `values[[z, y, x]]` (relative to `origin`), wrapped in an
/// [`Arc`] so other tasks can hold the grid without copying it.
#[derive(Component)]
#[require(Transform)]
pub struct TsdfVolume<E: TsdfEncoding = ActiveEncoding> {
    /// Voxel count along X, Y and Z.
    dims: [usize; 3],
    /// Integer coordinate of the first voxel.
    origin: [i32; 3],
    /// World-space size of each voxel edge.
    pub voxel_size: Value,
    /// Packed voxels, indexed `[z, y, x]`.
    pub values: Arc<Array3<E::Storage>>,
}

impl<E: TsdfEncoding> Clone for TsdfVolume<E> {
    fn clone(&self) -> Self {
        Self {
            dims: self.dims,
            origin: self.origin,
            voxel_size: self.voxel_size,
            values: Arc::clone(&self.values),
        }
    }
}

impl<E: TsdfEncoding> TsdfVolume<E> {
    /// Creates a volume of `dims = [x, y, z]` voxels with every voxel set to the
    /// default packed value. Fails if any axis is empty.
    pub fn new(dims: [usize; 3]) -> Result<Self> {
        if dims.contains(&0) {
            return Err(TsdfError::EmptyVolume);
        }
        let [x, y, z] = dims;
        Ok(Self {
            dims,
            origin: [0; 3],
            voxel_size: 1.,
            values: Arc::new(Array3::default((z, y, x))),
        })
    }

    /// Wraps existing `[z, y, x]` data; dimensions are taken from its shape.
    ///
    /// Fails with [`TsdfError::EmptyVolume`] if any axis is empty.
    pub fn from_array(values: Array3<E::Storage>) -> Result<Self> {
        let (z, y, x) = values.dim();
        let mut volume = Self::new([x, y, z])?;
        volume.values = Arc::new(values);
        Ok(volume)
    }

    /// Places the first voxel at integer coordinate `origin`.
    pub fn with_origin(mut self, origin: [i32; 3]) -> Self {
        self.origin = origin;
        self
    }

    /// Sets the world-space size of each voxel edge.
    pub fn with_voxel_size(mut self, voxel_size: Value) -> Self {
        self.voxel_size = voxel_size;
        self
    }

    /// Replaces the voxel data with a previously saved [`Arc`].
    ///
    /// Returns [`TsdfError::ShapeMismatch`] if its dimensions differ from this volume's.
    pub fn with_values(mut self, values: Arc<Array3<E::Storage>>) -> Result<Self> {
        let (z, y, x) = values.dim();
        if [x, y, z] != self.dims {
            return Err(TsdfError::ShapeMismatch {
                expected: self.dims,
                found: [x, y, z],
            });
        }
        self.values = values;
        Ok(self)
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn origin(&self) -> [i32; 3] {
        self.origin
    }

    /// Encoding name, e.g. `"half2"`.
    pub fn encoding(&self) -> &'static str {
        E::NAME
    }

    /// Returns a mutable reference to the voxel data, cloning it first if shared.
    fn values_mut(&mut self) -> &mut Array3<E::Storage> {
        Arc::make_mut(&mut self.values)
    }

    #[inline]
    fn index(&self, x: i32, y: i32, z: i32) -> [usize; 3] {
        [
            (z - self.origin[2]) as usize,
            (y - self.origin[1]) as usize,
            (x - self.origin[0]) as usize,
        ]
    }

    /// World-space position of voxel `(x, y, z)`.
    #[inline]
    pub fn world_position(&self, x: i32, y: i32, z: i32) -> Point {
        voxel_position(x, y, z, self.voxel_size)
    }

    /// Unpacked `(distance, weight)` at `(x, y, z)`.
    pub fn unpack_at(&self, x: i32, y: i32, z: i32) -> (Value, Value) {
        E::unpack(self.read(x, y, z))
    }

    /// Packs and stores `(distance, weight)` at `(x, y, z)`.
    pub fn pack_at(&mut self, x: i32, y: i32, z: i32, distance: Value, weight: Value) {
        self.write(x, y, z, E::pack(distance, weight));
    }

    /// Interpolated distance at a fractional grid coordinate.
    ///
    /// All 8 surrounding voxels must lie inside the volume.
    pub fn sample_trilinear(&self, x: Value, y: Value, z: Value) -> Value {
        sample_trilinear::<E, Self>(self, x, y, z)
    }

    /// Calls `f(x, y, z, &mut packed)` for every voxel, with grid coordinates.
    pub fn for_each_voxel<F>(&mut self, mut f: F)
    where
        F: FnMut(i32, i32, i32, &mut E::Storage),
    {
        let [ox, oy, oz] = self.origin;
        self.values_mut()
            .indexed_iter_mut()
            .for_each(|((z, y, x), v)| f(ox + x as i32, oy + y as i32, oz + z as i32, v));
    }

    /// Fills the volume by evaluating `function` at every voxel's world position
    /// and packing the returned `(distance, weight)`.
    ///
    /// Work is split across threads with Rayon.
    pub fn fill(&mut self, function: &SdfFunction) {
        let [ox, oy, oz] = self.origin;
        let voxel_size = self.voxel_size;
        Zip::indexed(self.values_mut()).par_for_each(|(z, y, x), v| {
            let p = voxel_position(ox + x as i32, oy + y as i32, oz + z as i32, voxel_size);
            let (distance, weight) = function(p);
            *v = E::pack(distance, weight);
        });
    }
}

#[inline]
fn voxel_position(x: i32, y: i32, z: i32, voxel_size: Value) -> Point {
    Point::new(x as Value, y as Value, z as Value) * voxel_size
}

impl<E: TsdfEncoding> VoxelGrid<E::Storage> for TsdfVolume<E> {
    #[inline]
    fn read(&self, x: i32, y: i32, z: i32) -> E::Storage {
        self.values[self.index(x, y, z)]
    }

    #[inline]
    fn write(&mut self, x: i32, y: i32, z: i32, value: E::Storage) {
        let i = self.index(x, y, z);
        self.values_mut()[i] = value;
    }
}
