//! Storage seam between the sampler and wherever voxels actually live
//! (a CPU array, a GPU surface mirror, a test fixture).

/// Random access to a 3D grid of packed voxels `S`, addressed by signed integer coordinate.
///
/// Implementations need not bounds-check; out-of-range access is a caller error and may panic.
/// The sampler only reads in-range voxels for coordinates in `[min, max]` on every axis.
pub trait VoxelGrid<S: Copy> {
    fn read(&self, x: i32, y: i32, z: i32) -> S;

    fn write(&mut self, x: i32, y: i32, z: i32, value: S);

    /// Hardware-style interpolated read at a fractional coordinate, if the backend has one.
    ///
    /// Only meaningful for encodings where blending packed values blends the distances
    /// (see [`TsdfEncoding::HARDWARE_FILTERABLE`](crate::codec::TsdfEncoding::HARDWARE_FILTERABLE)).
    fn filtered_read(&self, _x: f32, _y: f32, _z: f32) -> Option<S> {
        None
    }
}
