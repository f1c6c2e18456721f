use crate::{
    codec::TsdfEncoding,
    grid::VoxelGrid,
    interp::{CORNER_OFFSETS, floor_index, trilinear},
    types::Value,
};

/// Trilinearly interpolates the distance channel at a fractional grid coordinate.
///
/// The lower cell corner is the true floor of each coordinate, so `x = -0.5` blends
/// voxels `-1` and `0`. All 8 corners of that cell must be readable, except that
/// upper corners on an axis with an integer coordinate are never read.
///
/// When `E` is [hardware filterable](TsdfEncoding::HARDWARE_FILTERABLE) and `grid`
/// offers a [`filtered_read`](VoxelGrid::filtered_read), that read is used instead.
///
/// ```text
/// Per sample:
/// 1. floor_index (×3)   →  lower corner (x0, y0, z0)
/// 2. grid.read (×8)     →  packed corner voxels
/// 3. E::unpack_distance →  corner distances
/// 4. trilinear          →  blended distance
/// ```
#[inline]
pub fn sample_trilinear<E, G>(grid: &G, x: Value, y: Value, z: Value) -> Value
where
    E: TsdfEncoding,
    G: VoxelGrid<E::Storage> + ?Sized,
{
    if E::HARDWARE_FILTERABLE {
        if let Some(packed) = grid.filtered_read(x, y, z) {
            return E::unpack_distance(packed);
        }
    }
    sample_trilinear_manual::<E, G>(grid, x, y, z)
}

/// [`sample_trilinear`] without the filtered-read shortcut.
#[inline]
pub fn sample_trilinear_manual<E, G>(grid: &G, x: Value, y: Value, z: Value) -> Value
where
    E: TsdfEncoding,
    G: VoxelGrid<E::Storage> + ?Sized,
{
    let x0 = floor_index(x);
    let y0 = floor_index(y);
    let z0 = floor_index(z);
    let a0 = x - x0 as Value;
    let b0 = y - y0 as Value;
    let c0 = z - z0 as Value;

    // An upper corner with zero weight is read from the lower index instead, so
    // samples on the grid's last voxel stay in bounds.
    let (sx, sy, sz) = ((a0 > 0.0) as i32, (b0 > 0.0) as i32, (c0 > 0.0) as i32);

    let corners = CORNER_OFFSETS.map(|[dx, dy, dz]| {
        E::unpack_distance(grid.read(x0 + dx * sx, y0 + dy * sy, z0 + dz * sz))
    });

    trilinear(&corners, a0, b0, c0)
}
