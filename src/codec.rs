//! Packed `(distance, weight)` voxel storage.
//!
//! Three interchangeable layouts implement [`TsdfEncoding`]. A volume is generic
//! over one of them, so the layout is fixed at compile time and pack/unpack
//! never branch on it. [`ActiveEncoding`] is the crate-wide default, chosen by
//! cargo feature:
//!
//! | feature      | encoding            | storage    | distance range |
//! |--------------|---------------------|------------|----------------|
//! | `float_tsdf` | [`WideTsdf`]        | `[f32; 2]` | any            |
//! | `short_tsdf` | [`NormalizedTsdf`]  | `[i16; 2]` | `[-1, 1]`      |
//! | *(none)*     | [`HalfTsdf`]        | `u32`      | about ±65504   |

use half::f16;

use crate::types::Value;

/// A compile-time voxel storage layout.
pub trait TsdfEncoding: Send + Sync + 'static {
    /// One packed voxel.
    type Storage: Copy + Default + PartialEq + std::fmt::Debug + Send + Sync + 'static;

    /// Human-readable layout name.
    const NAME: &'static str;

    /// Scale applied to the distance channel when packing.
    const DIVISOR: Value;

    /// Whether hardware-style filtered reads of packed data yield the
    /// interpolated distance directly.
    const HARDWARE_FILTERABLE: bool;

    fn pack(distance: Value, weight: Value) -> Self::Storage;

    /// Returns `(distance, weight)`.
    fn unpack(storage: Self::Storage) -> (Value, Value);

    /// Distance channel only.
    #[inline]
    fn unpack_distance(storage: Self::Storage) -> Value {
        Self::unpack(storage).0
    }
}

/// Two full-precision floats. Lossless, no range restriction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WideTsdf;

impl TsdfEncoding for WideTsdf {
    type Storage = [f32; 2];

    const NAME: &'static str = "float2";
    const DIVISOR: Value = 1.0;
    const HARDWARE_FILTERABLE: bool = true;

    #[inline]
    fn pack(distance: Value, weight: Value) -> Self::Storage {
        [distance, weight]
    }

    #[inline]
    fn unpack(storage: Self::Storage) -> (Value, Value) {
        (storage[0], storage[1])
    }
}

/// Distance normalized to `i16` over `[-1, 1]`, weight truncated to `i16`.
///
/// Distances outside `[-1, 1]` and weights outside the `i16` range are not
/// reported; they saturate. Callers clamp before packing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizedTsdf;

/// `1 / 32767`, as used to widen the distance channel.
pub const TSDF_INV_DIVISOR: Value = 3.051_851e-5;

impl TsdfEncoding for NormalizedTsdf {
    type Storage = [i16; 2];

    const NAME: &'static str = "short2";
    const DIVISOR: Value = 0x7fff as Value;
    const HARDWARE_FILTERABLE: bool = false;

    #[inline]
    fn pack(distance: Value, weight: Value) -> Self::Storage {
        [(distance * Self::DIVISOR).round() as i16, weight as i16]
    }

    #[inline]
    fn unpack(storage: Self::Storage) -> (Value, Value) {
        (storage[0] as Value * TSDF_INV_DIVISOR, storage[1] as Value)
    }
}

/// Two IEEE-754 half floats in one `u32`: distance in the low 16 bits, weight in the high 16.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HalfTsdf;

impl TsdfEncoding for HalfTsdf {
    type Storage = u32;

    const NAME: &'static str = "half2";
    const DIVISOR: Value = 1.0;
    const HARDWARE_FILTERABLE: bool = false;

    #[inline]
    fn pack(distance: Value, weight: Value) -> Self::Storage {
        let lo = f16::from_f32(distance).to_bits() as u32;
        let hi = f16::from_f32(weight).to_bits() as u32;
        (hi << 16) | lo
    }

    #[inline]
    fn unpack(storage: Self::Storage) -> (Value, Value) {
        let lo = f16::from_bits(storage as u16);
        let hi = f16::from_bits((storage >> 16) as u16);
        (lo.to_f32(), hi.to_f32())
    }
}

#[cfg(feature = "float_tsdf")]
pub type ActiveEncoding = WideTsdf;

#[cfg(all(feature = "short_tsdf", not(feature = "float_tsdf")))]
pub type ActiveEncoding = NormalizedTsdf;

#[cfg(not(any(feature = "float_tsdf", feature = "short_tsdf")))]
pub type ActiveEncoding = HalfTsdf;

/// Packed voxel type of [`ActiveEncoding`].
pub type TsdfData = <ActiveEncoding as TsdfEncoding>::Storage;
