use crate::types::Value;

// Lower cell index of `s`: truncate, then step down once if truncation went past `s`.
// Equivalent to `s.floor() as i32` for in-range values, but branch-free.
#[inline]
pub fn floor_index(s: Value) -> i32 {
    let t = s as i32;
    t - ((t as Value > s) as i32)
}

// Trilinear blend of 8 corner values given the low-corner fractions `(a0, b0, c0)`.
//
// `corners[(dx << 2) | (dy << 1) | dz]` is the value at `(x0 + dx, y0 + dy, z0 + dz)`.
// Blends along z, then y, then x; a corner's weight uses `1 - frac` on axes where it
// sits at the low index and `frac` where it sits at the high index.
#[inline]
pub fn trilinear(corners: &[Value; 8], a0: Value, b0: Value, c0: Value) -> Value {
    let a1 = 1.0 - a0;
    let b1 = 1.0 - b0;
    let c1 = 1.0 - c0;

    ((corners[0b000] * c1 + corners[0b001] * c0) * b1
        + (corners[0b010] * c1 + corners[0b011] * c0) * b0)
        * a1
        + ((corners[0b100] * c1 + corners[0b101] * c0) * b1
            + (corners[0b110] * c1 + corners[0b111] * c0) * b0)
            * a0
}

// Offsets of the 8 cell corners, in the order `trilinear` expects.
pub const CORNER_OFFSETS: [[i32; 3]; 8] = [
    [0, 0, 0],
    [0, 0, 1],
    [0, 1, 0],
    [0, 1, 1],
    [1, 0, 0],
    [1, 0, 1],
    [1, 1, 0],
    [1, 1, 1],
];
