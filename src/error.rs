use derive_more::Display;

pub type Result<T> = core::result::Result<T, TsdfError>;

#[derive(Debug, Display, Clone, PartialEq)]
#[display("{self:?}")]
pub enum TsdfError {
    /// A volume was requested with a zero-length axis.
    EmptyVolume,
    /// Backing data does not have the declared `[x, y, z]` dimensions.
    ShapeMismatch { expected: [usize; 3], found: [usize; 3] },
    /// A focal length was zero or not finite.
    InvalidFocalLength,
    /// The shared-buffer id has already been registered.
    ResourceIdInUse(u32),
}

impl std::error::Error for TsdfError {}
