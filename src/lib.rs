pub mod codec;
pub mod error;
pub mod grid;
pub mod interp;
pub mod intrinsics;
pub mod plugin;
pub mod registry;
pub mod sampler;
pub mod types;
pub mod volume;
pub mod warp;

pub use plugin::TsdfPlugin;
