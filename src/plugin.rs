use bevy::prelude::*;
use tracing::debug;

use crate::{
    codec::{ActiveEncoding, TsdfEncoding},
    intrinsics::{Intrinsics, IntrinsicsPyramid},
    registry::ResourceIdRegistry,
};
#[cfg(feature = "auto_update")]
use crate::warp::WarpField;

/// System sets for the per-frame TSDF bookkeeping.
///
/// ```text
/// TsdfSet::Pyramid  →  TsdfSet::Warp  →  [your fusion / skinning systems]
/// ```
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TsdfSet {
    /// Rebuilds [`IntrinsicsPyramid`] when [`TsdfConfig`] changes.
    Pyramid,
    /// Refreshes the dual-quaternion cache of every changed [`WarpField`].
    Warp,
}

/// Runtime configuration for the TSDF core.
///
/// Inserted as a resource by [`TsdfPlugin`]. Changing it at runtime rebuilds the
/// intrinsics pyramid on the next frame:
///
/// ```rust,ignore
/// fn switch_camera(mut config: ResMut<TsdfConfig>) {
///     config.intrinsics = Intrinsics::new(525.0, 525.0, 319.5, 239.5);
/// }
/// ```
#[derive(Resource, Debug, Clone)]
pub struct TsdfConfig {
    /// Depth camera intrinsics at full resolution. Default: Kinect.
    pub intrinsics: Intrinsics,
    /// Number of pyramid levels, including full resolution. Default: `3`.
    pub pyramid_levels: u32,
}

impl Default for TsdfConfig {
    fn default() -> Self {
        Self {
            intrinsics: Intrinsics::kinect(),
            pyramid_levels: 3,
        }
    }
}

/// Bevy plugin that installs the TSDF core's shared state.
///
/// Always inserts [`TsdfConfig`], [`IntrinsicsPyramid`] and a [`ResourceIdRegistry`].
/// Pass [`shared_registry`](TsdfPlugin::shared_registry) to make several apps draw
/// buffer ids from one set. With the `auto_update` feature enabled, it also runs:
///
/// ```text
/// TsdfConfig changed      →  IntrinsicsPyramid rebuilt   (TsdfSet::Pyramid)
/// WarpField nodes edited  →  dual quaternions refreshed  (TsdfSet::Warp)
/// ```
#[derive(Default)]
pub struct TsdfPlugin {
    /// Initial value for [`TsdfConfig`].
    pub config: TsdfConfig,
    /// Registry to share with other apps; a fresh one is created if `None`.
    pub shared_registry: Option<ResourceIdRegistry>,
}

impl Plugin for TsdfPlugin {
    fn build(&self, app: &mut App) {
        let encoding = <ActiveEncoding as TsdfEncoding>::NAME;
        debug!(
            encoding,
            levels = self.config.pyramid_levels,
            "building TSDF plugin"
        );

        app.insert_resource(self.config.clone())
            .insert_resource(IntrinsicsPyramid::new(
                self.config.intrinsics,
                self.config.pyramid_levels,
            ))
            .insert_resource(self.shared_registry.clone().unwrap_or_default());

        #[cfg(feature = "auto_update")]
        app.configure_sets(Update, (TsdfSet::Pyramid, TsdfSet::Warp).chain())
            .add_systems(
                Update,
                (
                    rebuild_pyramid.in_set(TsdfSet::Pyramid),
                    refresh_warp_fields.in_set(TsdfSet::Warp),
                ),
            );
    }
}

#[cfg(feature = "auto_update")]
/// Rebuilds the [`IntrinsicsPyramid`] whenever [`TsdfConfig`] has changed.
fn rebuild_pyramid(config: Res<TsdfConfig>, mut pyramid: ResMut<IntrinsicsPyramid>) {
    if !config.is_changed() {
        return;
    }
    let rebuilt = IntrinsicsPyramid::new(config.intrinsics, config.pyramid_levels);
    if *pyramid != rebuilt {
        debug!(levels = rebuilt.len(), "rebuilt intrinsics pyramid");
        *pyramid = rebuilt;
    }
}

#[cfg(feature = "auto_update")]
/// Refreshes every [`WarpField`] whose nodes changed since the last frame.
///
/// The refresh itself bypasses change detection so a field is not re-queued by its own update.
fn refresh_warp_fields(mut query: Query<(Entity, &mut WarpField), Changed<WarpField>>) {
    for (entity, mut field) in query.iter_mut() {
        let field = field.bypass_change_detection();
        field.refresh();
        tracing::trace!(?entity, nodes = field.nodes.len(), "refreshed warp field");
    }
}
