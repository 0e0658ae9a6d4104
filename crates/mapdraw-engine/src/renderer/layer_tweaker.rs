use super::layer_group::LayerGroupBase;
use super::paint_parameters::PaintParameters;

/// Per-frame strategy for a whole layer group.
///
/// Writes layer-wide uniform blocks into the group and per-drawable blocks into each of
/// its drawables. Runs before the drawables' own tweakers.
pub trait LayerTweaker: Send + Sync {
    fn id(&self) -> &str;

    fn execute(&self, group: &mut dyn LayerGroupBase, params: &PaintParameters);
}
