use crate::gfx::{Context, ShaderRegistry};
use crate::map::TransformState;

use super::change_request::ChangeRequest;
use super::layer_group::LayerGroupRef;

/// What a render layer sees while it updates.
pub struct LayerUpdateParameters<'a> {
    pub shaders: &'a ShaderRegistry,
    pub context: &'a dyn Context,
    pub state: &'a TransformState,
    /// Changes to apply on the next `process_changes`.
    pub changes: &'a mut Vec<ChangeRequest>,
}

/// The render-side counterpart of a style layer.
///
/// `update` runs once per frame. A layer with nothing new to build must return
/// without touching its group.
pub trait RenderLayer {
    fn id(&self) -> &str;

    fn layer_index(&self) -> i32;

    fn layer_group(&self) -> Option<LayerGroupRef>;

    fn update(&mut self, params: &mut LayerUpdateParameters<'_>);
}
