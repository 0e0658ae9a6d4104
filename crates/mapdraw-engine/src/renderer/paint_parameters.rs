use std::sync::Arc;

use crate::gfx::{ColorMode, DepthFunction, DepthMaskType, DepthMode, RenderPass, Texture2D};
use crate::map::{TransformParameters, TransformState};

use super::line_atlas::LineAtlas;

/// Sub-layers per layer in the depth range.
pub const NUM_SUBLAYERS: u32 = 3;

/// Depth distance between two adjacent sub-layers.
pub const DEPTH_EPSILON: f32 = 1.0 / (1 << 16) as f32;

/// Cross-fade state for properties that blend between two zoom levels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CrossfadeParameters {
    pub from_scale: f32,
    pub to_scale: f32,
    pub t: f32,
}

impl Default for CrossfadeParameters {
    fn default() -> Self {
        Self { from_scale: 1.0, to_scale: 1.0, t: 1.0 }
    }
}

/// Everything a tweaker or backend needs to know about the frame being drawn.
#[derive(Clone)]
pub struct PaintParameters {
    pub transform: TransformParameters,
    pub pixel_ratio: f32,
    /// Clip-space size of one logical pixel.
    pub pixels_to_gl_units: [f32; 2],
    pub pass: RenderPass,
    /// Index of the layer currently drawn, bottom-most first.
    pub current_layer: u32,
    /// Layers below this index draw without depth testing.
    pub opaque_pass_cutoff: u32,
    pub num_sublayers: u32,
    pub depth_epsilon: f32,
    pub depth_range_size: f32,
    pub line_atlas: Option<Arc<LineAtlas>>,
    /// GPU copy of the line atlas, refreshed by the renderer when the atlas grows.
    pub line_atlas_texture: Option<Arc<dyn Texture2D>>,
    pub crossfade: CrossfadeParameters,
    pub frame: u64,
}

impl PaintParameters {
    pub fn new(state: &TransformState, pixel_ratio: f32, layer_count: u32) -> Self {
        Self {
            transform: TransformParameters::new(state),
            pixel_ratio,
            pixels_to_gl_units: state.pixels_to_gl_units(),
            pass: RenderPass::OPAQUE,
            current_layer: 0,
            opaque_pass_cutoff: 0,
            num_sublayers: NUM_SUBLAYERS,
            depth_epsilon: DEPTH_EPSILON,
            depth_range_size: 1.0 - (layer_count * NUM_SUBLAYERS + 2) as f32 * DEPTH_EPSILON,
            line_atlas: None,
            line_atlas_texture: None,
            crossfade: CrossfadeParameters::default(),
            frame: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> &TransformState {
        &self.transform.state
    }

    /// Depth slice for sub-layer `n` of the current layer.
    pub fn depth_mode_for_sublayer(&self, n: u32, mask: DepthMaskType) -> DepthMode {
        if self.current_layer < self.opaque_pass_cutoff {
            return DepthMode::disabled();
        }
        let depth = self.depth_range_size
            + ((1 + self.current_layer) * self.num_sublayers + n) as f32 * self.depth_epsilon;
        DepthMode { func: DepthFunction::LessEqual, mask, range: [depth, depth] }
    }

    pub fn color_mode_for_render_pass(&self) -> ColorMode {
        if self.pass == RenderPass::OPAQUE { ColorMode::unblended() } else { ColorMode::alpha_blended() }
    }
}

impl core::fmt::Debug for PaintParameters {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PaintParameters")
            .field("pass", &self.pass)
            .field("current_layer", &self.current_layer)
            .field("zoom", &self.state().zoom())
            .field("pixel_ratio", &self.pixel_ratio)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sublayers_get_increasing_depth() {
        let state = TransformState::new(256, 256);
        let mut params = PaintParameters::new(&state, 1.0, 4);
        params.current_layer = 2;
        let a = params.depth_mode_for_sublayer(0, DepthMaskType::ReadOnly);
        let b = params.depth_mode_for_sublayer(1, DepthMaskType::ReadOnly);
        assert!(b.range[0] > a.range[0]);
        assert!(b.range[0] < 1.0);
    }

    #[test]
    fn layers_below_cutoff_skip_depth() {
        let state = TransformState::new(256, 256);
        let mut params = PaintParameters::new(&state, 1.0, 4);
        params.opaque_pass_cutoff = 3;
        params.current_layer = 1;
        assert!(params.depth_mode_for_sublayer(0, DepthMaskType::ReadWrite).is_disabled());
    }

    #[test]
    fn opaque_pass_draws_unblended() {
        let state = TransformState::new(256, 256);
        let mut params = PaintParameters::new(&state, 1.0, 1);
        assert_eq!(params.color_mode_for_render_pass(), ColorMode::unblended());
        params.pass = RenderPass::TRANSLUCENT;
        assert_eq!(params.color_mode_for_render_pass(), ColorMode::alpha_blended());
    }
}
