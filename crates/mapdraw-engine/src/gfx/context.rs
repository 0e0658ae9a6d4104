use std::sync::Arc;

use crate::renderer::{LayerGroup, PaintParameters, TileLayerGroup, TileMatrixTweaker};

use super::drawable::Drawable;
use super::drawable_builder::DrawableBuilder;
use super::drawable_tweaker::DrawableTweaker;
use super::error::GfxError;
use super::render_pass::{RenderPassDescriptor, RenderPassEncoder};
use super::renderable::DefaultRenderable;
use super::texture::Texture2D;
use super::types::BackendType;
use super::upload_pass::UploadPass;

/// Counters a backend keeps about the frames it renders.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RenderingStats {
    pub frames: u64,
    /// Draw calls issued in the last frame.
    pub draw_calls: usize,
    /// Drawables that passed `setup_draw` in the last frame.
    pub drawables: usize,
    pub render_passes: usize,
    pub buffers_created: usize,
    pub buffer_bytes_uploaded: usize,
    pub live_buffers: usize,
    pub live_textures: usize,
}

impl RenderingStats {
    /// Clears the per-frame counters, keeping totals and live counts.
    pub fn begin_frame(&mut self) {
        self.draw_calls = 0;
        self.drawables = 0;
        self.render_passes = 0;
    }
}

/// Backend entry point: creates builders, groups, passes and GPU resources.
///
/// All methods run on the render thread.
pub trait Context {
    fn backend_type(&self) -> BackendType;

    fn create_drawable_builder(&self, name: &str) -> DrawableBuilder;

    /// The tweaker attached to tile drawables that only need a tile matrix.
    fn create_drawable_tweaker(&self) -> Arc<dyn DrawableTweaker> {
        Arc::new(TileMatrixTweaker::default())
    }

    fn create_layer_group(&self, layer_index: i32, capacity: usize, name: &str) -> LayerGroup {
        LayerGroup::new(layer_index, capacity, name)
    }

    fn create_tile_layer_group(&self, layer_index: i32, capacity: usize, name: &str) -> TileLayerGroup {
        TileLayerGroup::new(layer_index, capacity, name)
    }

    /// Creates an RGBA8 texture.
    fn create_texture_2d(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<Arc<dyn Texture2D>, GfxError>;

    fn create_upload_pass(&mut self) -> Box<dyn UploadPass + '_>;

    /// Binds pass-level state for `drawable`. Returns `false` to skip drawing it.
    fn setup_draw(&mut self, params: &PaintParameters, drawable: &Drawable) -> bool;

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor) -> Box<dyn RenderPassEncoder>;

    /// Replays the commands recorded in `encoder` into the frame.
    fn end_render_pass(&mut self, encoder: Box<dyn RenderPassEncoder>);

    fn submit(&mut self) -> Result<(), GfxError>;

    fn default_renderable(&self) -> Arc<DefaultRenderable>;

    /// Drops caches that can be rebuilt on demand.
    fn reduce_memory_usage(&mut self);

    /// Frees resources whose owners were released during the frame.
    fn perform_cleanup(&mut self);

    fn is_context_lost(&self) -> bool;

    fn rendering_stats(&self) -> RenderingStats;

    fn rendering_stats_mut(&mut self) -> &mut RenderingStats;
}
