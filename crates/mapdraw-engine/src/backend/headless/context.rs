use std::sync::Arc;

use crate::backend::counters::Counters;
use crate::gfx::{
    AttributeDataType, BackendType, Context, DefaultRenderable, Drawable, DrawableBuilder, GfxError,
    RenderPassDescriptor, RenderPassEncoder, RenderingStats, ShaderProgram, ShaderProgramInfo, Texture2D,
    UploadPass,
};
use crate::paint::Color;
use crate::renderer::PaintParameters;
use crate::shaders::{DrawableMatrixUbo, UniformBlockName};

use super::drawable::{DrawCall, HeadlessBuilderImpl, HeadlessDrawableImpl, HeadlessRenderPassEncoder};
use super::resources::{HeadlessShader, HeadlessTexture, HeadlessUploadPass};

/// Largest buffer the headless backend accepts, matching wgpu's default `max_buffer_size`.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 256 << 20;

/// A render pass as it was replayed into the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPass {
    pub name: &'static str,
    pub clear_color: Option<Color>,
    pub draw_calls: usize,
}

/// Backend that records every pass and draw call instead of talking to a GPU.
///
/// Recordings of the frame being built become visible through [`HeadlessContext::draw_calls`]
/// once the frame is submitted.
pub struct HeadlessContext {
    renderable: Arc<DefaultRenderable>,
    stats: RenderingStats,
    counters: Arc<Counters>,
    max_buffer_size: usize,
    context_lost: bool,

    pending_calls: Vec<DrawCall>,
    pending_passes: Vec<RecordedPass>,
    draw_calls: Vec<DrawCall>,
    passes: Vec<RecordedPass>,
    frames_submitted: u64,

    test_shader: Arc<dyn ShaderProgram>,
    warned_foreign_drawable: bool,
}

impl HeadlessContext {
    /// A context whose default renderable is `width × height` and ready.
    pub fn new(width: u32, height: u32) -> Self {
        let mut info = ShaderProgramInfo::new("TestShader").with_uniform_block(
            DrawableMatrixUbo::NAME,
            0,
            size_of::<DrawableMatrixUbo>(),
        );
        info.vertex_attributes.add("a_pos", 0, AttributeDataType::Short2, 0);

        Self {
            renderable: Arc::new(DefaultRenderable::new(width, height, true)),
            stats: RenderingStats::default(),
            counters: Arc::new(Counters::default()),
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            context_lost: false,
            pending_calls: Vec::new(),
            pending_passes: Vec::new(),
            draw_calls: Vec::new(),
            passes: Vec::new(),
            frames_submitted: 0,
            test_shader: Arc::new(HeadlessShader::new(info)),
            warned_foreign_drawable: false,
        }
    }

    /// A position-only program with a tile matrix block.
    pub fn test_shader(&self) -> Arc<dyn ShaderProgram> {
        self.test_shader.clone()
    }

    /// Simulates a lost device: every later GPU operation fails with [`GfxError::ContextLost`].
    pub fn lose_context(&mut self) {
        if !self.context_lost {
            log::warn!("HeadlessContext: context lost");
        }
        self.context_lost = true;
    }

    pub fn set_max_buffer_size(&mut self, size: usize) {
        self.max_buffer_size = size;
    }

    /// Draw calls of the last submitted frame, in issue order.
    #[inline]
    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.draw_calls
    }

    /// Passes of the last submitted frame, in order.
    #[inline]
    pub fn passes(&self) -> &[RecordedPass] {
        &self.passes
    }

    #[inline]
    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }
}

impl Default for HeadlessContext {
    fn default() -> Self {
        Self::new(512, 512)
    }
}

impl Context for HeadlessContext {
    fn backend_type(&self) -> BackendType {
        BackendType::Headless
    }

    fn create_drawable_builder(&self, name: &str) -> DrawableBuilder {
        DrawableBuilder::new(name, Box::new(HeadlessBuilderImpl))
    }

    fn create_texture_2d(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<Arc<dyn Texture2D>, GfxError> {
        if self.context_lost {
            return Err(GfxError::ContextLost);
        }
        Ok(Arc::new(HeadlessTexture::from_rgba(width, height, rgba, &self.counters)?))
    }

    fn create_upload_pass(&mut self) -> Box<dyn UploadPass + '_> {
        Box::new(HeadlessUploadPass {
            counters: self.counters.clone(),
            max_buffer_size: self.max_buffer_size,
            context_lost: self.context_lost,
        })
    }

    fn setup_draw(&mut self, _params: &PaintParameters, drawable: &Drawable) -> bool {
        if self.context_lost || drawable.shader().is_none() {
            return false;
        }
        if !drawable.imp().as_any().is::<HeadlessDrawableImpl>() {
            if !self.warned_foreign_drawable {
                log::error!("HeadlessContext: drawable {} was built by another backend", drawable.name());
                self.warned_foreign_drawable = true;
            }
            return false;
        }
        true
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor) -> Box<dyn RenderPassEncoder> {
        Box::new(HeadlessRenderPassEncoder { name: desc.name, clear_color: desc.clear_color, calls: Vec::new() })
    }

    fn end_render_pass(&mut self, mut encoder: Box<dyn RenderPassEncoder>) {
        let Some(encoder) = encoder.as_any_mut().downcast_mut::<HeadlessRenderPassEncoder>() else {
            log::error!("HeadlessContext: foreign render pass encoder dropped");
            return;
        };
        self.stats.draw_calls += encoder.calls.len();
        self.pending_passes.push(RecordedPass {
            name: encoder.name,
            clear_color: encoder.clear_color,
            draw_calls: encoder.calls.len(),
        });
        self.pending_calls.append(&mut encoder.calls);
    }

    fn submit(&mut self) -> Result<(), GfxError> {
        if self.context_lost {
            self.pending_calls.clear();
            self.pending_passes.clear();
            return Err(GfxError::ContextLost);
        }
        self.draw_calls = std::mem::take(&mut self.pending_calls);
        self.passes = std::mem::take(&mut self.pending_passes);
        self.frames_submitted += 1;
        Ok(())
    }

    fn default_renderable(&self) -> Arc<DefaultRenderable> {
        self.renderable.clone()
    }

    fn reduce_memory_usage(&mut self) {
        self.pending_calls.shrink_to_fit();
        self.pending_passes.shrink_to_fit();
        self.draw_calls.shrink_to_fit();
        self.passes.shrink_to_fit();
    }

    fn perform_cleanup(&mut self) {
        log::trace!(
            "HeadlessContext: frame {} done, {} live buffers",
            self.frames_submitted,
            self.rendering_stats().live_buffers
        );
    }

    fn is_context_lost(&self) -> bool {
        self.context_lost
    }

    fn rendering_stats(&self) -> RenderingStats {
        let mut stats = self.stats;
        self.counters.fill(&mut stats);
        stats
    }

    fn rendering_stats_mut(&mut self) -> &mut RenderingStats {
        &mut self.stats
    }
}
