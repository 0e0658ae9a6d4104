use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::gfx::{
    DrawMode, Drawable, DrawableBuilderImpl, DrawableId, DrawableImpl, DrawableResources, GfxError, RenderPass,
    RenderPassEncoder, ShaderProgram, TextureAttachment, UploadPass,
};
use crate::paint::Color;
use crate::renderer::PaintParameters;

use super::resources::HeadlessBuffer;

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub pass_name: String,
    pub drawable_id: DrawableId,
    pub drawable_name: String,
    pub render_pass: RenderPass,
    pub layer: u32,
    pub mode: DrawMode,
    /// Vertex offset of the segment; indexes are relative to it.
    pub base_vertex: usize,
    pub first_index: usize,
    pub index_count: usize,
    pub uniform_blocks: usize,
    pub textures: usize,
}

/// Encoder that records draw calls until the context replays it.
#[derive(Debug)]
pub struct HeadlessRenderPassEncoder {
    pub(super) name: &'static str,
    pub(super) clear_color: Option<Color>,
    pub(super) calls: Vec<DrawCall>,
}

impl RenderPassEncoder for HeadlessRenderPassEncoder {
    fn name(&self) -> &str {
        self.name
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct HeadlessBuilderImpl;

impl DrawableBuilderImpl for HeadlessBuilderImpl {
    fn create_drawable_impl(&self) -> Box<dyn DrawableImpl> {
        Box::new(HeadlessDrawableImpl::default())
    }
}

#[derive(Debug, Default)]
pub struct HeadlessDrawableImpl {
    uploads: usize,
    warned_foreign_encoder: AtomicBool,
}

impl HeadlessDrawableImpl {
    /// Number of completed uploads.
    #[inline]
    pub fn uploads(&self) -> usize {
        self.uploads
    }
}

impl DrawableImpl for HeadlessDrawableImpl {
    fn upload(
        &mut self,
        _upload_pass: &mut dyn UploadPass,
        resources: &DrawableResources,
        _shader: &Arc<dyn ShaderProgram>,
        _textures: &[TextureAttachment],
    ) -> Result<(), GfxError> {
        let buffers = resources
            .index_buffer
            .iter()
            .chain(resources.vertex_buffer.iter())
            .chain(resources.uniform_buffers.values());
        for buffer in buffers {
            if !buffer.as_any().is::<HeadlessBuffer>() {
                return Err(GfxError::ForeignResource("drawable buffer"));
            }
        }
        self.uploads += 1;
        Ok(())
    }

    fn draw(&self, drawable: &Drawable, params: &PaintParameters, encoder: &mut dyn RenderPassEncoder) {
        let pass_name = encoder.name().to_owned();
        let Some(encoder) = encoder.as_any_mut().downcast_mut::<HeadlessRenderPassEncoder>() else {
            if !self.warned_foreign_encoder.swap(true, Ordering::Relaxed) {
                log::error!("HeadlessDrawable {}: render pass encoder is not headless", drawable.name());
            }
            return;
        };
        for seg in drawable.segments() {
            encoder.calls.push(DrawCall {
                pass_name: pass_name.clone(),
                drawable_id: drawable.id(),
                drawable_name: drawable.name().to_owned(),
                render_pass: params.pass,
                layer: params.current_layer,
                mode: seg.mode,
                base_vertex: seg.segment.vertex_offset,
                first_index: seg.segment.index_offset,
                index_count: seg.segment.index_length,
                uniform_blocks: drawable.resources().uniform_buffers.len(),
                textures: drawable.textures().len(),
            });
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
