use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::gfx::{
    AttributeBinding, Drawable, DrawableBuilderImpl, DrawableImpl, DrawableResources, GfxError, RenderPass,
    RenderPassEncoder, ShaderProgram, TextureAttachment, UploadPass,
};
use crate::paint::Color;
use crate::renderer::PaintParameters;

use super::pipeline::{PipelineKey, cull_state, vertex_format};
use super::resources::{WgpuBuffer, WgpuShader, WgpuTexture, WgpuUploadPass};

/// One draw call, self-contained so the context can replay it into a wgpu pass.
pub(super) struct RecordedDraw {
    pub shader: Arc<dyn ShaderProgram>,
    pub key: PipelineKey,
    pub uniforms: wgpu::BindGroup,
    pub textures: Option<wgpu::BindGroup>,
    /// Vertex buffer slices, one per pipeline vertex slot.
    pub vertex_slots: Vec<(wgpu::Buffer, u64)>,
    pub index_buffer: wgpu::Buffer,
    pub base_vertex: i32,
    pub indices: std::ops::Range<u32>,
    pub depth_range: [f32; 2],
}

/// Encoder that collects draw calls for one wgpu render pass.
pub struct WgpuRenderPassEncoder {
    pub(super) name: &'static str,
    pub(super) clear_color: Option<Color>,
    pub(super) clear_depth: Option<f32>,
    pub(super) draws: Vec<RecordedDraw>,
}

impl RenderPassEncoder for WgpuRenderPassEncoder {
    fn name(&self) -> &str {
        self.name
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct WgpuBuilderImpl;

impl DrawableBuilderImpl for WgpuBuilderImpl {
    fn create_drawable_impl(&self) -> Box<dyn DrawableImpl> {
        Box::new(WgpuDrawableImpl::default())
    }
}

/// Bind groups and buffer handles derived from a drawable's resources.
struct Bindings {
    generation: u64,
    texture_key: Vec<(i32, usize)>,
    uniforms: wgpu::BindGroup,
    textures: Option<wgpu::BindGroup>,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    attributes: Vec<(AttributeBinding, wgpu::VertexFormat)>,
}

#[derive(Default)]
pub struct WgpuDrawableImpl {
    bindings: Option<Bindings>,
    warned_unsupported: AtomicBool,
    warned_foreign_encoder: AtomicBool,
}

impl WgpuDrawableImpl {
    /// `true` once an upload produced bindings to draw with.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.bindings.is_some()
    }

    fn warn_once(flag: &AtomicBool, message: impl FnOnce() -> String) {
        if !flag.swap(true, Ordering::Relaxed) {
            log::warn!("{}", message());
        }
    }
}

fn texture_key(textures: &[TextureAttachment]) -> Vec<(i32, usize)> {
    textures.iter().map(|t| (t.location, Arc::as_ptr(&t.texture) as *const () as usize)).collect()
}

fn wgpu_buffer(resource: Option<&dyn crate::gfx::BufferResource>) -> Option<&wgpu::Buffer> {
    resource?.as_any().downcast_ref::<WgpuBuffer>().map(WgpuBuffer::buffer)
}

impl DrawableImpl for WgpuDrawableImpl {
    fn upload(
        &mut self,
        upload_pass: &mut dyn UploadPass,
        resources: &DrawableResources,
        shader: &Arc<dyn ShaderProgram>,
        textures: &[TextureAttachment],
    ) -> Result<(), GfxError> {
        let key = texture_key(textures);
        if self.bindings.as_ref().is_some_and(|b| b.generation == resources.generation && b.texture_key == key) {
            return Ok(());
        }

        let Some(program) = shader.as_any().downcast_ref::<WgpuShader>() else {
            return Err(GfxError::ForeignResource("shader"));
        };
        let Some(pass) = upload_pass.as_any_mut().downcast_mut::<WgpuUploadPass>() else {
            return Err(GfxError::ForeignResource("upload pass"));
        };
        let device = pass.device();

        let (Some(vertex_buffer), Some(index_buffer)) = (
            wgpu_buffer(resources.vertex_buffer.as_deref()),
            wgpu_buffer(resources.index_buffer.as_deref()),
        ) else {
            // Nothing to draw yet (no vertices or no indexes).
            self.bindings = None;
            return Ok(());
        };

        let mut attributes = Vec::with_capacity(resources.attribute_bindings.len());
        for binding in &resources.attribute_bindings {
            match vertex_format(binding.data_type) {
                Some(format) if binding.index >= 0 => attributes.push((binding.clone(), format)),
                _ => Self::warn_once(&self.warned_unsupported, || {
                    format!("WgpuDrawable: attribute {} ({:?}) cannot be bound", binding.name, binding.data_type)
                }),
            }
        }

        let views: BTreeMap<i32, &wgpu::TextureView> = textures
            .iter()
            .filter_map(|t| Some((t.location, t.texture.as_any().downcast_ref::<WgpuTexture>()?.view())))
            .collect();

        self.bindings = Some(Bindings {
            generation: resources.generation,
            texture_key: key,
            uniforms: program.uniform_bind_group(device, &resources.uniform_buffers),
            textures: program.texture_bind_group(device, &views),
            vertex_buffer: vertex_buffer.clone(),
            index_buffer: index_buffer.clone(),
            attributes,
        });
        Ok(())
    }

    fn draw(&self, drawable: &Drawable, params: &PaintParameters, encoder: &mut dyn RenderPassEncoder) {
        let Some(bindings) = &self.bindings else { return };
        let Some(shader) = drawable.shader() else { return };
        let Some(encoder) = encoder.as_any_mut().downcast_mut::<WgpuRenderPassEncoder>() else {
            Self::warn_once(&self.warned_foreign_encoder, || {
                format!("WgpuDrawable {}: render pass encoder is not a wgpu encoder", drawable.name())
            });
            return;
        };
        if cull_state(drawable.cull_face_mode()).is_none() {
            return;
        }

        let depth = if params.pass == RenderPass::PASS_3D {
            params.depth_mode_for_sublayer(drawable.sub_layer_index().max(0) as u32, drawable.depth_type())
        } else {
            crate::gfx::DepthMode::disabled()
        };
        let vertex_slots: Vec<_> = bindings
            .attributes
            .iter()
            .map(|(b, _)| (bindings.vertex_buffer.clone(), b.byte_offset as u64))
            .collect();
        let layout: Vec<_> = bindings.attributes.iter().map(|(b, f)| (b.index as u32, *f)).collect();

        for seg in drawable.segments() {
            if seg.segment.index_length == 0 {
                continue;
            }
            let first = seg.segment.index_offset as u32;
            encoder.draws.push(RecordedDraw {
                shader: shader.clone(),
                key: PipelineKey::new(
                    shader,
                    layout.clone(),
                    seg.mode,
                    drawable.color_mode(),
                    drawable.cull_face_mode(),
                    depth,
                ),
                uniforms: bindings.uniforms.clone(),
                textures: bindings.textures.clone(),
                vertex_slots: vertex_slots.clone(),
                index_buffer: bindings.index_buffer.clone(),
                base_vertex: seg.segment.vertex_offset as i32,
                indices: first..first + seg.segment.index_length as u32,
                depth_range: depth.range,
            });
        }
    }

    fn release(&mut self) {
        self.bindings = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
