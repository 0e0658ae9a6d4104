use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;

use crate::backend::counters::Counters;
use crate::gfx::{
    BackendType, Context, DefaultRenderable, Drawable, DrawableBuilder, GfxError, RenderPassDescriptor,
    RenderPassEncoder, RenderingStats, ShaderProgram, Texture2D, UploadPass,
};
use crate::renderer::PaintParameters;

use super::drawable::{WgpuBuilderImpl, WgpuDrawableImpl, WgpuRenderPassEncoder};
use super::init::{GpuDevice, WgpuInit, request_device};
use super::pipeline::{DEPTH_FORMAT, PipelineCache};
use super::resources::{WgpuShader, WgpuTexture, WgpuUploadPass};

/// Offscreen color and depth attachments.
struct RenderTarget {
    size: (u32, u32),
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
}

impl RenderTarget {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat, (width, height): (u32, u32)) -> Self {
        let size = wgpu::Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("mapdraw color target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("mapdraw depth target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Self {
            size: (size.width, size.height),
            color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
            color,
        }
    }
}

fn clear_color(c: crate::paint::Color) -> wgpu::Color {
    wgpu::Color { r: c.r as f64, g: c.g as f64, b: c.b as f64, a: c.a as f64 }
}

/// wgpu backend rendering into an offscreen target the size of the default renderable.
///
/// Each render pass is recorded by its encoder and replayed into one wgpu render pass when
/// it ends; the frame's command buffer goes to the queue on [`Context::submit`].
pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,
    renderable: Arc<DefaultRenderable>,
    target: RenderTarget,
    pipelines: PipelineCache,
    encoder: Option<wgpu::CommandEncoder>,

    stats: RenderingStats,
    counters: Arc<Counters>,
    max_buffer_size: usize,
    context_lost: Arc<AtomicBool>,
    warned_foreign_drawable: bool,
}

impl WgpuContext {
    /// Creates a device and a context for `init`, blocking on adapter/device acquisition.
    pub fn create(init: &WgpuInit) -> Result<Self> {
        let gpu = pollster::block_on(request_device(init))?;
        Ok(Self::new(gpu, init))
    }

    pub fn new(gpu: GpuDevice, init: &WgpuInit) -> Self {
        let GpuDevice { device, queue, .. } = gpu;
        let format = init.target_format();

        let context_lost = Arc::new(AtomicBool::new(false));
        let lost = context_lost.clone();
        device.set_device_lost_callback(move |reason, message| {
            log::error!("WgpuContext: device lost ({reason:?}): {message}");
            lost.store(true, Ordering::Release);
        });

        let max_buffer_size = device.limits().max_buffer_size.min(usize::MAX as u64) as usize;
        let size = (init.width, init.height);

        Self {
            target: RenderTarget::new(&device, format, size),
            pipelines: PipelineCache::new(format),
            renderable: Arc::new(DefaultRenderable::new(size.0, size.1, true)),
            device,
            queue,
            format,
            encoder: None,
            stats: RenderingStats::default(),
            counters: Arc::new(Counters::default()),
            max_buffer_size,
            context_lost,
            warned_foreign_drawable: false,
        }
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    #[inline]
    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Color texture the frames are rendered into.
    #[inline]
    pub fn target_texture(&self) -> &wgpu::Texture {
        &self.target.color
    }

    /// Compiles a built-in program against this context's device.
    pub fn compile_shader(&self, info: crate::gfx::ShaderProgramInfo) -> Option<Arc<dyn ShaderProgram>> {
        WgpuShader::compile(&self.device, info).map(|s| Arc::new(s) as Arc<dyn ShaderProgram>)
    }

    fn ensure_target(&mut self) {
        let size = self.renderable.size();
        if size != self.target.size && size.0 > 0 && size.1 > 0 {
            log::debug!("WgpuContext: resizing target to {}x{}", size.0, size.1);
            self.target = RenderTarget::new(&self.device, self.format, size);
        }
    }

    fn lost(&self) -> bool {
        self.context_lost.load(Ordering::Acquire)
    }
}

impl Context for WgpuContext {
    fn backend_type(&self) -> BackendType {
        BackendType::Wgpu
    }

    fn create_drawable_builder(&self, name: &str) -> DrawableBuilder {
        DrawableBuilder::new(name, Box::new(WgpuBuilderImpl))
    }

    fn create_texture_2d(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<Arc<dyn Texture2D>, GfxError> {
        if self.lost() {
            return Err(GfxError::ContextLost);
        }
        let texture = WgpuTexture::from_rgba(&self.device, &self.queue, width, height, rgba, &self.counters)?;
        Ok(Arc::new(texture))
    }

    fn create_upload_pass(&mut self) -> Box<dyn UploadPass + '_> {
        Box::new(WgpuUploadPass {
            device: self.device.clone(),
            queue: self.queue.clone(),
            counters: self.counters.clone(),
            max_buffer_size: self.max_buffer_size,
            context_lost: self.lost(),
        })
    }

    fn setup_draw(&mut self, _params: &PaintParameters, drawable: &Drawable) -> bool {
        if self.lost() {
            return false;
        }
        let Some(shader) = drawable.shader() else { return false };
        let imp = drawable.imp().as_any().downcast_ref::<WgpuDrawableImpl>();
        if imp.is_none() || !shader.as_any().is::<WgpuShader>() {
            if !self.warned_foreign_drawable {
                log::error!("WgpuContext: drawable {} was built by another backend", drawable.name());
                self.warned_foreign_drawable = true;
            }
            return false;
        }
        imp.is_some_and(WgpuDrawableImpl::is_ready)
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor) -> Box<dyn RenderPassEncoder> {
        self.ensure_target();
        Box::new(WgpuRenderPassEncoder {
            name: desc.name,
            clear_color: desc.clear_color,
            clear_depth: desc.clear_depth,
            draws: Vec::new(),
        })
    }

    fn end_render_pass(&mut self, mut encoder: Box<dyn RenderPassEncoder>) {
        let Some(pass) = encoder.as_any_mut().downcast_mut::<WgpuRenderPassEncoder>() else {
            log::error!("WgpuContext: foreign render pass encoder dropped");
            return;
        };
        if self.lost() {
            return;
        }

        for draw in &pass.draws {
            self.pipelines.ensure(&self.device, &draw.key, &draw.shader);
        }

        let device = &self.device;
        let commands = self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("mapdraw frame encoder") })
        });

        let color_load = pass.clear_color.map_or(wgpu::LoadOp::Load, |c| wgpu::LoadOp::Clear(clear_color(c)));
        let depth_load = pass.clear_depth.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear);
        let (width, height) = self.target.size;

        let mut rpass = commands.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass.name),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.target.color_view,
                resolve_target: None,
                ops: wgpu::Operations { load: color_load, store: wgpu::StoreOp::Store },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.target.depth_view,
                depth_ops: Some(wgpu::Operations { load: depth_load, store: wgpu::StoreOp::Store }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let mut issued = 0;
        for draw in &pass.draws {
            let Some(pipeline) = self.pipelines.get(&draw.key) else { continue };
            rpass.set_pipeline(pipeline);
            rpass.set_viewport(0.0, 0.0, width as f32, height as f32, draw.depth_range[0], draw.depth_range[1]);
            rpass.set_bind_group(0, &draw.uniforms, &[]);
            if let Some(textures) = &draw.textures {
                rpass.set_bind_group(1, textures, &[]);
            }
            for (slot, (buffer, offset)) in draw.vertex_slots.iter().enumerate() {
                rpass.set_vertex_buffer(slot as u32, buffer.slice(*offset..));
            }
            rpass.set_index_buffer(draw.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            rpass.draw_indexed(draw.indices.clone(), draw.base_vertex, 0..1);
            issued += 1;
        }
        drop(rpass);

        self.stats.draw_calls += issued;
        log::trace!("WgpuContext: pass {} issued {issued} draw calls", pass.name);
    }

    fn submit(&mut self) -> Result<(), GfxError> {
        let commands = self.encoder.take();
        if self.lost() {
            return Err(GfxError::ContextLost);
        }
        if let Some(commands) = commands {
            self.queue.submit(std::iter::once(commands.finish()));
        }
        Ok(())
    }

    fn default_renderable(&self) -> Arc<DefaultRenderable> {
        self.renderable.clone()
    }

    fn reduce_memory_usage(&mut self) {
        let _ = self.device.poll(wgpu::PollType::Poll);
    }

    fn perform_cleanup(&mut self) {
        log::trace!(
            "WgpuContext: {} pipelines, {} live buffers",
            self.pipelines.len(),
            self.rendering_stats().live_buffers
        );
    }

    fn is_context_lost(&self) -> bool {
        self.lost()
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
