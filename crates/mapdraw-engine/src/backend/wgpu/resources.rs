use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::backend::counters::Counters;
use crate::gfx::{
    BufferResource, BufferUsage, GfxError, ShaderProgram, ShaderProgramInfo, Texture2D, UniformBlock,
    UploadPass, VertexAttributeArray,
};
use crate::shaders::{CUSTOM_SYMBOL_ICON_SHADER, FILL_SHADER, LINE_SHADER};

/// Format of every texture created through the context.
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Pads `data` to `wgpu::COPY_BUFFER_ALIGNMENT` for queue writes.
fn padded(data: &[u8]) -> std::borrow::Cow<'_, [u8]> {
    let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
    if data.len() % align == 0 {
        return data.into();
    }
    let mut bytes = data.to_vec();
    bytes.resize(data.len().next_multiple_of(align), 0);
    bytes.into()
}

/// GPU buffer plus the logical size it was created with.
///
/// wgpu rounds buffer sizes up to the copy alignment; `size` is what the drawable asked for.
pub struct WgpuBuffer {
    buffer: wgpu::Buffer,
    size: usize,
    counters: Arc<Counters>,
}

impl WgpuBuffer {
    #[inline]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

impl BufferResource for WgpuBuffer {
    fn size(&self) -> usize {
        self.size
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for WgpuBuffer {
    fn drop(&mut self) {
        self.counters.buffer_dropped();
    }
}

/// RGBA8 texture with its default view.
pub struct WgpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    counters: Arc<Counters>,
}

impl WgpuTexture {
    pub(super) fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        rgba: &[u8],
        counters: &Arc<Counters>,
    ) -> Result<Self, GfxError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(GfxError::Backend(format!(
                "texture {width}x{height} expects {expected} bytes, got {}",
                rgba.len()
            )));
        }
        let limit = device.limits().max_texture_dimension_2d;
        if width > limit || height > limit {
            return Err(GfxError::Backend(format!("texture {width}x{height} exceeds the {limit} pixel limit")));
        }

        let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("mapdraw texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout { offset: 0, bytes_per_row: Some(width * 4), rows_per_image: Some(height) },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        counters.texture_created();
        Ok(Self { texture, view, counters: counters.clone() })
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

impl Texture2D for WgpuTexture {
    fn size(&self) -> (u32, u32) {
        let size = self.texture.size();
        (size.width, size.height)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for WgpuTexture {
    fn drop(&mut self) {
        self.counters.texture_dropped();
    }
}

fn wgsl_source(name: &str) -> Option<&'static str> {
    match name {
        LINE_SHADER => Some(include_str!("shaders/line.wgsl")),
        FILL_SHADER => Some(include_str!("shaders/fill.wgsl")),
        CUSTOM_SYMBOL_ICON_SHADER => Some(include_str!("shaders/custom_symbol.wgsl")),
        _ => None,
    }
}

/// Bind group slot of the texture sampled at `location`; the sampler follows it.
#[inline]
pub(super) fn texture_binding(location: i32) -> u32 {
    location.max(0) as u32 * 2
}

/// A compiled program: WGSL module, bind group layouts and placeholder bindings.
///
/// Group 0 holds one uniform buffer per block at the block's binding; group 1, present
/// when the program samples textures, holds a texture/sampler pair per sampler location.
/// Blocks or textures a drawable does not provide are bound to zeroed placeholders.
pub struct WgpuShader {
    info: ShaderProgramInfo,
    module: wgpu::ShaderModule,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: Option<wgpu::BindGroupLayout>,
    pipeline_layout: wgpu::PipelineLayout,
    placeholder_uniforms: BTreeMap<String, wgpu::Buffer>,
    placeholder_view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl WgpuShader {
    /// Compiles a built-in program. Unknown names yield `None`.
    pub fn compile(device: &wgpu::Device, info: ShaderProgramInfo) -> Option<Self> {
        let Some(source) = wgsl_source(&info.name) else {
            log::warn!("WgpuShader: no WGSL source for {}", info.name);
            return None;
        };
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(info.name.as_str()),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let uniform_entries: Vec<_> = info
            .uniform_blocks
            .iter()
            .map(|block| wgpu::BindGroupLayoutEntry {
                binding: block.binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(block.size as u64),
                },
                count: None,
            })
            .collect();
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mapdraw uniform bgl"),
            entries: &uniform_entries,
        });

        let texture_layout = (!info.samplers.is_empty()).then(|| {
            let entries: Vec<_> = info
                .samplers
                .iter()
                .flat_map(|(_, location)| {
                    let binding = texture_binding(*location);
                    [
                        wgpu::BindGroupLayoutEntry {
                            binding,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: binding + 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ]
                })
                .collect();
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("mapdraw texture bgl"),
                entries: &entries,
            })
        });

        let mut group_layouts = vec![&uniform_layout];
        group_layouts.extend(texture_layout.as_ref());
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mapdraw pipeline layout"),
            bind_group_layouts: &group_layouts,
            immediate_size: 0,
        });

        let placeholder_uniforms = info
            .uniform_blocks
            .iter()
            .map(|block| {
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("mapdraw placeholder ubo"),
                    size: (block.size as u64).max(16),
                    usage: wgpu::BufferUsages::UNIFORM,
                    mapped_at_creation: false,
                });
                (block.name.clone(), buffer)
            })
            .collect();

        let placeholder = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("mapdraw placeholder texture"),
            size: wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let placeholder_view = placeholder.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("mapdraw sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Some(Self {
            info,
            module,
            uniform_layout,
            texture_layout,
            pipeline_layout,
            placeholder_uniforms,
            placeholder_view,
            sampler,
        })
    }

    #[inline]
    pub(super) fn module(&self) -> &wgpu::ShaderModule {
        &self.module
    }

    #[inline]
    pub(super) fn pipeline_layout(&self) -> &wgpu::PipelineLayout {
        &self.pipeline_layout
    }

    /// Binds each block to the drawable's buffer when it is large enough, else to the placeholder.
    pub(super) fn uniform_bind_group(
        &self,
        device: &wgpu::Device,
        buffers: &BTreeMap<String, Box<dyn BufferResource>>,
    ) -> wgpu::BindGroup {
        let entries: Vec<_> = self
            .info
            .uniform_blocks
            .iter()
            .filter_map(|block| {
                let own = buffers
                    .get(&block.name)
                    .filter(|b| b.size() >= block.size)
                    .and_then(|b| b.as_any().downcast_ref::<WgpuBuffer>())
                    .map(WgpuBuffer::buffer);
                let buffer = own.or_else(|| self.placeholder_uniforms.get(&block.name))?;
                Some(wgpu::BindGroupEntry { binding: block.binding, resource: buffer.as_entire_binding() })
            })
            .collect();
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mapdraw uniform bind group"),
            layout: &self.uniform_layout,
            entries: &entries,
        })
    }

    /// `views` maps sampler locations to the drawable's textures.
    pub(super) fn texture_bind_group(
        &self,
        device: &wgpu::Device,
        views: &BTreeMap<i32, &wgpu::TextureView>,
    ) -> Option<wgpu::BindGroup> {
        let layout = self.texture_layout.as_ref()?;
        let entries: Vec<_> = self
            .info
            .samplers
            .iter()
            .flat_map(|(_, location)| {
                let binding = texture_binding(*location);
                let view = views.get(location).copied().unwrap_or(&self.placeholder_view);
                [
                    wgpu::BindGroupEntry { binding, resource: wgpu::BindingResource::TextureView(view) },
                    wgpu::BindGroupEntry {
                        binding: binding + 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ]
            })
            .collect();
        Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mapdraw texture bind group"),
            layout,
            entries: &entries,
        }))
    }
}

impl ShaderProgram for WgpuShader {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn vertex_attributes(&self) -> &VertexAttributeArray {
        &self.info.vertex_attributes
    }

    fn uniform_blocks(&self) -> &[UniformBlock] {
        &self.info.uniform_blocks
    }

    fn sampler_location(&self, name: &str) -> Option<i32> {
        self.info.sampler_location(name)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Upload pass creating wgpu buffers. Owns device and queue handles so it outlives no borrow.
pub struct WgpuUploadPass {
    pub(super) device: wgpu::Device,
    pub(super) queue: wgpu::Queue,
    pub(super) counters: Arc<Counters>,
    pub(super) max_buffer_size: usize,
    pub(super) context_lost: bool,
}

impl WgpuUploadPass {
    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    fn create(
        &mut self,
        data: &[u8],
        usage: wgpu::BufferUsages,
        label: &'static str,
    ) -> Result<Box<dyn BufferResource>, GfxError> {
        if self.context_lost {
            return Err(GfxError::ContextLost);
        }
        if data.len() > self.max_buffer_size {
            return Err(GfxError::BufferTooLarge { size: data.len(), limit: self.max_buffer_size });
        }
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: &padded(data),
            usage: usage | wgpu::BufferUsages::COPY_DST,
        });
        self.counters.buffer_created(data.len());
        Ok(Box::new(WgpuBuffer { buffer, size: data.len(), counters: self.counters.clone() }))
    }
}

impl UploadPass for WgpuUploadPass {
    fn create_index_buffer_resource(
        &mut self,
        data: &[u8],
        _usage: BufferUsage,
    ) -> Result<Box<dyn BufferResource>, GfxError> {
        self.create(data, wgpu::BufferUsages::INDEX, "mapdraw ibo")
    }

    fn create_vertex_buffer_resource(
        &mut self,
        data: &[u8],
        _usage: BufferUsage,
    ) -> Result<Box<dyn BufferResource>, GfxError> {
        self.create(data, wgpu::BufferUsages::VERTEX, "mapdraw vbo")
    }

    fn create_uniform_buffer_resource(&mut self, data: &[u8]) -> Result<Box<dyn BufferResource>, GfxError> {
        self.create(data, wgpu::BufferUsages::UNIFORM, "mapdraw ubo")
    }

    fn update_buffer_resource(&mut self, resource: &dyn BufferResource, data: &[u8]) -> Result<(), GfxError> {
        if self.context_lost {
            return Err(GfxError::ContextLost);
        }
        let Some(buffer) = resource.as_any().downcast_ref::<WgpuBuffer>() else {
            return Err(GfxError::ForeignResource("buffer"));
        };
        if data.len() != buffer.size {
            return Err(GfxError::Backend(format!(
                "buffer update of {} bytes into a {} byte buffer",
                data.len(),
                buffer.size
            )));
        }
        self.queue.write_buffer(&buffer.buffer, 0, &padded(data));
        self.counters.buffer_updated(data.len());
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
