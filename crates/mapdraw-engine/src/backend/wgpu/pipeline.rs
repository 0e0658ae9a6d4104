use std::collections::HashMap;
use std::sync::Arc;

use crate::gfx::{
    AttributeDataType, BlendMode, ColorMode, CullFaceMode, CullFaceSide, DepthFunction, DepthMaskType, DepthMode,
    DrawMode, ShaderProgram, Winding,
};

use super::resources::WgpuShader;

pub(super) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Vertex format of an attribute type. Matrices have no vertex format.
pub(super) fn vertex_format(data_type: AttributeDataType) -> Option<wgpu::VertexFormat> {
    use wgpu::VertexFormat as F;
    Some(match data_type {
        AttributeDataType::Int => F::Sint32,
        AttributeDataType::Int2 => F::Sint32x2,
        AttributeDataType::Int3 => F::Sint32x3,
        AttributeDataType::Int4 => F::Sint32x4,
        AttributeDataType::Float => F::Float32,
        AttributeDataType::Float2 => F::Float32x2,
        AttributeDataType::Float3 => F::Float32x3,
        AttributeDataType::Float4 => F::Float32x4,
        AttributeDataType::UByte4 => F::Uint8x4,
        AttributeDataType::UShort4 => F::Uint16x4,
        AttributeDataType::Short2 => F::Sint16x2,
        AttributeDataType::Short4 => F::Sint16x4,
        AttributeDataType::Matrix4 => return None,
    })
}

pub(super) fn topology(mode: DrawMode) -> wgpu::PrimitiveTopology {
    match mode {
        DrawMode::Points => wgpu::PrimitiveTopology::PointList,
        DrawMode::Lines => wgpu::PrimitiveTopology::LineList,
        DrawMode::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        DrawMode::Triangles => wgpu::PrimitiveTopology::TriangleList,
        DrawMode::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

/// Premultiplied alpha: `src + dst * (1 - src.a)`.
fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

pub(super) fn blend_state(mode: ColorMode) -> Option<wgpu::BlendState> {
    match mode.blend? {
        BlendMode::PremultipliedAlpha => Some(premul_alpha_blend()),
        BlendMode::Additive => {
            let add = wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            };
            Some(wgpu::BlendState { color: add, alpha: add })
        }
    }
}

pub(super) fn color_writes(mode: ColorMode) -> wgpu::ColorWrites {
    let [r, g, b, a] = mode.write_mask;
    let mut writes = wgpu::ColorWrites::empty();
    writes.set(wgpu::ColorWrites::RED, r);
    writes.set(wgpu::ColorWrites::GREEN, g);
    writes.set(wgpu::ColorWrites::BLUE, b);
    writes.set(wgpu::ColorWrites::ALPHA, a);
    writes
}

/// Face culling. `None` means every face is culled and the draw can be skipped.
pub(super) fn cull_state(mode: CullFaceMode) -> Option<(wgpu::FrontFace, Option<wgpu::Face>)> {
    let front_face = match mode.winding {
        Winding::Clockwise => wgpu::FrontFace::Cw,
        Winding::CounterClockwise => wgpu::FrontFace::Ccw,
    };
    if !mode.enabled {
        return Some((front_face, None));
    }
    match mode.side {
        CullFaceSide::Front => Some((front_face, Some(wgpu::Face::Front))),
        CullFaceSide::Back => Some((front_face, Some(wgpu::Face::Back))),
        CullFaceSide::FrontAndBack => None,
    }
}

pub(super) fn compare_function(func: DepthFunction) -> wgpu::CompareFunction {
    match func {
        DepthFunction::Never => wgpu::CompareFunction::Never,
        DepthFunction::Less => wgpu::CompareFunction::Less,
        DepthFunction::Equal => wgpu::CompareFunction::Equal,
        DepthFunction::LessEqual => wgpu::CompareFunction::LessEqual,
        DepthFunction::Greater => wgpu::CompareFunction::Greater,
        DepthFunction::NotEqual => wgpu::CompareFunction::NotEqual,
        DepthFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
        DepthFunction::Always => wgpu::CompareFunction::Always,
    }
}

/// Everything a render pipeline is specialized on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) struct PipelineKey {
    /// Address of the shader; the cache keeps the shader alive so it stays unique.
    pub shader: usize,
    /// `(shader location, format)` per vertex buffer slot.
    pub attributes: Vec<(u32, wgpu::VertexFormat)>,
    pub mode: DrawMode,
    pub color: ColorMode,
    pub cull: CullFaceMode,
    pub depth_func: DepthFunction,
    pub depth_write: bool,
}

impl PipelineKey {
    pub fn new(
        shader: &Arc<dyn ShaderProgram>,
        attributes: Vec<(u32, wgpu::VertexFormat)>,
        mode: DrawMode,
        color: ColorMode,
        cull: CullFaceMode,
        depth: DepthMode,
    ) -> Self {
        Self {
            shader: Arc::as_ptr(shader) as *const () as usize,
            attributes,
            mode,
            color,
            cull,
            depth_func: depth.func,
            depth_write: depth.mask == DepthMaskType::ReadWrite,
        }
    }
}

/// Render pipelines by key, built on first use for one target format.
pub(super) struct PipelineCache {
    format: wgpu::TextureFormat,
    pipelines: HashMap<PipelineKey, (Arc<dyn ShaderProgram>, wgpu::RenderPipeline)>,
}

impl PipelineCache {
    pub fn new(format: wgpu::TextureFormat) -> Self {
        Self { format, pipelines: HashMap::new() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn get(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key).map(|(_, pipeline)| pipeline)
    }

    pub fn ensure(&mut self, device: &wgpu::Device, key: &PipelineKey, shader: &Arc<dyn ShaderProgram>) {
        if self.pipelines.contains_key(key) {
            return;
        }
        let Some(program) = shader.as_any().downcast_ref::<WgpuShader>() else { return };
        let Some((front_face, cull_mode)) = cull_state(key.cull) else { return };
        let pipeline = self.create(device, key, program, front_face, cull_mode);
        log::debug!("PipelineCache: built pipeline #{} for {}", self.pipelines.len() + 1, shader.name());
        self.pipelines.insert(key.clone(), (shader.clone(), pipeline));
    }

    fn create(
        &self,
        device: &wgpu::Device,
        key: &PipelineKey,
        program: &WgpuShader,
        front_face: wgpu::FrontFace,
        cull_mode: Option<wgpu::Face>,
    ) -> wgpu::RenderPipeline {
        // Attributes are stored as separate regions, one vertex buffer slot each.
        let attributes: Vec<[wgpu::VertexAttribute; 1]> = key
            .attributes
            .iter()
            .map(|&(shader_location, format)| [wgpu::VertexAttribute { format, offset: 0, shader_location }])
            .collect();
        let buffers: Vec<_> = attributes
            .iter()
            .map(|attr| wgpu::VertexBufferLayout {
                array_stride: attr[0].format.size(),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attr,
            })
            .collect();

        let topology = topology(key.mode);
        let strip_index_format = matches!(
            topology,
            wgpu::PrimitiveTopology::LineStrip | wgpu::PrimitiveTopology::TriangleStrip
        )
        .then_some(wgpu::IndexFormat::Uint16);

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("mapdraw drawable pipeline"),
            layout: Some(program.pipeline_layout()),
            vertex: wgpu::VertexState {
                module: program.module(),
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: program.module(),
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    blend: blend_state(key.color),
                    write_mask: color_writes(key.color),
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format,
                front_face,
                cull_mode,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: key.depth_write,
                depth_compare: compare_function(key.depth_func),
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── state mapping ──

    #[test]
    fn packed_attribute_types_map_to_matching_formats() {
        for ty in [AttributeDataType::Short2, AttributeDataType::UByte4, AttributeDataType::Float4] {
            let format = vertex_format(ty).unwrap();
            assert_eq!(format.size() as usize, ty.byte_size());
        }
        assert_eq!(vertex_format(AttributeDataType::Matrix4), None);
    }

    #[test]
    fn blending_follows_color_mode() {
        assert_eq!(blend_state(ColorMode::alpha_blended()), Some(premul_alpha_blend()));
        assert_eq!(blend_state(ColorMode::unblended()), None);
        assert_eq!(color_writes(ColorMode::disabled()), wgpu::ColorWrites::empty());
        assert_eq!(color_writes(ColorMode::unblended()), wgpu::ColorWrites::ALL);
    }

    #[test]
    fn culling_both_faces_skips_the_draw() {
        assert_eq!(cull_state(CullFaceMode::disabled()), Some((wgpu::FrontFace::Ccw, None)));
        assert_eq!(cull_state(CullFaceMode::back_ccw()), Some((wgpu::FrontFace::Ccw, Some(wgpu::Face::Back))));
        let both = CullFaceMode { enabled: true, side: CullFaceSide::FrontAndBack, winding: Winding::Clockwise };
        assert_eq!(cull_state(both), None);
    }

    #[test]
    fn depth_write_only_for_read_write_mask() {
        struct Dummy;
        impl ShaderProgram for Dummy {
            fn name(&self) -> &str {
                "dummy"
            }
            fn vertex_attributes(&self) -> &crate::gfx::VertexAttributeArray {
                unreachable!()
            }
            fn uniform_blocks(&self) -> &[crate::gfx::UniformBlock] {
                &[]
            }
            fn sampler_location(&self, _: &str) -> Option<i32> {
                None
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }
        let shader: Arc<dyn ShaderProgram> = Arc::new(Dummy);
        let key = |mask| {
            let depth = DepthMode { func: DepthFunction::LessEqual, mask, range: [0.0, 1.0] };
            PipelineKey::new(&shader, Vec::new(), DrawMode::Triangles, ColorMode::default(), CullFaceMode::default(), depth)
        };
        assert!(key(DepthMaskType::ReadWrite).depth_write);
        assert!(!key(DepthMaskType::ReadOnly).depth_write);
        assert_ne!(key(DepthMaskType::ReadWrite), key(DepthMaskType::ReadOnly));
    }
}
