//! Fixed-function state carried by drawables and consumed by backends.

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum DepthMaskType {
    #[default]
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum DepthFunction {
    Never,
    Less,
    Equal,
    #[default]
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Depth test configuration for one draw.
///
/// `range` is the `[near, far]` slice of the depth buffer the draw writes into; sub-layers
/// get disjoint slices so they stay separated without per-layer clears.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DepthMode {
    pub func: DepthFunction,
    pub mask: DepthMaskType,
    pub range: [f32; 2],
}

impl DepthMode {
    pub const fn disabled() -> Self {
        Self { func: DepthFunction::Always, mask: DepthMaskType::ReadOnly, range: [0.0, 1.0] }
    }

    #[inline]
    pub fn is_disabled(&self) -> bool {
        self.func == DepthFunction::Always && self.mask == DepthMaskType::ReadOnly
    }
}

impl Default for DepthMode {
    fn default() -> Self {
        Self::disabled()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum CullFaceSide {
    Front,
    #[default]
    Back,
    FrontAndBack,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Winding {
    Clockwise,
    #[default]
    CounterClockwise,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct CullFaceMode {
    pub enabled: bool,
    pub side: CullFaceSide,
    pub winding: Winding,
}

impl CullFaceMode {
    pub const fn disabled() -> Self {
        Self { enabled: false, side: CullFaceSide::Back, winding: Winding::CounterClockwise }
    }

    pub const fn back_ccw() -> Self {
        Self { enabled: true, side: CullFaceSide::Back, winding: Winding::CounterClockwise }
    }
}

/// Blend state. `None` blend means the source overwrites the destination.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ColorMode {
    pub blend: Option<BlendMode>,
    pub write_mask: [bool; 4],
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendMode {
    /// `src + dst * (1 - src.a)`; colors are premultiplied.
    PremultipliedAlpha,
    Additive,
}

impl ColorMode {
    pub const fn disabled() -> Self {
        Self { blend: None, write_mask: [false; 4] }
    }

    pub const fn unblended() -> Self {
        Self { blend: None, write_mask: [true; 4] }
    }

    pub const fn alpha_blended() -> Self {
        Self { blend: Some(BlendMode::PremultipliedAlpha), write_mask: [true; 4] }
    }
}

impl Default for ColorMode {
    fn default() -> Self {
        Self::alpha_blended()
    }
}

/// Primitive topology of a segment.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum DrawMode {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
}

impl DrawMode {
    /// Vertices consumed per primitive in list topologies.
    pub fn vertices_per_primitive(self) -> usize {
        match self {
            DrawMode::Points => 1,
            DrawMode::Lines | DrawMode::LineStrip => 2,
            DrawMode::Triangles | DrawMode::TriangleStrip => 3,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum BufferUsage {
    #[default]
    StaticDraw,
    DynamicDraw,
    StreamDraw,
}

/// Element type of a vertex attribute.
///
/// Every variant's byte size is a multiple of four, so packed attribute regions stay
/// 4-byte aligned.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AttributeDataType {
    Int,
    Int2,
    Int3,
    Int4,
    Float,
    Float2,
    Float3,
    Float4,
    /// Four `u8` components (packed line extrusion data).
    UByte4,
    UShort4,
    /// Two `i16` components (tile-unit positions).
    Short2,
    Short4,
    Matrix4,
}

impl AttributeDataType {
    pub fn byte_size(self) -> usize {
        match self {
            AttributeDataType::Int | AttributeDataType::Float => 4,
            AttributeDataType::Short2 | AttributeDataType::UByte4 => 4,
            AttributeDataType::Int2 | AttributeDataType::Float2 => 8,
            AttributeDataType::UShort4 | AttributeDataType::Short4 => 8,
            AttributeDataType::Int3 | AttributeDataType::Float3 => 12,
            AttributeDataType::Int4 | AttributeDataType::Float4 => 16,
            AttributeDataType::Matrix4 => 64,
        }
    }

    pub fn component_count(self) -> usize {
        match self {
            AttributeDataType::Int | AttributeDataType::Float => 1,
            AttributeDataType::Int2 | AttributeDataType::Float2 | AttributeDataType::Short2 => 2,
            AttributeDataType::Int3 | AttributeDataType::Float3 => 3,
            AttributeDataType::Int4
            | AttributeDataType::Float4
            | AttributeDataType::UByte4
            | AttributeDataType::UShort4
            | AttributeDataType::Short4 => 4,
            AttributeDataType::Matrix4 => 16,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BackendType {
    Headless,
    Wgpu,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_sizes_are_four_byte_aligned() {
        let all = [
            AttributeDataType::Int,
            AttributeDataType::Int2,
            AttributeDataType::Int3,
            AttributeDataType::Int4,
            AttributeDataType::Float,
            AttributeDataType::Float2,
            AttributeDataType::Float3,
            AttributeDataType::Float4,
            AttributeDataType::UByte4,
            AttributeDataType::UShort4,
            AttributeDataType::Short2,
            AttributeDataType::Short4,
            AttributeDataType::Matrix4,
        ];
        for t in all {
            assert_eq!(t.byte_size() % 4, 0, "{t:?}");
        }
    }

    #[test]
    fn disabled_depth_mode_reports_disabled() {
        assert!(DepthMode::disabled().is_disabled());
        let rw = DepthMode { mask: DepthMaskType::ReadWrite, ..DepthMode::disabled() };
        assert!(!rw.is_disabled());
    }
}
