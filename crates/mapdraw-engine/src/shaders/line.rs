use bytemuck::{Pod, Zeroable};

use super::common::UniformBlockName;

/// Shader group name of the line program.
pub const LINE_SHADER: &str = "LineShader";

/// Sampler location of the pattern or dash atlas texture.
pub const LINE_IMAGE_TEXTURE: i32 = 0;

/// Per-drawable line transform.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LineUbo {
    pub matrix: [f32; 16],
    /// Tile units per logical pixel at the current zoom, inverted.
    pub ratio: f32,
    pub device_pixel_ratio: f32,
    pub _pad: [f32; 2],
}

/// Frame-wide line scaling.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LineDynamicUbo {
    pub units_to_pixels: [f32; 2],
    pub _pad: [f32; 2],
}

/// Evaluated line paint properties.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LinePropertiesUbo {
    pub color: [f32; 4],
    pub blur: f32,
    pub opacity: f32,
    pub gapwidth: f32,
    pub offset: f32,
    pub width: f32,
    pub _pad: [f32; 3],
}

/// Interpolation factors for zoom-dependent properties. Zero means "use the evaluated value".
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Default, Pod, Zeroable)]
pub struct LineInterpolationUbo {
    pub color_t: f32,
    pub blur_t: f32,
    pub opacity_t: f32,
    pub gapwidth_t: f32,
    pub offset_t: f32,
    pub width_t: f32,
    pub _pad: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LinePatternUbo {
    pub matrix: [f32; 16],
    pub scale: [f32; 4],
    pub texsize: [f32; 2],
    pub ratio: f32,
    pub fade: f32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LineSdfUbo {
    pub matrix: [f32; 16],
    pub patternscale_a: [f32; 2],
    pub patternscale_b: [f32; 2],
    pub ratio: f32,
    pub tex_y_a: f32,
    pub tex_y_b: f32,
    pub sdfgamma: f32,
    pub mix: f32,
    pub _pad: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LineGradientUbo {
    pub matrix: [f32; 16],
    pub ratio: f32,
    pub _pad: [f32; 3],
}

impl UniformBlockName for LineUbo {
    const NAME: &'static str = "LineUBO";
}

impl UniformBlockName for LineDynamicUbo {
    const NAME: &'static str = "LineDynamicUBO";
}

impl UniformBlockName for LinePropertiesUbo {
    const NAME: &'static str = "LinePropertiesUBO";
}

impl UniformBlockName for LineInterpolationUbo {
    const NAME: &'static str = "LineInterpolationUBO";
}

impl UniformBlockName for LinePatternUbo {
    const NAME: &'static str = "LinePatternUBO";
}

impl UniformBlockName for LineSdfUbo {
    const NAME: &'static str = "LineSDFUBO";
}

impl UniformBlockName for LineGradientUbo {
    const NAME: &'static str = "LineGradientUBO";
}
