use bytemuck::{Pod, Zeroable};

use super::common::UniformBlockName;

/// Shader name of the textured point-symbol program.
pub const CUSTOM_SYMBOL_ICON_SHADER: &str = "CustomSymbolIconShader";

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct CustomSymbolIconDrawableUbo {
    pub matrix: [f32; 16],
}

/// Icon placement parameters.
///
/// Booleans are widened to `u32` (0 or 1) to keep the block `Pod`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct CustomSymbolIconParametersUbo {
    pub extrude_scale: [f32; 2],
    pub anchor: [f32; 2],
    pub angle_degrees: f32,
    pub scale_with_map: u32,
    pub pitch_with_map: u32,
    pub camera_to_center_distance: f32,
    pub aspect_ratio: f32,
    pub _pad: [f32; 3],
}

impl UniformBlockName for CustomSymbolIconDrawableUbo {
    const NAME: &'static str = "CustomSymbolIconDrawableUBO";
}

impl UniformBlockName for CustomSymbolIconParametersUbo {
    const NAME: &'static str = "CustomSymbolIconParametersUBO";
}
