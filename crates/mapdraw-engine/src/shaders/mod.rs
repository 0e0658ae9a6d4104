//! Fixed-layout uniform blocks shared by tweakers and backend shaders, and the layout of
//! the built-in programs.
//!
//! Every block is `#[repr(C)]`, a multiple of 16 bytes and `Pod`, so it can be written
//! straight into a [`UniformBufferArray`](crate::gfx::UniformBufferArray) and bound as a
//! std140 uniform buffer.

mod common;
mod custom_symbol;
mod fill;
mod line;
mod programs;

pub use common::{DrawableMatrixUbo, UniformBlockName, mat4_to_f32, write_ubo};
pub use custom_symbol::{
    CUSTOM_SYMBOL_ICON_SHADER, CustomSymbolIconDrawableUbo, CustomSymbolIconParametersUbo,
};
pub use fill::{FILL_SHADER, FillDrawableUbo, FillEvaluatedPropsUbo, FillInterpolateUbo};
pub use line::{
    LINE_IMAGE_TEXTURE, LINE_SHADER, LineDynamicUbo, LineGradientUbo, LineInterpolationUbo, LinePatternUbo,
    LinePropertiesUbo, LineSdfUbo, LineUbo,
};
pub use programs::{BUILTIN_SHADERS, program_info, register_builtin_shaders};
