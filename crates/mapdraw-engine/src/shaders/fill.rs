use bytemuck::{Pod, Zeroable};

use super::common::UniformBlockName;

/// Shader group name of the fill program.
pub const FILL_SHADER: &str = "FillShader";

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FillDrawableUbo {
    pub matrix: [f32; 16],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FillEvaluatedPropsUbo {
    pub color: [f32; 4],
    pub opacity: f32,
    pub _pad: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Default, Pod, Zeroable)]
pub struct FillInterpolateUbo {
    pub color_t: f32,
    pub opacity_t: f32,
    pub _pad: [f32; 2],
}

impl UniformBlockName for FillDrawableUbo {
    const NAME: &'static str = "FillDrawableUBO";
}

impl UniformBlockName for FillEvaluatedPropsUbo {
    const NAME: &'static str = "FillEvaluatedPropsUBO";
}

impl UniformBlockName for FillInterpolateUbo {
    const NAME: &'static str = "FillInterpolateUBO";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_are_std140_sized() {
        assert_eq!(std::mem::size_of::<FillDrawableUbo>(), 64);
        assert_eq!(std::mem::size_of::<FillEvaluatedPropsUbo>(), 32);
        assert_eq!(std::mem::size_of::<FillInterpolateUbo>(), 16);
    }
}
