use bytemuck::{Pod, Zeroable};
use glam::DMat4;

use crate::gfx::UniformBufferArray;

/// A uniform block type and the name shaders declare it under.
pub trait UniformBlockName: Pod {
    const NAME: &'static str;
}

/// Writes `value` into `uniforms` under its block name.
#[inline]
pub fn write_ubo<T: UniformBlockName>(uniforms: &mut UniformBufferArray, value: &T) {
    uniforms.create_or_update(T::NAME, value);
}

/// Column-major `f32` copy of a double precision matrix.
#[inline]
pub fn mat4_to_f32(m: &DMat4) -> [f32; 16] {
    m.as_mat4().to_cols_array()
}

/// Tile matrix for shaders that need nothing else.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct DrawableMatrixUbo {
    pub matrix: [f32; 16],
}

impl UniformBlockName for DrawableMatrixUbo {
    const NAME: &'static str = "DrawableMatrixUBO";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_uses_block_name() {
        let mut u = UniformBufferArray::new();
        write_ubo(&mut u, &DrawableMatrixUbo { matrix: mat4_to_f32(&DMat4::IDENTITY) });
        let back: DrawableMatrixUbo = u.read("DrawableMatrixUBO").unwrap();
        assert_eq!(back.matrix[0], 1.0);
        assert_eq!(back.matrix[15], 1.0);
        assert_eq!(back.matrix[1], 0.0);
    }
}
