//! wgpu backend.
//!
//! Renders offscreen: the target is a color texture plus a depth buffer sized from the
//! default renderable. Built-in programs are WGSL modules whose bindings follow
//! [`program_info`](crate::shaders::program_info):
//! - group 0: one uniform buffer per block, at the block's binding
//! - group 1: texture/sampler pairs, when the program samples textures
//!
//! Every vertex attribute gets its own vertex buffer slot, pointing at its region of the
//! drawable's packed vertex buffer.

mod context;
mod drawable;
mod init;
mod pipeline;
mod resources;

use std::sync::Arc;

use crate::gfx::{ShaderProgram, ShaderRegistry};
use crate::shaders::register_builtin_shaders;

pub use context::WgpuContext;
pub use drawable::{WgpuBuilderImpl, WgpuDrawableImpl, WgpuRenderPassEncoder};
pub use init::{GpuDevice, WgpuInit, request_device};
pub use resources::{TEXTURE_FORMAT, WgpuBuffer, WgpuShader, WgpuTexture, WgpuUploadPass};

/// A registry compiling every built-in program on `device` on first use.
pub fn builtin_shader_registry(device: &wgpu::Device) -> ShaderRegistry {
    let device = device.clone();
    let mut registry = ShaderRegistry::new();
    register_builtin_shaders(&mut registry, move |info| {
        WgpuShader::compile(&device, info).map(|s| Arc::new(s) as Arc<dyn ShaderProgram>)
    });
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::gfx::{Context, RenderPass, RenderPassDescriptor};
    use crate::map::TransformState;
    use crate::paint::Color;
    use crate::renderer::PaintParameters;
    use crate::shaders::{FILL_SHADER, FillDrawableUbo, FillEvaluatedPropsUbo, write_ubo};

    #[test]
    #[ignore = "needs a GPU or software adapter"]
    fn fill_renders_offscreen() {
        let init = WgpuInit { width: 64, height: 64, ..WgpuInit::default() };
        let mut context = WgpuContext::create(&init).unwrap();
        let registry = builtin_shader_registry(context.device());
        let shader = registry
            .get_shader_group(FILL_SHADER)
            .and_then(|g| g.get_or_create_shader(&["a_color", "a_opacity"].map(String::from).into()))
            .unwrap();

        let mut builder = context.create_drawable_builder("fill");
        builder.set_shader(shader);
        builder.set_render_pass(RenderPass::TRANSLUCENT);
        builder.add_triangle(0, 0, 8192, 0, 0, 8192);
        builder.flush();
        let mut d = *builder.clear_drawables().pop().unwrap();
        write_ubo(d.mutable_uniform_buffers(), &FillDrawableUbo { matrix: glam::Mat4::IDENTITY.to_cols_array() });
        write_ubo(
            d.mutable_uniform_buffers(),
            &FillEvaluatedPropsUbo { color: [1.0, 0.0, 0.0, 1.0], opacity: 1.0, _pad: [0.0; 3] },
        );
        {
            let mut pass = context.create_upload_pass();
            d.upload(pass.as_mut()).unwrap();
        }

        let state = TransformState::new(64, 64);
        let mut params = PaintParameters::new(&state, 1.0, 1);
        params.pass = RenderPass::TRANSLUCENT;
        let mut encoder = context.begin_render_pass(&RenderPassDescriptor {
            name: "main",
            clear_color: Some(Color::white()),
            clear_depth: Some(1.0),
        });
        assert!(context.setup_draw(&params, &d));
        d.draw(&params, encoder.as_mut());
        context.end_render_pass(encoder);
        context.submit().unwrap();

        assert_eq!(context.rendering_stats().draw_calls, 1);
        assert!(!context.is_context_lost());
    }
}
