//! Recording backend.
//!
//! Buffers live in memory, shaders are just their layout and every draw call is recorded
//! with the pass, layer and segment it came from. Used by the tests and the studio demo.

mod context;
mod drawable;
mod resources;

use std::sync::Arc;

use crate::gfx::{ShaderProgram, ShaderRegistry};
use crate::shaders::register_builtin_shaders;

pub use context::{DEFAULT_MAX_BUFFER_SIZE, HeadlessContext, RecordedPass};
pub use drawable::{DrawCall, HeadlessBuilderImpl, HeadlessDrawableImpl, HeadlessRenderPassEncoder};
pub use resources::{HeadlessBuffer, HeadlessShader, HeadlessTexture, HeadlessUploadPass};

/// A registry holding every built-in program as a [`HeadlessShader`].
pub fn builtin_shader_registry() -> ShaderRegistry {
    let mut registry = ShaderRegistry::new();
    register_builtin_shaders(&mut registry, |info| {
        Some(Arc::new(HeadlessShader::new(info)) as Arc<dyn ShaderProgram>)
    });
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use crate::gfx::{BufferResource, BufferUsage, Context, GfxError, RenderPass, RenderPassDescriptor};
    use crate::map::TransformState;
    use crate::paint::Color;
    use crate::renderer::PaintParameters;
    use crate::shaders::{DrawableMatrixUbo, LINE_SHADER, UniformBlockName, write_ubo};

    fn built(context: &HeadlessContext) -> crate::gfx::Drawable {
        let mut builder = context.create_drawable_builder("tri");
        builder.set_shader(context.test_shader());
        builder.set_render_pass(RenderPass::TRANSLUCENT);
        builder.add_triangle(0, 0, 8, 0, 0, 8);
        builder.flush();
        *builder.clear_drawables().pop().unwrap()
    }

    // ── upload ──

    #[test]
    fn upload_creates_and_tracks_buffers() {
        let mut context = HeadlessContext::new(16, 16);
        let mut d = built(&context);
        write_ubo(d.mutable_uniform_buffers(), &DrawableMatrixUbo { matrix: [0.0; 16] });
        {
            let mut pass = context.create_upload_pass();
            d.upload(pass.as_mut()).unwrap();
        }
        let stats = context.rendering_stats();
        assert_eq!(stats.buffers_created, 3);
        assert_eq!(stats.live_buffers, 3);
        assert_eq!(d.resources().generation, 1);

        let vertices = d.resources().vertex_buffer.as_ref().unwrap();
        let vertices = vertices.as_any().downcast_ref::<HeadlessBuffer>().unwrap();
        assert_eq!(vertices.contents(), bytemuck::cast_slice::<i16, u8>(&[0, 0, 8, 0, 0, 8]));
        assert!(d.resources().uniform_buffers.contains_key(DrawableMatrixUbo::NAME));

        drop(d);
        assert_eq!(context.rendering_stats().live_buffers, 0);
    }

    #[test]
    fn clean_drawable_uploads_nothing_new() {
        let mut context = HeadlessContext::new(16, 16);
        let mut d = built(&context);
        for _ in 0..2 {
            let mut pass = context.create_upload_pass();
            d.upload(pass.as_mut()).unwrap();
        }
        assert_eq!(context.rendering_stats().buffers_created, 2);
        let imp = d.imp().as_any().downcast_ref::<HeadlessDrawableImpl>().unwrap();
        assert_eq!(imp.uploads(), 2);
    }

    #[test]
    fn oversized_buffer_is_rejected() {
        let mut context = HeadlessContext::new(16, 16);
        context.set_max_buffer_size(4);
        let mut d = built(&context);
        let mut pass = context.create_upload_pass();
        assert_eq!(d.upload(pass.as_mut()), Err(GfxError::BufferTooLarge { size: 6, limit: 4 }));
    }

    #[test]
    fn update_checks_origin_and_size() {
        let mut context = HeadlessContext::new(16, 16);
        let mut pass = context.create_upload_pass();
        let buffer = pass.create_vertex_buffer_resource(&[1, 2, 3, 4], BufferUsage::DynamicDraw).unwrap();
        pass.update_buffer_resource(buffer.as_ref(), &[5, 6, 7, 8]).unwrap();
        assert!(matches!(pass.update_buffer_resource(buffer.as_ref(), &[1]), Err(GfxError::Backend(_))));

        struct Foreign;
        impl BufferResource for Foreign {
            fn size(&self) -> usize {
                4
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }
        assert_eq!(pass.update_buffer_resource(&Foreign, &[0; 4]), Err(GfxError::ForeignResource("buffer")));
        let contents = buffer.as_any().downcast_ref::<HeadlessBuffer>().unwrap().contents();
        assert_eq!(contents, [5, 6, 7, 8]);
    }

    #[test]
    fn lost_context_fails_uploads_and_textures() {
        let mut context = HeadlessContext::new(16, 16);
        context.lose_context();
        let mut d = built(&context);
        {
            let mut pass = context.create_upload_pass();
            assert_eq!(d.upload(pass.as_mut()), Err(GfxError::ContextLost));
        }
        assert!(matches!(context.create_texture_2d(1, 1, &[0; 4]), Err(GfxError::ContextLost)));
        assert_eq!(context.submit(), Err(GfxError::ContextLost));
    }

    // ── textures ──

    #[test]
    fn texture_size_must_match_pixels() {
        let mut context = HeadlessContext::new(16, 16);
        assert!(matches!(context.create_texture_2d(2, 2, &[0; 15]), Err(GfxError::Backend(_))));
        let texture = context.create_texture_2d(2, 1, &[9; 8]).unwrap();
        assert_eq!(texture.size(), (2, 1));
        assert_eq!(context.rendering_stats().live_textures, 1);
        drop(texture);
        assert_eq!(context.rendering_stats().live_textures, 0);
    }

    // ── passes ──

    #[test]
    fn passes_replay_on_submit() {
        let mut context = HeadlessContext::new(16, 16);
        let d = built(&context);
        let state = TransformState::new(16, 16);
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
        assert!(context.draw_calls().is_empty());

        context.submit().unwrap();
        assert_eq!(context.frames_submitted(), 1);
        assert_eq!(context.passes(), [RecordedPass { name: "main", clear_color: Some(Color::white()), draw_calls: 1 }]);
        let call = &context.draw_calls()[0];
        assert_eq!((call.pass_name.as_str(), call.drawable_id), ("main", d.id()));
        assert_eq!((call.first_index, call.index_count), (0, 3));
        assert_eq!(call.render_pass, RenderPass::TRANSLUCENT);
        assert_eq!(context.rendering_stats().draw_calls, 1);
    }

    #[test]
    fn registry_holds_builtin_programs() {
        let registry = builtin_shader_registry();
        assert_eq!(registry.len(), 3);
        let group = registry.get_shader_group(LINE_SHADER).unwrap();
        let shader = group.get_or_create_shader(&BTreeSet::new()).unwrap();
        assert!(shader.as_any().is::<HeadlessShader>());
        assert_eq!(shader.sampler_location("u_image"), Some(0));
    }
}
