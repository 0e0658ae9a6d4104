use std::sync::Arc;
use std::time::Duration;

use crate::gfx::{
    Context, Drawable, GfxError, RenderPass, RenderPassDescriptor, RenderPassEncoder, RenderingStats, Texture2D,
};
use crate::map::TransformState;
use crate::paint::Color;

use super::layer_group::{LayerGroupBase, lock_group};
use super::line_atlas::LineAtlas;
use super::paint_parameters::PaintParameters;
use super::render_orchestrator::RenderOrchestrator;

/// Frame loop settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// How long a frame waits for the default renderable before it is skipped.
    pub renderable_timeout: Duration,
    pub clear_color: Color,
    pub pixel_ratio: f32,
    /// Dash atlas size in texels.
    pub line_atlas_size: (u32, u32),
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            renderable_timeout: Duration::from_millis(100),
            clear_color: Color::transparent(),
            pixel_ratio: 1.0,
            line_atlas_size: (512, 512),
        }
    }
}

/// Outcome of one [`Renderer::render`] call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameStatus {
    Rendered(RenderingStats),
    /// The default renderable did not become ready in time.
    Skipped,
    /// The GPU context is gone; nothing was issued.
    ContextLost,
}

/// Drives a frame: applies queued changes, runs tweakers, uploads dirty state and draws
/// every pass in order.
pub struct Renderer {
    config: RendererConfig,
    line_atlas: Arc<LineAtlas>,
    line_atlas_texture: Option<Arc<dyn Texture2D>>,
    frame: u64,
    warned_upload_failure: bool,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        let (w, h) = config.line_atlas_size;
        Self {
            config,
            line_atlas: Arc::new(LineAtlas::new(w, h)),
            line_atlas_texture: None,
            frame: 0,
            warned_upload_failure: false,
        }
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    #[inline]
    pub fn line_atlas(&self) -> &Arc<LineAtlas> {
        &self.line_atlas
    }

    /// Renders one frame of `state`.
    pub fn render(
        &mut self,
        orchestrator: &mut RenderOrchestrator,
        context: &mut dyn Context,
        state: &TransformState,
    ) -> FrameStatus {
        if orchestrator.is_context_lost() || context.is_context_lost() {
            orchestrator.mark_context_lost();
            return FrameStatus::ContextLost;
        }

        let renderable = context.default_renderable();
        if !renderable.wait(self.config.renderable_timeout) {
            log::debug!("Renderer: default renderable not ready; frame skipped");
            return FrameStatus::Skipped;
        }

        orchestrator.process_changes();

        self.frame += 1;
        {
            let stats = context.rendering_stats_mut();
            stats.begin_frame();
            stats.frames += 1;
        }

        let mut params =
            PaintParameters::new(state, self.config.pixel_ratio, orchestrator.num_layer_groups() as u32);
        params.frame = self.frame;
        params.line_atlas = Some(self.line_atlas.clone());

        self.run_tweakers(orchestrator, context, &mut params);

        if let Err(err) = self.upload(orchestrator, context) {
            if err == GfxError::ContextLost {
                orchestrator.mark_context_lost();
                return FrameStatus::ContextLost;
            }
        }

        self.draw_passes(orchestrator, context, &mut params);

        if let Err(err) = context.submit() {
            log::error!("Renderer: submit failed: {err}");
            if err == GfxError::ContextLost {
                orchestrator.mark_context_lost();
                return FrameStatus::ContextLost;
            }
        }
        context.perform_cleanup();
        FrameStatus::Rendered(context.rendering_stats())
    }

    // ── upload phase ──

    fn run_tweakers(
        &mut self,
        orchestrator: &mut RenderOrchestrator,
        context: &mut dyn Context,
        params: &mut PaintParameters,
    ) {
        self.refresh_line_atlas(context);
        params.line_atlas_texture = self.line_atlas_texture.clone();
        run_layer_tweakers(orchestrator, params);

        // Tweakers rasterize dash patterns lazily; rerun once so they bind the new texture.
        if self.refresh_line_atlas(context) {
            params.line_atlas_texture = self.line_atlas_texture.clone();
            run_layer_tweakers(orchestrator, params);
        }

        let params: &PaintParameters = params;
        orchestrator.observe_layer_groups(|group| {
            if !group.is_enabled() {
                return;
            }
            group.propagate_uniforms();
            group.observe_drawables_mut(&mut |d| d.run_tweakers(params));
        });
        orchestrator.observe_drawables_mut(|d| d.run_tweakers(params));
    }

    /// Recreates the atlas texture if the atlas image changed. Returns `true` if it did.
    fn refresh_line_atlas(&mut self, context: &mut dyn Context) -> bool {
        let Some(image) = self.line_atlas.take_dirty_image() else { return false };
        let (w, h) = self.line_atlas.size();
        let rgba: Vec<u8> = image.iter().flat_map(|&v| [v, v, v, v]).collect();
        match context.create_texture_2d(w, h, &rgba) {
            Ok(texture) => {
                self.line_atlas_texture = Some(texture);
                true
            }
            Err(err) => {
                log::warn!("Renderer: line atlas upload failed: {err}");
                false
            }
        }
    }

    fn upload(&mut self, orchestrator: &mut RenderOrchestrator, context: &mut dyn Context) -> Result<(), GfxError> {
        let mut first_error: Option<GfxError> = None;
        {
            let mut upload_pass = context.create_upload_pass();
            let mut record = |d: &mut Drawable| {
                if let Err(err) = d.upload(upload_pass.as_mut()) {
                    first_error.get_or_insert(err);
                }
            };
            orchestrator.observe_layer_groups(|group| {
                if group.is_enabled() {
                    group.observe_drawables_mut(&mut record);
                }
            });
            orchestrator.observe_drawables_mut(&mut record);
        }

        match first_error {
            Some(err) => {
                if !self.warned_upload_failure {
                    log::error!("Renderer: drawable upload failed: {err}");
                    self.warned_upload_failure = true;
                }
                Err(err)
            }
            None => Ok(()),
        }
    }

    // ── draw phase ──

    fn draw_passes(
        &self,
        orchestrator: &RenderOrchestrator,
        context: &mut dyn Context,
        params: &mut PaintParameters,
    ) {
        let groups = orchestrator.layer_groups();

        let standalone = orchestrator.sorted_drawables();

        let wants_3d = standalone.iter().any(|d| d.has_render_pass(RenderPass::PASS_3D))
            || groups.iter().any(|g| lock_group(g).is_some_and(|g| g.render_passes().contains(RenderPass::PASS_3D)));
        if wants_3d {
            let desc = RenderPassDescriptor { name: "3d", clear_color: None, clear_depth: Some(1.0) };
            let mut encoder = context.begin_render_pass(&desc);
            context.rendering_stats_mut().render_passes += 1;
            params.pass = RenderPass::PASS_3D;
            for (layer, group) in groups.iter().enumerate() {
                let Some(group) = lock_group(group) else { continue };
                params.current_layer = layer as u32;
                draw_group(&*group, context, params, encoder.as_mut());
            }
            context.end_render_pass(encoder);
        }

        let mut encoder = context.begin_render_pass(&RenderPassDescriptor {
            name: "main",
            clear_color: Some(self.config.clear_color),
            clear_depth: Some(1.0),
        });
        context.rendering_stats_mut().render_passes += 1;

        for drawable in standalone {
            params.pass =
                if drawable.has_render_pass(RenderPass::OPAQUE) { RenderPass::OPAQUE } else { RenderPass::TRANSLUCENT };
            draw_one(drawable, context, params, encoder.as_mut());
        }

        params.pass = RenderPass::OPAQUE;
        for (layer, group) in groups.iter().enumerate().rev() {
            let Some(group) = lock_group(group) else { continue };
            params.current_layer = layer as u32;
            draw_group(&*group, context, params, encoder.as_mut());
        }

        for pass in [RenderPass::TRANSLUCENT, RenderPass::DEBUG] {
            params.pass = pass;
            for (layer, group) in groups.iter().enumerate() {
                let Some(group) = lock_group(group) else { continue };
                params.current_layer = layer as u32;
                draw_group(&*group, context, params, encoder.as_mut());
            }
        }

        context.end_render_pass(encoder);
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

fn run_layer_tweakers(orchestrator: &RenderOrchestrator, params: &PaintParameters) {
    orchestrator.observe_layer_groups(|group| {
        if !group.is_enabled() {
            return;
        }
        if let Some(tweaker) = group.layer_tweaker() {
            tweaker.execute(group, params);
        }
    });
}

fn draw_group(
    group: &dyn LayerGroupBase,
    context: &mut dyn Context,
    params: &PaintParameters,
    encoder: &mut dyn RenderPassEncoder,
) {
    if !group.is_enabled() {
        return;
    }
    group.observe_drawables(&mut |d| {
        if d.has_render_pass(params.pass) {
            draw_one(d, context, params, encoder);
        }
    });
}

fn draw_one(
    drawable: &Drawable,
    context: &mut dyn Context,
    params: &PaintParameters,
    encoder: &mut dyn RenderPassEncoder,
) {
    if !drawable.is_enabled() {
        return;
    }
    if context.setup_draw(params, drawable) {
        context.rendering_stats_mut().drawables += 1;
        drawable.draw(params, encoder);
    }
}
