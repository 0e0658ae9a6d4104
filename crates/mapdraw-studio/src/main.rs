//! Drawable pipeline demo.
//!
//! Builds a custom drawable layer over a 2×2 block of tiles and renders a few frames,
//! logging the per-frame stats. Runs headless by default; `--wgpu` renders offscreen
//! through wgpu instead.
//!
//! Usage: `mapdraw-studio [--wgpu] [--frames N]`

use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use mapdraw_engine::backend::{headless, wgpu as gpu};
use mapdraw_engine::gfx::{Context, LineCapType, LineJoinType, ShaderRegistry, Texture2D};
use mapdraw_engine::logging::{LoggingConfig, init_logging};
use mapdraw_engine::map::TransformState;
use mapdraw_engine::paint::Color;
use mapdraw_engine::renderer::{FrameStatus, RenderOrchestrator, Renderer, RendererConfig};
use mapdraw_engine::style::{
    CustomDrawableLayer, CustomDrawableLayerHost, FillOptions, Interface, LineOptions, SymbolOptions,
};
use mapdraw_engine::tile::{GeometryCoordinate, OverscaledTileId};

const ZOOM: u8 = 4;
const ICON_SIZE: u32 = 16;

struct Options {
    wgpu: bool,
    frames: usize,
}

fn parse_args() -> Result<Options> {
    let mut options = Options { wgpu: false, frames: 3 };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--wgpu" => options.wgpu = true,
            "--frames" => {
                let value = args.next().context("--frames needs a value")?;
                options.frames = value.parse().with_context(|| format!("invalid frame count {value:?}"))?;
            }
            other => bail!("unknown argument {other:?}"),
        }
    }
    Ok(options)
}

/// A round dot with a soft edge, premultiplied.
fn icon_pixels() -> Vec<u8> {
    let half = ICON_SIZE as f32 / 2.0;
    let mut rgba = Vec::with_capacity((ICON_SIZE * ICON_SIZE * 4) as usize);
    for y in 0..ICON_SIZE {
        for x in 0..ICON_SIZE {
            let d = ((x as f32 + 0.5 - half).powi(2) + (y as f32 + 0.5 - half).powi(2)).sqrt();
            let a = (half - d).clamp(0.0, 1.0);
            let c = Color::from_straight(0.1, 0.4, 0.9, a);
            rgba.extend(c.to_f32_array().map(|v| (v * 255.0).round() as u8));
        }
    }
    rgba
}

/// Draws a route, a park and a marker into every tile, once.
struct DemoScene {
    tiles: Vec<OverscaledTileId>,
    icon: Option<Arc<dyn Texture2D>>,
}

impl CustomDrawableLayerHost for DemoScene {
    fn initialize(&mut self) {
        log::info!("demo scene: {} tiles", self.tiles.len());
    }

    fn update(&mut self, interface: &mut Interface<'_>) {
        if interface.drawable_count() > 0 {
            return;
        }
        for (i, tile) in self.tiles.iter().enumerate() {
            interface.set_tile_id(*tile);

            let mut line = LineOptions { color: Color::new(0.8, 0.2, 0.1, 1.0), width: 6.0, ..Default::default() };
            line.geometry.join = LineJoinType::Round;
            line.geometry.begin_cap = LineCapType::Round;
            line.geometry.end_cap = LineCapType::Round;
            interface.set_line_options(line);
            interface.add_polyline(&[
                GeometryCoordinate::new(512, 512),
                GeometryCoordinate::new(4096, 1024 + 512 * i as i16),
                GeometryCoordinate::new(7680, 7168),
            ]);

            interface.set_fill_options(FillOptions { color: Color::green(), opacity: 0.4 });
            interface.add_fill(&vec![vec![
                GeometryCoordinate::new(1024, 4096),
                GeometryCoordinate::new(3072, 4096),
                GeometryCoordinate::new(3072, 6144),
                GeometryCoordinate::new(1024, 6144),
                GeometryCoordinate::new(1024, 4096),
            ]]);

            if let Some(icon) = &self.icon {
                interface.set_symbol_options(SymbolOptions {
                    texture: Some(icon.clone()),
                    size: [ICON_SIZE as f32; 2],
                    angle_degrees: 15.0 * i as f32,
                    ..Default::default()
                });
                interface.add_symbol(GeometryCoordinate::new(4096, 4096));
            }
        }
    }

    fn deinitialize(&mut self) {
        log::info!("demo scene: released");
    }
}

fn run(context: &mut dyn Context, shaders: &ShaderRegistry, frames: usize) -> Result<()> {
    let icon = match context.create_texture_2d(ICON_SIZE, ICON_SIZE, &icon_pixels()) {
        Ok(texture) => Some(texture),
        Err(err) => {
            log::warn!("icon texture unavailable, markers skipped: {err}");
            None
        }
    };
    let tiles = (0..2)
        .flat_map(|x| (0..2).map(move |y| OverscaledTileId::new(ZOOM, 7 + x, 5 + y)))
        .collect();

    let (width, height) = context.default_renderable().size();
    let mut state = TransformState::new(width, height).with_camera([0.5, 0.38], ZOOM as f64 + 0.5, 0.0, 0.0);

    let mut orchestrator = RenderOrchestrator::new();
    orchestrator.add_render_layer(Box::new(CustomDrawableLayer::new(
        "demo",
        0,
        Box::new(DemoScene { tiles, icon }),
    )));

    let mut renderer = Renderer::new(RendererConfig { clear_color: Color::white(), ..Default::default() });
    for frame in 0..frames {
        orchestrator.update_layers(shaders, context, &state);
        match renderer.render(&mut orchestrator, context, &state) {
            FrameStatus::Rendered(stats) => log::info!(
                "frame {frame}: {} drawables, {} passes, {} draw calls, {} live buffers",
                stats.drawables,
                stats.render_passes,
                stats.draw_calls,
                stats.live_buffers
            ),
            FrameStatus::Skipped => log::warn!("frame {frame}: skipped"),
            FrameStatus::ContextLost => bail!("GPU context lost at frame {frame}"),
        }
        state.set_bearing(state.bearing() + 10.0);
    }

    orchestrator.remove_render_layer("demo");
    orchestrator.process_changes();
    Ok(())
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());
    let options = parse_args()?;

    if options.wgpu {
        let init = gpu::WgpuInit { width: 800, height: 600, ..Default::default() };
        let mut context = gpu::WgpuContext::create(&init).context("wgpu backend unavailable")?;
        let shaders = gpu::builtin_shader_registry(context.device());
        run(&mut context, &shaders, options.frames)
    } else {
        let mut context = headless::HeadlessContext::new(800, 600);
        let shaders = headless::builtin_shader_registry();
        run(&mut context, &shaders, options.frames)?;
        for pass in context.passes() {
            log::info!("last frame: pass {} with {} draw calls", pass.name, pass.draw_calls);
        }
        Ok(())
    }
}
