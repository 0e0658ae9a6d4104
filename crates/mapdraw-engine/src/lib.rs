//! mapdraw engine crate.
//!
//! A backend-neutral drawable pipeline for tiled maps: layers build [`gfx::Drawable`]s,
//! group them per tile in layer groups owned by the [`renderer::RenderOrchestrator`], and
//! the [`renderer::Renderer`] uploads and draws them through a [`gfx::Context`] backend.

pub mod backend;
pub mod gfx;
pub mod logging;
pub mod map;
pub mod paint;
pub mod renderer;
pub mod shaders;
pub mod style;
pub mod tile;
