//! [`Context`](crate::gfx::Context) implementations.
//!
//! - [`headless`] records draw calls in memory; no GPU needed.
//! - [`wgpu`] renders into an offscreen target through wgpu.

mod counters;

pub mod headless;
pub mod wgpu;
