//! Frame-level rendering: layer groups, the orchestrator that owns them, the tweakers that
//! refresh their uniforms and the [`Renderer`] that runs a frame.
//!
//! Layers never touch orchestrator state directly. They queue [`ChangeRequest`]s, which
//! are applied at the start of the next frame.

mod change_request;
mod frame;
mod layer_group;
mod layer_tweaker;
pub mod layers;
mod line_atlas;
mod paint_parameters;
mod render_layer;
mod render_orchestrator;
mod tile_matrix;

pub use change_request::ChangeRequest;
pub use frame::{FrameStatus, Renderer, RendererConfig};
pub use layer_group::{LayerGroup, LayerGroupBase, LayerGroupRef, TileLayerGroup, lock_group};
pub use layer_tweaker::LayerTweaker;
pub use line_atlas::{LineAtlas, LinePatternPos};
pub use paint_parameters::{CrossfadeParameters, DEPTH_EPSILON, NUM_SUBLAYERS, PaintParameters};
pub use render_layer::{LayerUpdateParameters, RenderLayer};
pub use render_orchestrator::RenderOrchestrator;
pub use tile_matrix::{TileMatrixTweaker, TranslateAnchor, get_tile_matrix, translate_vtx_matrix};
