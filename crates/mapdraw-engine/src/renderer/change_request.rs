use core::fmt;

use crate::gfx::{Drawable, DrawableId, RenderPass};
use crate::tile::OverscaledTileId;

use super::layer_group::LayerGroupRef;

/// A deferred mutation of the orchestrator's state.
///
/// Produced by layers during update (or by worker threads through the change sender) and
/// applied in submission order by `RenderOrchestrator::process_changes`.
pub enum ChangeRequest {
    AddLayerGroup { group: LayerGroupRef, replace: bool },
    RemoveLayerGroup { layer_index: i32 },
    /// Adds a standalone drawable to the global registry.
    AddDrawable(Box<Drawable>),
    /// Adds a drawable to the tile layer group at `layer_index`.
    AddTileDrawable {
        layer_index: i32,
        pass: RenderPass,
        tile_id: OverscaledTileId,
        drawable: Box<Drawable>,
    },
    /// Removes a drawable from the registry or from whichever group holds it.
    RemoveDrawable(DrawableId),
    /// Re-sort layer groups by index once the batch is applied.
    MarkLayerGroupOrderDirty,
}

impl fmt::Debug for ChangeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeRequest::AddLayerGroup { replace, .. } => {
                f.debug_struct("AddLayerGroup").field("replace", replace).finish_non_exhaustive()
            }
            ChangeRequest::RemoveLayerGroup { layer_index } => {
                f.debug_struct("RemoveLayerGroup").field("layer_index", layer_index).finish()
            }
            ChangeRequest::AddDrawable(d) => f.debug_tuple("AddDrawable").field(&d.id()).finish(),
            ChangeRequest::AddTileDrawable { layer_index, pass, tile_id, drawable } => f
                .debug_struct("AddTileDrawable")
                .field("layer_index", layer_index)
                .field("pass", pass)
                .field("tile_id", tile_id)
                .field("drawable", &drawable.id())
                .finish(),
            ChangeRequest::RemoveDrawable(id) => f.debug_tuple("RemoveDrawable").field(id).finish(),
            ChangeRequest::MarkLayerGroupOrderDirty => f.write_str("MarkLayerGroupOrderDirty"),
        }
    }
}
