use crate::renderer::PaintParameters;

use super::drawable::Drawable;

/// Per-frame strategy that refreshes a drawable's uniform buffers.
///
/// Implementations hold only properties captured at creation. `execute` must be
/// idempotent: same drawable state and parameters in, same bytes out. Tweakers that
/// depend on tile-relative transforms return early for drawables without a tile id.
pub trait DrawableTweaker: Send + Sync {
    /// Called once when the tweaker is attached.
    fn init(&self, _drawable: &mut Drawable) {}

    /// Called every frame before the drawable is uploaded and drawn.
    fn execute(&self, drawable: &mut Drawable, params: &PaintParameters);
}
