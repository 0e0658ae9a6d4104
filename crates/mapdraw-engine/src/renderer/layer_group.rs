use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::gfx::{Drawable, DrawableId, RenderPass, UniformBufferArray};
use crate::tile::OverscaledTileId;

use super::layer_tweaker::LayerTweaker;

/// Shared handle to a layer group. The orchestrator and the layer that fills the group
/// both hold one.
///
/// Groups are only touched on the render thread, but they ride in [`ChangeRequest`]s
/// built by worker threads, so the handle has to be `Send`. The lock is uncontended.
///
/// [`ChangeRequest`]: super::ChangeRequest
pub type LayerGroupRef = Arc<Mutex<dyn LayerGroupBase>>;

/// Drawable container for one style layer.
pub trait LayerGroupBase: Send {
    fn name(&self) -> &str;

    fn layer_index(&self) -> i32;

    /// Changing the index takes effect in the orchestrator after a
    /// `MarkLayerGroupOrderDirty` change is processed.
    fn set_layer_index(&mut self, index: i32);

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    fn drawable_count(&self) -> usize;

    fn observe_drawables(&self, f: &mut dyn FnMut(&Drawable));

    fn observe_drawables_mut(&mut self, f: &mut dyn FnMut(&mut Drawable));

    /// Visits every slot; slots the callback empties are erased in the same traversal.
    fn observe_drawables_retain(&mut self, f: &mut dyn FnMut(&mut Option<Box<Drawable>>));

    fn remove_drawable_by_id(&mut self, id: DrawableId) -> Option<Box<Drawable>>;

    /// Drops every drawable. Returns how many were removed.
    fn clear_drawables(&mut self) -> usize;

    /// Layer-wide uniform blocks. Copied into every drawable of the group before upload.
    fn uniform_buffers(&self) -> &UniformBufferArray;

    fn mutable_uniform_buffers(&mut self) -> &mut UniformBufferArray;

    fn layer_tweaker(&self) -> Option<Arc<dyn LayerTweaker>>;

    fn set_layer_tweaker(&mut self, tweaker: Option<Arc<dyn LayerTweaker>>);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Union of the passes of every drawable in the group.
    fn render_passes(&self) -> RenderPass {
        let mut passes = RenderPass::empty();
        self.observe_drawables(&mut |d| passes |= d.render_passes());
        passes
    }

    /// Writes the group's uniform blocks into each drawable.
    fn propagate_uniforms(&mut self) {
        if self.uniform_buffers().is_empty() {
            return;
        }
        let uniforms = self.uniform_buffers().clone();
        self.observe_drawables_mut(&mut |d| {
            let target = d.mutable_uniform_buffers();
            for (name, buffer) in uniforms.iter() {
                target.create_or_update_bytes(name, buffer.data());
            }
        });
    }
}

/// Locks a shared group, logging instead of panicking when the lock is poisoned.
pub fn lock_group(group: &LayerGroupRef) -> Option<MutexGuard<'_, dyn LayerGroupBase + 'static>> {
    match group.lock() {
        Ok(guard) => Some(guard),
        Err(_) => {
            log::error!("layer group lock poisoned; group skipped");
            None
        }
    }
}

/// State shared by both group flavours.
struct GroupCommon {
    name: String,
    layer_index: i32,
    enabled: bool,
    uniforms: UniformBufferArray,
    tweaker: Option<Arc<dyn LayerTweaker>>,
}

impl GroupCommon {
    fn new(layer_index: i32, name: &str) -> Self {
        Self {
            name: name.to_owned(),
            layer_index,
            enabled: true,
            uniforms: UniformBufferArray::new(),
            tweaker: None,
        }
    }
}

macro_rules! common_accessors {
    () => {
        fn name(&self) -> &str {
            &self.common.name
        }

        fn layer_index(&self) -> i32 {
            self.common.layer_index
        }

        fn set_layer_index(&mut self, index: i32) {
            self.common.layer_index = index;
        }

        fn is_enabled(&self) -> bool {
            self.common.enabled
        }

        fn set_enabled(&mut self, enabled: bool) {
            self.common.enabled = enabled;
        }

        fn uniform_buffers(&self) -> &UniformBufferArray {
            &self.common.uniforms
        }

        fn mutable_uniform_buffers(&mut self) -> &mut UniformBufferArray {
            &mut self.common.uniforms
        }

        fn layer_tweaker(&self) -> Option<Arc<dyn LayerTweaker>> {
            self.common.tweaker.clone()
        }

        fn set_layer_tweaker(&mut self, tweaker: Option<Arc<dyn LayerTweaker>>) {
            self.common.tweaker = tweaker;
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    };
}

fn retain_slots(list: &mut Vec<Box<Drawable>>, f: &mut dyn FnMut(&mut Option<Box<Drawable>>)) {
    let items = std::mem::take(list);
    list.reserve(items.len());
    for drawable in items {
        let mut slot = Some(drawable);
        f(&mut slot);
        if let Some(kept) = slot {
            list.push(kept);
        }
    }
}

// ── LayerGroup ──

/// Drawables of a layer that is not split into tiles.
pub struct LayerGroup {
    common: GroupCommon,
    drawables: Vec<Box<Drawable>>,
}

impl LayerGroup {
    pub fn new(layer_index: i32, capacity: usize, name: &str) -> Self {
        Self { common: GroupCommon::new(layer_index, name), drawables: Vec::with_capacity(capacity) }
    }

    pub fn add_drawable(&mut self, drawable: Box<Drawable>) {
        self.drawables.push(drawable);
    }

    #[inline]
    pub fn drawables(&self) -> &[Box<Drawable>] {
        &self.drawables
    }
}

impl LayerGroupBase for LayerGroup {
    common_accessors!();

    fn drawable_count(&self) -> usize {
        self.drawables.len()
    }

    fn observe_drawables(&self, f: &mut dyn FnMut(&Drawable)) {
        for d in &self.drawables {
            f(d);
        }
    }

    fn observe_drawables_mut(&mut self, f: &mut dyn FnMut(&mut Drawable)) {
        for d in &mut self.drawables {
            f(d);
        }
    }

    fn observe_drawables_retain(&mut self, f: &mut dyn FnMut(&mut Option<Box<Drawable>>)) {
        retain_slots(&mut self.drawables, f);
    }

    fn remove_drawable_by_id(&mut self, id: DrawableId) -> Option<Box<Drawable>> {
        let pos = self.drawables.iter().position(|d| d.id() == id)?;
        Some(self.drawables.remove(pos))
    }

    fn clear_drawables(&mut self) -> usize {
        let n = self.drawables.len();
        self.drawables.clear();
        n
    }
}

// ── TileLayerGroup ──

type TileKey = (RenderPass, OverscaledTileId);

/// Drawables of a tiled layer, keyed by render pass and tile.
///
/// One key may hold several drawables.
pub struct TileLayerGroup {
    common: GroupCommon,
    drawables: BTreeMap<TileKey, Vec<Box<Drawable>>>,
    count: usize,
}

impl TileLayerGroup {
    pub fn new(layer_index: i32, _capacity: usize, name: &str) -> Self {
        Self { common: GroupCommon::new(layer_index, name), drawables: BTreeMap::new(), count: 0 }
    }

    /// Stores `drawable` under `(pass, tile_id)`, tagging it with the tile and the pass.
    pub fn add_drawable(&mut self, pass: RenderPass, tile_id: OverscaledTileId, mut drawable: Box<Drawable>) {
        drawable.set_tile_id(Some(tile_id));
        drawable.set_render_passes(drawable.render_passes() | pass);
        self.drawables.entry((pass, tile_id)).or_default().push(drawable);
        self.count += 1;
    }

    /// First drawable stored under the key.
    pub fn drawable(&self, pass: RenderPass, tile_id: OverscaledTileId) -> Option<&Drawable> {
        self.drawables.get(&(pass, tile_id)).and_then(|list| list.first()).map(|d| d.as_ref())
    }

    /// Removes and returns every drawable stored under the key.
    pub fn remove_drawables(&mut self, pass: RenderPass, tile_id: OverscaledTileId) -> Vec<Box<Drawable>> {
        let removed = self.drawables.remove(&(pass, tile_id)).unwrap_or_default();
        self.count -= removed.len();
        removed
    }

    /// Visits the drawables of one tile across all passes.
    pub fn observe_tile_drawables(&mut self, tile_id: OverscaledTileId, f: &mut dyn FnMut(&mut Drawable)) {
        for ((_, tile), list) in self.drawables.iter_mut() {
            if *tile == tile_id {
                list.iter_mut().for_each(|d| f(d));
            }
        }
    }

    /// Distinct tiles with at least one drawable, in tile order.
    pub fn tile_ids(&self) -> Vec<OverscaledTileId> {
        let tiles: BTreeSet<_> = self.drawables.keys().map(|(_, tile)| *tile).collect();
        tiles.into_iter().collect()
    }
}

impl LayerGroupBase for TileLayerGroup {
    common_accessors!();

    fn drawable_count(&self) -> usize {
        self.count
    }

    fn observe_drawables(&self, f: &mut dyn FnMut(&Drawable)) {
        for list in self.drawables.values() {
            list.iter().for_each(|d| f(d));
        }
    }

    fn observe_drawables_mut(&mut self, f: &mut dyn FnMut(&mut Drawable)) {
        for list in self.drawables.values_mut() {
            list.iter_mut().for_each(|d| f(d));
        }
    }

    fn observe_drawables_retain(&mut self, f: &mut dyn FnMut(&mut Option<Box<Drawable>>)) {
        for list in self.drawables.values_mut() {
            retain_slots(list, f);
        }
        self.drawables.retain(|_, list| !list.is_empty());
        self.count = self.drawables.values().map(Vec::len).sum();
    }

    fn remove_drawable_by_id(&mut self, id: DrawableId) -> Option<Box<Drawable>> {
        let mut found = None;
        for (key, list) in self.drawables.iter_mut() {
            if let Some(pos) = list.iter().position(|d| d.id() == id) {
                found = Some((*key, list.remove(pos)));
                break;
            }
        }
        let (key, drawable) = found?;
        if self.drawables.get(&key).is_some_and(Vec::is_empty) {
            self.drawables.remove(&key);
        }
        self.count -= 1;
        Some(drawable)
    }

    fn clear_drawables(&mut self) -> usize {
        let n = self.count;
        self.drawables.clear();
        self.count = 0;
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::HeadlessDrawableImpl;

    fn drawable(name: &str) -> Box<Drawable> {
        Box::new(Drawable::new(name, Box::new(HeadlessDrawableImpl::default())))
    }

    const TILE_A: OverscaledTileId = OverscaledTileId::new(3, 1, 2);
    const TILE_B: OverscaledTileId = OverscaledTileId::new(3, 2, 2);

    // ── tile groups ──

    #[test]
    fn remove_drawables_returns_every_match() {
        let mut group = TileLayerGroup::new(0, 8, "tiles");
        for i in 0..3 {
            group.add_drawable(RenderPass::TRANSLUCENT, TILE_A, drawable(&format!("a{i}")));
        }
        group.add_drawable(RenderPass::TRANSLUCENT, TILE_B, drawable("b"));

        let removed = group.remove_drawables(RenderPass::TRANSLUCENT, TILE_A);
        assert_eq!(removed.len(), 3);
        assert!(group.drawable(RenderPass::TRANSLUCENT, TILE_A).is_none());
        assert!(group.remove_drawables(RenderPass::TRANSLUCENT, TILE_A).is_empty());
        assert_eq!(group.drawable_count(), 1);
    }

    #[test]
    fn add_tags_tile_and_pass() {
        let mut group = TileLayerGroup::new(0, 8, "tiles");
        group.add_drawable(RenderPass::OPAQUE, TILE_B, drawable("b"));
        let d = group.drawable(RenderPass::OPAQUE, TILE_B).unwrap();
        assert_eq!(d.tile_id(), Some(TILE_B));
        assert!(d.has_render_pass(RenderPass::OPAQUE));
        assert!(group.drawable(RenderPass::TRANSLUCENT, TILE_B).is_none());
    }

    #[test]
    fn retain_erases_cleared_slots() {
        let mut group = TileLayerGroup::new(0, 8, "tiles");
        group.add_drawable(RenderPass::TRANSLUCENT, TILE_A, drawable("keep"));
        group.add_drawable(RenderPass::TRANSLUCENT, TILE_A, drawable("drop"));
        group.add_drawable(RenderPass::TRANSLUCENT, TILE_B, drawable("drop"));

        let mut visited = 0;
        group.observe_drawables_retain(&mut |slot| {
            visited += 1;
            if slot.as_ref().is_some_and(|d| d.name() == "drop") {
                *slot = None;
            }
        });
        assert_eq!(visited, 3);
        assert_eq!(group.drawable_count(), 1);
        assert_eq!(group.tile_ids(), vec![TILE_A]);
    }

    #[test]
    fn remove_by_id_and_clear() {
        let mut group = TileLayerGroup::new(0, 8, "tiles");
        let d = drawable("x");
        let id = d.id();
        group.add_drawable(RenderPass::TRANSLUCENT, TILE_A, d);
        group.add_drawable(RenderPass::OPAQUE, TILE_A, drawable("y"));
        assert_eq!(group.remove_drawable_by_id(id).map(|d| d.id()), Some(id));
        assert!(group.remove_drawable_by_id(id).is_none());
        assert_eq!(group.clear_drawables(), 1);
        assert_eq!(group.drawable_count(), 0);
    }

    // ── plain groups ──

    #[test]
    fn group_uniforms_reach_drawables() {
        let mut group = LayerGroup::new(1, 4, "plain");
        group.add_drawable(drawable("a"));
        group.add_drawable(drawable("b"));
        group.mutable_uniform_buffers().create_or_update("LayerUBO", &[1.0f32, 2.0, 3.0, 4.0]);
        group.propagate_uniforms();
        group.observe_drawables(&mut |d| {
            assert_eq!(d.uniform_buffers().read::<[f32; 4]>("LayerUBO"), Some([1.0, 2.0, 3.0, 4.0]));
        });
    }

    #[test]
    fn render_passes_is_union() {
        let mut group = LayerGroup::new(1, 4, "plain");
        let mut a = drawable("a");
        a.set_render_passes(RenderPass::OPAQUE);
        let mut b = drawable("b");
        b.set_render_passes(RenderPass::PASS_3D);
        group.add_drawable(a);
        group.add_drawable(b);
        assert_eq!(group.render_passes(), RenderPass::OPAQUE | RenderPass::PASS_3D);
    }
}
