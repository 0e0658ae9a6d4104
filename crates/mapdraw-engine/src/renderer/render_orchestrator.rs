use std::collections::BTreeMap;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::gfx::{Context, Drawable, DrawableId, DrawableLessByPriority, ShaderRegistry};
use crate::map::TransformState;

use super::change_request::ChangeRequest;
use super::layer_group::{LayerGroupBase, LayerGroupRef, TileLayerGroup, lock_group};
use super::render_layer::{LayerUpdateParameters, RenderLayer};

/// Owns the frame's drawable state: layer groups in layer order, standalone drawables,
/// render layers and the queue of pending changes.
///
/// Everything here is touched from the render thread only. Other threads talk to it
/// through [`change_sender`](Self::change_sender).
pub struct RenderOrchestrator {
    layer_groups: Vec<LayerGroupRef>,
    order_dirty: bool,
    drawables: BTreeMap<DrawableId, Box<Drawable>>,
    render_layers: Vec<Box<dyn RenderLayer>>,
    change_tx: Sender<ChangeRequest>,
    change_rx: Receiver<ChangeRequest>,
    context_lost: bool,
}

impl Default for RenderOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderOrchestrator {
    pub fn new() -> Self {
        let (change_tx, change_rx) = crossbeam_channel::unbounded();
        Self {
            layer_groups: Vec::new(),
            order_dirty: false,
            drawables: BTreeMap::new(),
            render_layers: Vec::new(),
            change_tx,
            change_rx,
            context_lost: false,
        }
    }

    // ── changes ──

    /// Queue endpoint for producers on other threads.
    pub fn change_sender(&self) -> Sender<ChangeRequest> {
        self.change_tx.clone()
    }

    pub fn add_changes(&self, changes: impl IntoIterator<Item = ChangeRequest>) {
        for change in changes {
            if self.change_tx.send(change).is_err() {
                log::error!("RenderOrchestrator: change queue closed");
                return;
            }
        }
    }

    /// Applies every queued change in submission order, then re-sorts layer groups once
    /// if any change asked for it. Returns the number of changes applied.
    pub fn process_changes(&mut self) -> usize {
        let pending: Vec<ChangeRequest> = self.change_rx.try_iter().collect();
        let applied = pending.len();
        for change in pending {
            self.apply(change);
        }
        if self.order_dirty {
            self.sort_layer_groups();
            self.order_dirty = false;
        }
        if applied > 0 {
            log::debug!("RenderOrchestrator: applied {applied} changes");
        }
        applied
    }

    fn apply(&mut self, change: ChangeRequest) {
        match change {
            ChangeRequest::AddLayerGroup { group, replace } => {
                self.add_layer_group(group, replace);
            }
            ChangeRequest::RemoveLayerGroup { layer_index } => {
                self.remove_layer_group(layer_index);
            }
            ChangeRequest::AddDrawable(drawable) => self.add_drawable(drawable),
            ChangeRequest::AddTileDrawable { layer_index, pass, tile_id, drawable } => {
                let Some(group) = self.layer_group(layer_index) else {
                    log::warn!("RenderOrchestrator: no layer group at index {layer_index}; drawable dropped");
                    return;
                };
                let Some(mut guard) = lock_group(&group) else { return };
                match guard.as_any_mut().downcast_mut::<TileLayerGroup>() {
                    Some(tiles) => tiles.add_drawable(pass, tile_id, drawable),
                    None => log::warn!(
                        "RenderOrchestrator: layer group {} is not tiled; drawable dropped",
                        guard.name()
                    ),
                }
            }
            ChangeRequest::RemoveDrawable(id) => {
                self.remove_drawable(id);
            }
            ChangeRequest::MarkLayerGroupOrderDirty => self.order_dirty = true,
        }
    }

    // ── drawables ──

    pub fn add_drawable(&mut self, drawable: Box<Drawable>) {
        self.drawables.insert(drawable.id(), drawable);
    }

    /// Removes `id` from the registry, or failing that from the first group holding it.
    pub fn remove_drawable(&mut self, id: DrawableId) -> Option<Box<Drawable>> {
        if let Some(d) = self.drawables.remove(&id) {
            return Some(d);
        }
        for group in &self.layer_groups {
            let Some(mut guard) = lock_group(group) else { continue };
            if let Some(d) = guard.remove_drawable_by_id(id) {
                return Some(d);
            }
        }
        None
    }

    /// Looks up a standalone drawable.
    pub fn drawable(&self, id: DrawableId) -> Option<&Drawable> {
        self.drawables.get(&id).map(|d| d.as_ref())
    }

    pub fn drawable_mut(&mut self, id: DrawableId) -> Option<&mut Drawable> {
        self.drawables.get_mut(&id).map(|d| d.as_mut())
    }

    /// `true` if `id` is in the registry or in any layer group.
    pub fn contains_drawable(&self, id: DrawableId) -> bool {
        if self.drawables.contains_key(&id) {
            return true;
        }
        self.layer_groups.iter().any(|group| {
            let Some(guard) = lock_group(group) else { return false };
            let mut found = false;
            guard.observe_drawables(&mut |d| found |= d.id() == id);
            found
        })
    }

    #[inline]
    pub fn num_drawables(&self) -> usize {
        self.drawables.len()
    }

    /// Standalone drawables in draw order.
    pub fn sorted_drawables(&self) -> Vec<&Drawable> {
        let cmp = DrawableLessByPriority::default();
        let mut list: Vec<&Drawable> = self.drawables.values().map(|d| d.as_ref()).collect();
        list.sort_by(|a, b| cmp.compare(Some(*a), Some(*b)));
        list
    }

    pub fn observe_drawables_mut(&mut self, mut f: impl FnMut(&mut Drawable)) {
        for d in self.drawables.values_mut() {
            f(d);
        }
    }

    // ── layer groups ──

    /// Inserts `group` after any group with the same or lower index.
    ///
    /// With `replace`, a group already at that index is swapped out instead. Returns
    /// `false` if this exact group is already registered.
    pub fn add_layer_group(&mut self, group: LayerGroupRef, replace: bool) -> bool {
        if self.layer_groups.iter().any(|g| Arc::ptr_eq(g, &group)) {
            return false;
        }
        let Some(index) = lock_group(&group).map(|g| g.layer_index()) else { return false };

        if replace {
            if let Some(slot) = self.layer_groups.iter_mut().find(|g| group_index(g) == Some(index)) {
                *slot = group;
                return true;
            }
        }
        let pos = self.layer_groups.partition_point(|g| group_index(g).is_some_and(|i| i <= index));
        self.layer_groups.insert(pos, group);
        true
    }

    /// Removes the first group at `layer_index`.
    pub fn remove_layer_group(&mut self, layer_index: i32) -> Option<LayerGroupRef> {
        let pos = self.layer_groups.iter().position(|g| group_index(g) == Some(layer_index))?;
        Some(self.layer_groups.remove(pos))
    }

    pub fn layer_group(&self, layer_index: i32) -> Option<LayerGroupRef> {
        self.layer_groups.iter().find(|g| group_index(g) == Some(layer_index)).cloned()
    }

    /// Visits groups in ascending layer order.
    pub fn observe_layer_groups(&self, mut f: impl FnMut(&mut dyn LayerGroupBase)) {
        for group in &self.layer_groups {
            let Some(mut guard) = lock_group(group) else { continue };
            f(&mut *guard);
        }
    }

    /// Groups in ascending layer order.
    #[inline]
    pub fn layer_groups(&self) -> &[LayerGroupRef] {
        &self.layer_groups
    }

    #[inline]
    pub fn num_layer_groups(&self) -> usize {
        self.layer_groups.len()
    }

    fn sort_layer_groups(&mut self) {
        self.layer_groups.sort_by_cached_key(|g| group_index(g).unwrap_or(i32::MAX));
    }

    // ── render layers ──

    pub fn add_render_layer(&mut self, layer: Box<dyn RenderLayer>) {
        self.render_layers.push(layer);
    }

    /// Removes the layer with `id` and queues removal of its group.
    pub fn remove_render_layer(&mut self, id: &str) -> bool {
        let Some(pos) = self.render_layers.iter().position(|l| l.id() == id) else { return false };
        let layer = self.render_layers.remove(pos);
        if let Some(index) = layer.layer_group().and_then(|g| group_index(&g)) {
            self.add_changes([ChangeRequest::RemoveLayerGroup { layer_index: index }]);
        }
        true
    }

    #[inline]
    pub fn num_render_layers(&self) -> usize {
        self.render_layers.len()
    }

    /// Lets every render layer rebuild what changed. Their changes are queued for the next
    /// [`process_changes`](Self::process_changes).
    pub fn update_layers(&mut self, shaders: &ShaderRegistry, context: &dyn Context, state: &TransformState) {
        let mut changes = Vec::new();
        for layer in &mut self.render_layers {
            let mut params = LayerUpdateParameters { shaders, context, state, changes: &mut changes };
            layer.update(&mut params);
        }
        self.add_changes(changes);
    }

    // ── lifecycle ──

    pub fn mark_context_lost(&mut self) {
        if !self.context_lost {
            log::warn!("RenderOrchestrator: GPU context lost; frames will be skipped");
        }
        self.context_lost = true;
    }

    #[inline]
    pub fn is_context_lost(&self) -> bool {
        self.context_lost
    }

    /// Drops backend caches and spare registry capacity between frames.
    pub fn reduce_memory_use(&mut self, context: &mut dyn Context) {
        context.reduce_memory_usage();
        self.layer_groups.shrink_to_fit();
        self.render_layers.shrink_to_fit();
    }

    /// Releases every group, drawable, layer and pending change.
    pub fn clear_data(&mut self) {
        for _ in self.change_rx.try_iter() {}
        self.layer_groups.clear();
        self.drawables.clear();
        self.render_layers.clear();
        self.order_dirty = false;
    }
}

fn group_index(group: &LayerGroupRef) -> Option<i32> {
    lock_group(group).map(|g| g.layer_index())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::backend::headless::HeadlessDrawableImpl;
    use crate::gfx::RenderPass;
    use crate::renderer::LayerGroup;
    use crate::tile::OverscaledTileId;

    fn drawable(name: &str) -> Box<Drawable> {
        Box::new(Drawable::new(name, Box::new(HeadlessDrawableImpl::default())))
    }

    fn tile_group(index: i32) -> LayerGroupRef {
        Arc::new(Mutex::new(TileLayerGroup::new(index, 8, &format!("tiles-{index}"))))
    }

    fn indices(o: &RenderOrchestrator) -> Vec<i32> {
        o.layer_groups().iter().filter_map(group_index).collect()
    }

    // ── change batches ──

    #[test]
    fn add_then_remove_in_one_batch_leaves_nothing() {
        let mut o = RenderOrchestrator::new();
        let group = tile_group(1);
        let d = drawable("tile-a");
        let id = d.id();
        o.add_changes([
            ChangeRequest::AddLayerGroup { group: group.clone(), replace: false },
            ChangeRequest::AddTileDrawable {
                layer_index: 1,
                pass: RenderPass::TRANSLUCENT,
                tile_id: OverscaledTileId::new(2, 1, 1),
                drawable: d,
            },
            ChangeRequest::RemoveDrawable(id),
        ]);
        assert_eq!(o.process_changes(), 3);
        assert!(o.drawable(id).is_none());
        assert!(!o.contains_drawable(id));
        assert_eq!(group.lock().unwrap().drawable_count(), 0);
        assert_eq!(o.num_layer_groups(), 1);
    }

    #[test]
    fn changes_from_other_threads_apply_in_order() {
        let mut o = RenderOrchestrator::new();
        let tx = o.change_sender();
        let d = drawable("worker");
        let id = d.id();
        std::thread::spawn(move || {
            tx.send(ChangeRequest::AddDrawable(d)).unwrap();
        })
        .join()
        .unwrap();
        o.process_changes();
        assert!(o.drawable(id).is_some());
        o.add_changes([ChangeRequest::RemoveDrawable(id)]);
        o.process_changes();
        assert_eq!(o.num_drawables(), 0);
    }

    #[test]
    fn worker_built_group_is_registered_on_the_render_thread() {
        let mut o = RenderOrchestrator::new();
        let tx = o.change_sender();
        std::thread::spawn(move || {
            let group = tile_group(4);
            if let Some(mut g) = lock_group(&group) {
                g.set_enabled(false);
            }
            tx.send(ChangeRequest::AddLayerGroup { group, replace: false }).unwrap();
        })
        .join()
        .unwrap();
        assert_eq!(o.process_changes(), 1);
        let group = o.layer_group(4).unwrap();
        assert!(!group.lock().unwrap().is_enabled());
    }

    // ── layer order ──

    #[test]
    fn groups_stay_in_index_order() {
        let mut o = RenderOrchestrator::new();
        for i in [3, 1, 2] {
            assert!(o.add_layer_group(tile_group(i), false));
        }
        assert_eq!(indices(&o), vec![1, 2, 3]);
    }

    #[test]
    fn reorder_happens_once_per_batch() {
        let mut o = RenderOrchestrator::new();
        let a = tile_group(1);
        let b = tile_group(2);
        o.add_layer_group(a.clone(), false);
        o.add_layer_group(b.clone(), false);
        a.lock().unwrap().set_layer_index(5);
        assert_eq!(indices(&o), vec![5, 2]);
        o.add_changes([ChangeRequest::MarkLayerGroupOrderDirty]);
        o.process_changes();
        assert_eq!(indices(&o), vec![2, 5]);
        assert!(Arc::ptr_eq(&o.layer_groups()[1], &a));
    }

    #[test]
    fn duplicate_group_is_rejected_and_replace_swaps() {
        let mut o = RenderOrchestrator::new();
        let a = tile_group(1);
        assert!(o.add_layer_group(a.clone(), false));
        assert!(!o.add_layer_group(a.clone(), false));
        let plain: LayerGroupRef = Arc::new(Mutex::new(LayerGroup::new(1, 4, "plain")));
        assert!(o.add_layer_group(plain.clone(), true));
        assert_eq!(o.num_layer_groups(), 1);
        assert!(Arc::ptr_eq(&o.layer_group(1).unwrap(), &plain));
        assert!(o.remove_layer_group(1).is_some());
        assert!(o.layer_group(1).is_none());
    }

    // ── registry ──

    #[test]
    fn sorted_drawables_follow_priority_then_id() {
        let mut o = RenderOrchestrator::new();
        let mut hi = drawable("hi");
        hi.set_draw_priority(10);
        let lo1 = drawable("lo1");
        let lo2 = drawable("lo2");
        o.add_drawable(hi);
        o.add_drawable(lo2);
        o.add_drawable(lo1);
        let names: Vec<_> = o.sorted_drawables().iter().map(|d| d.name().to_owned()).collect();
        assert_eq!(names, ["lo1", "lo2", "hi"]);
    }

    #[test]
    fn clear_data_drops_everything() {
        let mut o = RenderOrchestrator::new();
        o.add_layer_group(tile_group(1), false);
        o.add_drawable(drawable("x"));
        o.add_changes([ChangeRequest::AddDrawable(drawable("queued"))]);
        o.mark_context_lost();
        o.clear_data();
        assert_eq!(o.process_changes(), 0);
        assert_eq!(o.num_layer_groups(), 0);
        assert_eq!(o.num_drawables(), 0);
        assert!(o.is_context_lost());
    }
}
