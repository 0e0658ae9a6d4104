use core::cmp::Ordering;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::paint::Color;
use crate::renderer::PaintParameters;
use crate::tile::OverscaledTileId;

use super::drawable_tweaker::DrawableTweaker;
use super::error::GfxError;
use super::identity::DrawableId;
use super::render_pass::{RenderPass, RenderPassEncoder};
use super::segment::DrawSegment;
use super::shader::ShaderProgram;
use super::texture::{Texture2D, TextureAttachment};
use super::types::{BufferUsage, ColorMode, CullFaceMode, DepthMaskType};
use super::uniform_buffer::UniformBufferArray;
use super::upload_pass::{BufferResource, UploadPass};
use super::vertex_attribute::{AttributeBinding, AttributeValue, VertexAttributeArray};

/// Default name of the per-vertex color attribute.
pub const COLOR_ATTRIBUTE: &str = "a_color";

/// Cap style baked into a line pattern lookup.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum LinePatternCap {
    #[default]
    Square,
    Round,
}

/// Extra data a layer attaches to its drawables.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawableData {
    Line { pattern_cap: LinePatternCap },
}

/// GPU buffers built for a drawable during upload.
#[derive(Default)]
pub struct DrawableResources {
    pub index_buffer: Option<Box<dyn BufferResource>>,
    pub vertex_buffer: Option<Box<dyn BufferResource>>,
    pub attribute_bindings: Vec<AttributeBinding>,
    pub uniform_buffers: BTreeMap<String, Box<dyn BufferResource>>,
    /// Bumped whenever a buffer is replaced; backends key derived state (bind groups) on it.
    pub generation: u64,
}

/// Backend half of a drawable.
///
/// Created by the backend's builder; holds whatever derived state the backend needs
/// (bind groups, vertex layouts) on top of [`DrawableResources`].
pub trait DrawableImpl: Send {
    /// Called at the end of [`Drawable::upload`] once buffers are current.
    fn upload(
        &mut self,
        _upload_pass: &mut dyn UploadPass,
        _resources: &DrawableResources,
        _shader: &Arc<dyn ShaderProgram>,
        _textures: &[TextureAttachment],
    ) -> Result<(), GfxError> {
        Ok(())
    }

    /// Records one draw call per segment of `drawable`.
    fn draw(&self, drawable: &Drawable, params: &PaintParameters, encoder: &mut dyn RenderPassEncoder);

    /// Releases backend handles. Called once when the drawable is dropped.
    fn release(&mut self) {}

    fn as_any(&self) -> &dyn Any;
}

/// One GPU draw unit: geometry, fixed-function state, shader and uniform data.
pub struct Drawable {
    id: DrawableId,
    name: String,
    shader: Option<Arc<dyn ShaderProgram>>,
    render_passes: RenderPass,
    tile_id: Option<OverscaledTileId>,
    draw_priority: i64,
    sub_layer_index: i32,
    line_width: f32,
    depth_type: DepthMaskType,
    cull_face: CullFaceMode,
    color_mode: ColorMode,
    enabled: bool,
    sub_type: u8,
    data: Option<DrawableData>,
    color_attr_name: String,

    textures: Vec<TextureAttachment>,
    textures_dirty: bool,
    vertex_attrs: VertexAttributeArray,
    uniform_buffers: UniformBufferArray,
    tweakers: Vec<Arc<dyn DrawableTweaker>>,

    vertex_count: usize,
    indexes: Vec<u16>,
    segments: Vec<DrawSegment>,
    geometry_dirty: bool,
    usage: BufferUsage,

    resources: DrawableResources,
    imp: Box<dyn DrawableImpl>,
}

impl Drawable {
    pub fn new(name: impl Into<String>, imp: Box<dyn DrawableImpl>) -> Self {
        Self {
            id: DrawableId::next(),
            name: name.into(),
            shader: None,
            render_passes: RenderPass::empty(),
            tile_id: None,
            draw_priority: 0,
            sub_layer_index: 0,
            line_width: 1.0,
            depth_type: DepthMaskType::ReadOnly,
            cull_face: CullFaceMode::disabled(),
            color_mode: ColorMode::alpha_blended(),
            enabled: true,
            sub_type: 0,
            data: None,
            color_attr_name: COLOR_ATTRIBUTE.to_owned(),
            textures: Vec::new(),
            textures_dirty: false,
            vertex_attrs: VertexAttributeArray::new(),
            uniform_buffers: UniformBufferArray::new(),
            tweakers: Vec::new(),
            vertex_count: 0,
            indexes: Vec::new(),
            segments: Vec::new(),
            geometry_dirty: true,
            usage: BufferUsage::StaticDraw,
            resources: DrawableResources::default(),
            imp,
        }
    }

    // ── identity & state ──

    #[inline]
    pub fn id(&self) -> DrawableId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[inline]
    pub fn shader(&self) -> Option<&Arc<dyn ShaderProgram>> {
        self.shader.as_ref()
    }

    pub fn set_shader(&mut self, shader: Option<Arc<dyn ShaderProgram>>) {
        self.shader = shader;
        self.geometry_dirty = true;
    }

    #[inline]
    pub fn render_passes(&self) -> RenderPass {
        self.render_passes
    }

    pub fn set_render_passes(&mut self, passes: RenderPass) {
        self.render_passes = passes;
    }

    /// `true` if any bit of `mask` is set on this drawable.
    #[inline]
    pub fn has_render_pass(&self, mask: RenderPass) -> bool {
        self.render_passes.intersects(mask)
    }

    /// `true` if every bit of `mask` is set on this drawable.
    #[inline]
    pub fn has_all_render_passes(&self, mask: RenderPass) -> bool {
        self.render_passes.contains(mask)
    }

    #[inline]
    pub fn tile_id(&self) -> Option<OverscaledTileId> {
        self.tile_id
    }

    pub fn set_tile_id(&mut self, tile_id: Option<OverscaledTileId>) {
        self.tile_id = tile_id;
    }

    #[inline]
    pub fn draw_priority(&self) -> i64 {
        self.draw_priority
    }

    pub fn set_draw_priority(&mut self, priority: i64) {
        self.draw_priority = priority;
    }

    #[inline]
    pub fn sub_layer_index(&self) -> i32 {
        self.sub_layer_index
    }

    pub fn set_sub_layer_index(&mut self, index: i32) {
        self.sub_layer_index = index;
    }

    #[inline]
    pub fn line_width(&self) -> f32 {
        self.line_width
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.line_width = width;
    }

    #[inline]
    pub fn depth_type(&self) -> DepthMaskType {
        self.depth_type
    }

    pub fn set_depth_type(&mut self, depth_type: DepthMaskType) {
        self.depth_type = depth_type;
    }

    #[inline]
    pub fn cull_face_mode(&self) -> CullFaceMode {
        self.cull_face
    }

    pub fn set_cull_face_mode(&mut self, mode: CullFaceMode) {
        self.cull_face = mode;
    }

    #[inline]
    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    pub fn set_color_mode(&mut self, mode: ColorMode) {
        self.color_mode = mode;
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Layer-specific variant tag (e.g. the line type a line tweaker dispatches on).
    #[inline]
    pub fn sub_type(&self) -> u8 {
        self.sub_type
    }

    pub fn set_sub_type(&mut self, sub_type: u8) {
        self.sub_type = sub_type;
    }

    #[inline]
    pub fn data(&self) -> Option<&DrawableData> {
        self.data.as_ref()
    }

    pub fn set_data(&mut self, data: Option<DrawableData>) {
        self.data = data;
    }

    pub fn set_color_attr_name(&mut self, name: impl Into<String>) {
        self.color_attr_name = name.into();
    }

    // ── textures ──

    #[inline]
    pub fn textures(&self) -> &[TextureAttachment] {
        &self.textures
    }

    pub fn texture(&self, location: i32) -> Option<&Arc<dyn Texture2D>> {
        self.textures.iter().find(|t| t.location == location).map(|t| &t.texture)
    }

    /// Attaches `texture` at `location`, replacing any texture already bound there.
    pub fn set_texture(&mut self, texture: Arc<dyn Texture2D>, location: i32) {
        match self.textures.iter_mut().find(|t| t.location == location) {
            Some(existing) => {
                if Arc::ptr_eq(&existing.texture, &texture) {
                    return;
                }
                existing.texture = texture;
            }
            None => self.textures.push(TextureAttachment { texture, location }),
        }
        self.textures_dirty = true;
    }

    pub fn remove_texture(&mut self, location: i32) -> Option<Arc<dyn Texture2D>> {
        let pos = self.textures.iter().position(|t| t.location == location)?;
        self.textures_dirty = true;
        Some(self.textures.remove(pos).texture)
    }

    pub fn set_textures(&mut self, textures: Vec<TextureAttachment>) {
        self.textures.clear();
        for t in textures {
            self.set_texture(t.texture, t.location);
        }
        self.textures_dirty = true;
    }

    // ── vertex attributes & geometry ──

    #[inline]
    pub fn vertex_attributes(&self) -> &VertexAttributeArray {
        &self.vertex_attrs
    }

    /// Replaces the attribute overrides; geometry is rebuilt on the next upload.
    pub fn set_vertex_attributes(&mut self, attrs: VertexAttributeArray) {
        self.vertex_attrs = attrs;
        self.geometry_dirty = true;
    }

    /// Mutable access; attribute writes set the per-attribute dirty flags the upload reads.
    #[inline]
    pub fn mutable_vertex_attributes(&mut self) -> &mut VertexAttributeArray {
        &mut self.vertex_attrs
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count.max(self.vertex_attrs.max_count())
    }

    pub fn set_vertex_count(&mut self, count: usize) {
        self.vertex_count = count;
        self.geometry_dirty = true;
    }

    #[inline]
    pub fn indexes(&self) -> &[u16] {
        &self.indexes
    }

    #[inline]
    pub fn segments(&self) -> &[DrawSegment] {
        &self.segments
    }

    pub fn set_index_data(&mut self, indexes: Vec<u16>, segments: Vec<DrawSegment>) {
        self.indexes = indexes;
        self.segments = segments;
        self.geometry_dirty = true;
    }

    pub fn set_buffer_usage(&mut self, usage: BufferUsage) {
        self.usage = usage;
    }

    /// Converts a color into the normalized RGBA stored in the color attribute.
    ///
    /// `Color::to_array` yields rgb scaled to `0..255` and alpha in `0..1`.
    pub fn color_attr_rgba(color: Color) -> [f32; 4] {
        let c = color.to_array();
        [(c[0] / 255.0) as f32, (c[1] / 255.0) as f32, (c[2] / 255.0) as f32, c[3] as f32]
    }

    /// Rewrites every entry of the color attribute with `color`.
    ///
    /// No-op when the drawable has no color attribute.
    pub fn reset_color(&mut self, color: Color) {
        let vertex_count = self.vertex_count();
        let Some(attr) = self.vertex_attrs.get_mut(&self.color_attr_name) else { return };
        let count = match attr.count() {
            0 => vertex_count,
            n => n,
        };
        attr.fill(AttributeValue::Float4(Self::color_attr_rgba(color)), count);
    }

    // ── uniform buffers ──

    #[inline]
    pub fn uniform_buffers(&self) -> &UniformBufferArray {
        &self.uniform_buffers
    }

    #[inline]
    pub fn mutable_uniform_buffers(&mut self) -> &mut UniformBufferArray {
        &mut self.uniform_buffers
    }

    // ── tweakers ──

    /// Attaches a tweaker, running its one-time `init` against this drawable.
    pub fn add_tweaker(&mut self, tweaker: Arc<dyn DrawableTweaker>) {
        tweaker.init(self);
        self.tweakers.push(tweaker);
    }

    #[inline]
    pub fn tweakers(&self) -> &[Arc<dyn DrawableTweaker>] {
        &self.tweakers
    }

    pub fn clear_tweakers(&mut self) {
        self.tweakers.clear();
    }

    /// Runs every attached tweaker in attach order.
    pub fn run_tweakers(&mut self, params: &PaintParameters) {
        if self.tweakers.is_empty() {
            return;
        }
        // Detach the list while tweakers hold `&mut self`; neither swap allocates.
        let tweakers = std::mem::take(&mut self.tweakers);
        for tweaker in &tweakers {
            tweaker.execute(self, params);
        }
        let added = std::mem::replace(&mut self.tweakers, tweakers);
        self.tweakers.extend(added);
    }

    // ── upload & draw ──

    #[inline]
    pub fn resources(&self) -> &DrawableResources {
        &self.resources
    }

    #[inline]
    pub fn imp(&self) -> &dyn DrawableImpl {
        self.imp.as_ref()
    }

    /// `true` if the next upload has to rebuild vertex or index buffers.
    pub fn needs_geometry_upload(&self) -> bool {
        self.geometry_dirty || self.vertex_attrs.is_dirty() || self.resources.vertex_buffer.is_none()
    }

    /// Pushes dirty CPU-side state to the GPU.
    ///
    /// Without a shader there is nothing to bind against and the call is a no-op.
    pub fn upload(&mut self, upload_pass: &mut dyn UploadPass) -> Result<(), GfxError> {
        let Some(shader) = self.shader.clone() else { return Ok(()) };

        let mut changed = self.textures_dirty;

        if self.needs_geometry_upload() {
            let index_buffer = if self.indexes.is_empty() {
                None
            } else {
                Some(upload_pass.create_index_buffer_resource(
                    bytemuck::cast_slice(&self.indexes),
                    self.usage,
                )?)
            };
            let (bindings, vertex_buffer) = upload_pass.build_attribute_bindings(
                self.vertex_count(),
                shader.vertex_attributes(),
                &self.vertex_attrs,
                self.usage,
            )?;
            self.resources.index_buffer = index_buffer;
            self.resources.vertex_buffer = vertex_buffer;
            self.resources.attribute_bindings = bindings;
            self.vertex_attrs.clear_dirty();
            self.geometry_dirty = false;
            changed = true;
        }

        for (name, buffer) in self.uniform_buffers.iter() {
            let existing = self.resources.uniform_buffers.get(name);
            match existing {
                Some(resource) if resource.size() == buffer.size() => {
                    if buffer.is_dirty() {
                        upload_pass.update_buffer_resource(resource.as_ref(), buffer.data())?;
                    }
                }
                _ => {
                    let resource = upload_pass.create_uniform_buffer_resource(buffer.data())?;
                    self.resources.uniform_buffers.insert(name.to_owned(), resource);
                    changed = true;
                }
            }
        }
        self.uniform_buffers.clear_dirty();

        if changed {
            self.resources.generation = self.resources.generation.wrapping_add(1);
        }
        self.imp.upload(upload_pass, &self.resources, &shader, &self.textures)?;
        self.textures_dirty = false;
        Ok(())
    }

    /// Issues the backend draw calls for every segment.
    ///
    /// The caller binds pass-level state through `Context::setup_draw` first.
    pub fn draw(&self, params: &PaintParameters, encoder: &mut dyn RenderPassEncoder) {
        if !self.enabled || self.shader.is_none() || self.segments.is_empty() {
            return;
        }
        self.imp.draw(self, params, encoder);
    }
}

impl Drop for Drawable {
    fn drop(&mut self) {
        self.imp.release();
    }
}

impl core::fmt::Debug for Drawable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Drawable")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("render_passes", &self.render_passes)
            .field("tile_id", &self.tile_id)
            .field("draw_priority", &self.draw_priority)
            .field("vertex_count", &self.vertex_count())
            .field("segments", &self.segments.len())
            .finish()
    }
}

/// Draw-order comparator.
///
/// Ordering rules:
/// 1) absent drawables before present ones, in both directions
/// 2) draw priority, ascending or descending per `descending`
/// 3) id ascending, regardless of direction
#[derive(Debug, Copy, Clone, Default)]
pub struct DrawableLessByPriority {
    pub descending: bool,
}

impl DrawableLessByPriority {
    pub const fn new(descending: bool) -> Self {
        Self { descending }
    }

    pub fn compare(&self, a: Option<&Drawable>, b: Option<&Drawable>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => {
                let by_priority = if self.descending {
                    b.draw_priority.cmp(&a.draw_priority)
                } else {
                    a.draw_priority.cmp(&b.draw_priority)
                };
                by_priority.then_with(|| a.id.cmp(&b.id))
            }
        }
    }

    #[inline]
    pub fn less(&self, a: Option<&Drawable>, b: Option<&Drawable>) -> bool {
        self.compare(a, b) == Ordering::Less
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::{HeadlessDrawableImpl, HeadlessTexture};
    use crate::gfx::AttributeDataType;

    fn drawable(priority: i64) -> Drawable {
        let mut d = Drawable::new("test", Box::new(HeadlessDrawableImpl::default()));
        d.set_draw_priority(priority);
        d
    }

    // ── ordering ──

    #[test]
    fn equal_priority_orders_by_id_in_both_directions() {
        let a = drawable(5);
        let b = drawable(5);
        assert!(a.id() < b.id());
        for descending in [false, true] {
            let cmp = DrawableLessByPriority::new(descending);
            assert!(cmp.less(Some(&a), Some(&b)));
            assert!(!cmp.less(Some(&b), Some(&a)));
        }
    }

    #[test]
    fn absent_sorts_first_in_both_directions() {
        let a = drawable(-100);
        for descending in [false, true] {
            let cmp = DrawableLessByPriority::new(descending);
            assert!(cmp.less(None, Some(&a)));
            assert!(!cmp.less(Some(&a), None));
            assert_eq!(cmp.compare(None, None), Ordering::Equal);
        }
    }

    #[test]
    fn priority_direction_follows_flag() {
        let low = drawable(1);
        let high = drawable(2);
        assert!(DrawableLessByPriority::new(false).less(Some(&low), Some(&high)));
        assert!(DrawableLessByPriority::new(true).less(Some(&high), Some(&low)));
    }

    // ── render passes ──

    #[test]
    fn has_render_pass_is_any_bit_and_has_all_is_every_bit() {
        let mut d = drawable(0);
        d.set_render_passes(RenderPass::OPAQUE | RenderPass::TRANSLUCENT);
        assert!(d.has_render_pass(RenderPass::OPAQUE | RenderPass::DEBUG));
        assert!(!d.has_all_render_passes(RenderPass::OPAQUE | RenderPass::DEBUG));
        assert!(d.has_all_render_passes(RenderPass::OPAQUE | RenderPass::TRANSLUCENT));
        assert!(!d.has_render_pass(RenderPass::PASS_3D));
    }

    // ── color ──

    #[test]
    fn reset_color_rewrites_every_vertex() {
        let mut d = drawable(0);
        let attr = d.mutable_vertex_attributes().get_or_add(COLOR_ATTRIBUTE, 1, AttributeDataType::Float4);
        for i in 0..5 {
            attr.set(i, AttributeValue::Float4([0.0, 0.0, 1.0, 1.0]));
        }
        let red = Color::new(1.0, 0.0, 0.0, 0.4);
        d.reset_color(red);

        let attr = d.vertex_attributes().get(COLOR_ATTRIBUTE).unwrap();
        assert_eq!(attr.count(), 5);
        for item in attr.items() {
            assert_eq!(*item, AttributeValue::Float4([1.0, 0.0, 0.0, 0.4]));
        }
    }

    #[test]
    fn reset_color_red_keeps_alpha() {
        let mut d = drawable(0);
        d.set_vertex_count(3);
        let black = AttributeValue::Float4(Drawable::color_attr_rgba(Color::black()));
        d.mutable_vertex_attributes().get_or_add(COLOR_ATTRIBUTE, 1, AttributeDataType::Float4).fill(black, 3);
        d.reset_color(Color::red());
        let attr = d.vertex_attributes().get(COLOR_ATTRIBUTE).unwrap();
        assert_eq!(attr.count(), 3);
        assert!(attr.items().iter().all(|v| *v == AttributeValue::Float4([1.0, 0.0, 0.0, 1.0])));
    }

    #[test]
    fn reset_color_without_attribute_is_noop() {
        let mut d = drawable(0);
        d.reset_color(Color::red());
        assert!(d.vertex_attributes().is_empty());
    }

    // ── textures ──

    #[test]
    fn set_texture_replaces_same_location() {
        let mut d = drawable(0);
        let a: Arc<dyn Texture2D> = Arc::new(HeadlessTexture::new(4, 4));
        let b: Arc<dyn Texture2D> = Arc::new(HeadlessTexture::new(8, 8));
        d.set_texture(a, 0);
        d.set_texture(b, 0);
        assert_eq!(d.textures().len(), 1);
        assert_eq!(d.texture(0).map(|t| t.size()), Some((8, 8)));
        assert!(d.remove_texture(0).is_some());
        assert!(d.textures().is_empty());
    }
}
