use std::sync::Arc;

use crate::paint::Color;
use crate::tile::{GeometryCollection, GeometryCoordinate};

use super::drawable::{COLOR_ATTRIBUTE, Drawable, DrawableImpl};
use super::drawable_tweaker::DrawableTweaker;
use super::fill_generator::generate_fill_buffers;
use super::polyline::{LineLayoutVertex, PolylineGeometry, PolylineOptions, tessellate_polyline};
use super::render_pass::RenderPass;
use super::segment::{DrawSegment, MAX_SEGMENT_VERTICES, Segment};
use super::shader::ShaderProgram;
use super::texture::{Texture2D, TextureAttachment};
use super::types::{AttributeDataType, ColorMode, CullFaceMode, DepthMaskType, DrawMode};
use super::vertex_attribute::{AttributeValue, SharedRawData, VertexAttributeArray};

/// Default name of the position attribute.
pub const POSITION_ATTRIBUTE: &str = "a_pos";

/// How the builder writes the color attribute.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ColorAttrMode {
    /// No color attribute; color comes from uniforms.
    #[default]
    None,
    /// The current color, repeated for every vertex of the drawable.
    PerDrawable,
    /// The color current when each vertex was added.
    PerVertex,
}

/// Backend hook used by a builder to create and finish drawables.
pub trait DrawableBuilderImpl: Send {
    fn create_drawable_impl(&self) -> Box<dyn DrawableImpl>;

    /// Called on each new drawable after the builder applied its settings.
    fn init(&self, _drawable: &mut Drawable) {}
}

/// Accumulates primitives and seals them into drawables.
///
/// Fixed-function settings (shader, passes, depth, colors, textures, names) persist across
/// [`flush`](Self::flush). Geometry, vertex attribute overrides and pending tweakers belong
/// to the drawable being built and are consumed by the flush.
pub struct DrawableBuilder {
    name: String,
    drawable_name: Option<String>,
    shader: Option<Arc<dyn ShaderProgram>>,
    render_pass: RenderPass,
    draw_priority: i64,
    sub_layer_index: i32,
    depth_type: DepthMaskType,
    enable_depth: bool,
    cull_face: CullFaceMode,
    color_mode: ColorMode,
    line_width: f32,
    vertex_attr_name: String,
    color_attr_name: String,
    color_attr_mode: ColorAttrMode,
    current_color: Color,
    textures: Vec<TextureAttachment>,

    // Per-drawable build state.
    vertices: Vec<GeometryCoordinate>,
    colors: Vec<[f32; 4]>,
    polyline: PolylineGeometry,
    raw_vertex_count: usize,
    indexes: Vec<u16>,
    segments: Vec<DrawSegment>,
    vertex_attrs: VertexAttributeArray,
    tweakers: Vec<Arc<dyn DrawableTweaker>>,

    drawables: Vec<Box<Drawable>>,
    imp: Box<dyn DrawableBuilderImpl>,
}

impl DrawableBuilder {
    pub fn new(name: impl Into<String>, imp: Box<dyn DrawableBuilderImpl>) -> Self {
        Self {
            name: name.into(),
            drawable_name: None,
            shader: None,
            render_pass: RenderPass::OPAQUE,
            draw_priority: 0,
            sub_layer_index: 0,
            depth_type: DepthMaskType::ReadOnly,
            enable_depth: true,
            cull_face: CullFaceMode::disabled(),
            color_mode: ColorMode::alpha_blended(),
            line_width: 1.0,
            vertex_attr_name: POSITION_ATTRIBUTE.to_owned(),
            color_attr_name: COLOR_ATTRIBUTE.to_owned(),
            color_attr_mode: ColorAttrMode::None,
            current_color: Color::transparent(),
            textures: Vec::new(),
            vertices: Vec::new(),
            colors: Vec::new(),
            polyline: PolylineGeometry::default(),
            raw_vertex_count: 0,
            indexes: Vec::new(),
            segments: Vec::new(),
            vertex_attrs: VertexAttributeArray::new(),
            tweakers: Vec::new(),
            drawables: Vec::new(),
            imp,
        }
    }

    // ── settings ──

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name given to built drawables; defaults to the builder's name.
    pub fn set_drawable_name(&mut self, name: impl Into<String>) {
        self.drawable_name = Some(name.into());
    }

    #[inline]
    pub fn shader(&self) -> Option<&Arc<dyn ShaderProgram>> {
        self.shader.as_ref()
    }

    pub fn set_shader(&mut self, shader: Arc<dyn ShaderProgram>) {
        self.shader = Some(shader);
    }

    pub fn set_render_pass(&mut self, pass: RenderPass) {
        self.render_pass = pass;
    }

    pub fn set_draw_priority(&mut self, priority: i64) {
        self.draw_priority = priority;
    }

    /// Sets the priority for future drawables and for every drawable already built.
    pub fn reset_draw_priority(&mut self, priority: i64) {
        self.draw_priority = priority;
        for drawable in &mut self.drawables {
            drawable.set_draw_priority(priority);
        }
    }

    pub fn set_sub_layer_index(&mut self, index: i32) {
        self.sub_layer_index = index;
    }

    pub fn set_depth_type(&mut self, depth_type: DepthMaskType) {
        self.depth_type = depth_type;
    }

    /// With depth disabled, drawables get a read-only depth mask whatever the depth type.
    pub fn set_enable_depth(&mut self, enable: bool) {
        self.enable_depth = enable;
    }

    pub fn set_cull_face_mode(&mut self, mode: CullFaceMode) {
        self.cull_face = mode;
    }

    pub fn set_color_mode(&mut self, mode: ColorMode) {
        self.color_mode = mode;
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.line_width = width;
    }

    pub fn set_vertex_attr_name(&mut self, name: impl Into<String>) {
        self.vertex_attr_name = name.into();
    }

    pub fn set_color_attr_name(&mut self, name: impl Into<String>) {
        self.color_attr_name = name.into();
    }

    pub fn set_color_attr_mode(&mut self, mode: ColorAttrMode) {
        self.color_attr_mode = mode;
    }

    pub fn set_color(&mut self, color: Color) {
        self.current_color = color;
    }

    /// Attaches `texture` at `location` for every future drawable, replacing any texture
    /// already set there.
    pub fn set_texture(&mut self, texture: Arc<dyn Texture2D>, location: i32) {
        match self.textures.iter_mut().find(|t| t.location == location) {
            Some(existing) => existing.texture = texture,
            None => self.textures.push(TextureAttachment { texture, location }),
        }
    }

    pub fn clear_textures(&mut self) {
        self.textures.clear();
    }

    /// Queues a tweaker for the next flushed drawable.
    pub fn add_tweaker(&mut self, tweaker: Arc<dyn DrawableTweaker>) {
        self.tweakers.push(tweaker);
    }

    /// Attribute overrides for the next flushed drawable.
    pub fn set_vertex_attributes(&mut self, attrs: VertexAttributeArray) {
        self.vertex_attrs = attrs;
    }

    #[inline]
    pub fn vertex_attributes(&self) -> &VertexAttributeArray {
        &self.vertex_attrs
    }

    /// Declares `count` vertices provided through shared raw attribute data.
    pub fn set_raw_vertices(&mut self, count: usize) {
        self.raw_vertex_count = count;
    }

    // ── state ──

    /// `true` when no geometry is pending for the current drawable.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.polyline.vertices.is_empty() && self.raw_vertex_count == 0
    }

    pub fn vertex_count(&self) -> usize {
        if !self.polyline.vertices.is_empty() {
            self.polyline.vertices.len()
        } else if self.raw_vertex_count > 0 {
            self.raw_vertex_count
        } else {
            self.vertices.len()
        }
    }

    #[inline]
    pub fn pending_indexes(&self) -> &[u16] {
        &self.indexes
    }

    #[inline]
    pub fn pending_segments(&self) -> &[DrawSegment] {
        &self.segments
    }

    // ── primitives ──

    /// Returns the segment that takes `count` vertices starting at `first_vertex`, opening a
    /// new one when the mode changes or the 16-bit index range would overflow.
    fn reserve_segment(&mut self, mode: DrawMode, first_vertex: usize, count: usize) -> Option<usize> {
        if count > MAX_SEGMENT_VERTICES {
            log::warn!(
                "DrawableBuilder {}: primitive with {count} vertices cannot fit a segment; dropped",
                self.name
            );
            return None;
        }
        let reuse = matches!(
            self.segments.last(),
            Some(last) if last.mode == mode
                && first_vertex >= last.segment.vertex_offset
                && first_vertex + count - last.segment.vertex_offset <= MAX_SEGMENT_VERTICES
        );
        if !reuse {
            self.segments.push(DrawSegment { mode, segment: Segment::new(first_vertex, self.indexes.len()) });
        }
        Some(self.segments.len() - 1)
    }

    /// Pushes indexes relative to `first_vertex` into segment `seg`, rebasing them on the
    /// segment's vertex offset.
    fn emit_indexes(&mut self, seg: usize, first_vertex: usize, rel: &[usize]) {
        let total = self.vertex_count();
        let s = &mut self.segments[seg].segment;
        let base = first_vertex - s.vertex_offset;
        for &r in rel {
            self.indexes.push((base + r) as u16);
        }
        s.vertex_length = s.vertex_length.max(total - s.vertex_offset);
        s.index_length += rel.len();
    }

    fn push_vertex(&mut self, x: i16, y: i16) {
        self.vertices.push(GeometryCoordinate::new(x, y));
        if self.color_attr_mode == ColorAttrMode::PerVertex {
            self.colors.push(Drawable::color_attr_rgba(self.current_color));
        }
    }

    fn plain_geometry_allowed(&self) -> bool {
        if self.polyline.vertices.is_empty() && self.raw_vertex_count == 0 {
            return true;
        }
        log::warn!("DrawableBuilder {}: cannot mix plain vertices with line or raw geometry; ignored", self.name);
        false
    }

    pub fn add_triangle(&mut self, x0: i16, y0: i16, x1: i16, y1: i16, x2: i16, y2: i16) {
        if !self.plain_geometry_allowed() {
            return;
        }
        let first = self.vertices.len();
        let Some(seg) = self.reserve_segment(DrawMode::Triangles, first, 3) else { return };
        self.push_vertex(x0, y0);
        self.push_vertex(x1, y1);
        self.push_vertex(x2, y2);
        self.emit_indexes(seg, first, &[0, 1, 2]);
    }

    /// Adds a triangle sharing the last two vertices (triangle strip style).
    ///
    /// Requires at least two vertices in the current drawable; otherwise nothing happens.
    pub fn append_triangle(&mut self, x0: i16, y0: i16) {
        let n = self.vertices.len();
        if n < 2 {
            log::warn!("DrawableBuilder {}: append_triangle needs two prior vertices; ignored", self.name);
            return;
        }
        if !self.plain_geometry_allowed() {
            return;
        }
        let Some(seg) = self.reserve_segment(DrawMode::Triangles, n - 2, 3) else { return };
        self.push_vertex(x0, y0);
        self.emit_indexes(seg, n - 2, &[0, 1, 2]);
    }

    /// Adds the rectangle `(x0, y0)..(x1, y1)` as two triangles over four vertices.
    ///
    /// Vertices are `(x0,y0) (x1,y0) (x0,y1) (x1,y1)`; triangles are `[0,1,2]` and `[1,3,2]`.
    pub fn add_quad(&mut self, x0: i16, y0: i16, x1: i16, y1: i16) {
        if !self.plain_geometry_allowed() {
            return;
        }
        let first = self.vertices.len();
        let Some(seg) = self.reserve_segment(DrawMode::Triangles, first, 4) else { return };
        self.push_vertex(x0, y0);
        self.push_vertex(x1, y0);
        self.push_vertex(x0, y1);
        self.push_vertex(x1, y1);
        self.emit_indexes(seg, first, &[0, 1, 2, 1, 3, 2]);
    }

    /// Appends `vertices[offset..offset + length]` and returns the index of the first one.
    pub fn add_vertices(&mut self, vertices: &[GeometryCoordinate], offset: usize, length: usize) -> usize {
        let first = self.vertices.len();
        let end = (offset + length).min(vertices.len());
        if offset >= end || !self.plain_geometry_allowed() {
            return first;
        }
        for v in &vertices[offset..end] {
            self.push_vertex(v.x, v.y);
        }
        first
    }

    /// Adds line pairs from `indexes[offset..offset + length]`, each shifted by `base_index`.
    pub fn add_lines(&mut self, indexes: &[u16], offset: usize, length: usize, base_index: usize) {
        self.add_indexed(DrawMode::Lines, indexes, offset, length, base_index);
    }

    /// Adds triangles from `indexes[offset..offset + length]`, each shifted by `base_index`.
    pub fn add_triangles(&mut self, indexes: &[u16], offset: usize, length: usize, base_index: usize) {
        self.add_indexed(DrawMode::Triangles, indexes, offset, length, base_index);
    }

    fn add_indexed(&mut self, mode: DrawMode, indexes: &[u16], offset: usize, length: usize, base_index: usize) {
        let end = (offset + length).min(indexes.len());
        if offset >= end {
            return;
        }
        let batch = &indexes[offset..end];
        let per = mode.vertices_per_primitive();
        let batch = &batch[..batch.len() - batch.len() % per];
        let (Some(&min), Some(&max)) = (batch.iter().min(), batch.iter().max()) else { return };
        let (min, max) = (base_index + min as usize, base_index + max as usize);
        if max >= self.vertices.len() {
            log::warn!(
                "DrawableBuilder {}: index {max} beyond {} vertices; ignored",
                self.name,
                self.vertices.len()
            );
            return;
        }
        let Some(seg) = self.reserve_segment(mode, min, max + 1 - min) else { return };
        let s = &mut self.segments[seg].segment;
        for &i in batch {
            self.indexes.push((base_index + i as usize - s.vertex_offset) as u16);
        }
        s.vertex_length = s.vertex_length.max(max + 1 - s.vertex_offset);
        s.index_length += batch.len();
    }

    /// Replaces the pending index buffer and segments wholesale.
    ///
    /// `indexes` are relative to each segment's vertex offset.
    pub fn set_segments(&mut self, mode: DrawMode, indexes: Vec<u16>, segments: &[Segment]) {
        self.indexes = indexes;
        self.segments = segments.iter().map(|&segment| DrawSegment { mode, segment }).collect();
    }

    /// Tessellates a polyline into line layout vertices.
    ///
    /// Degenerate input emits nothing and leaves earlier geometry untouched.
    pub fn add_polyline(&mut self, coordinates: &[GeometryCoordinate], options: &PolylineOptions) {
        if !self.vertices.is_empty() || self.raw_vertex_count > 0 {
            log::warn!("DrawableBuilder {}: cannot mix line geometry with plain vertices; ignored", self.name);
            return;
        }
        let first = self.polyline.vertices.len();
        let first_triangle = self.polyline.triangles.len();
        let added = tessellate_polyline(coordinates, options, &mut self.polyline);
        if added == 0 {
            return;
        }
        let Some(seg) = self.reserve_segment(DrawMode::Triangles, first, added) else {
            self.polyline.vertices.truncate(first);
            self.polyline.triangles.truncate(first_triangle);
            return;
        };
        let s = &mut self.segments[seg].segment;
        for tri in &self.polyline.triangles[first_triangle..] {
            self.indexes.extend(tri.iter().map(|&i| (i as usize - s.vertex_offset) as u16));
        }
        s.vertex_length = first + added - s.vertex_offset;
        s.index_length += (self.polyline.triangles.len() - first_triangle) * 3;
    }

    /// Triangulates `geometry` (outer rings with holes) into position vertices.
    pub fn add_fill(&mut self, geometry: &GeometryCollection) {
        let buffers = generate_fill_buffers(geometry);
        if buffers.vertices.is_empty() {
            return;
        }
        let base = self.add_vertices(&buffers.vertices, 0, buffers.vertices.len());
        for seg in &buffers.triangle_segments {
            let idx = &buffers.triangles[seg.index_offset..seg.index_offset + seg.index_length];
            self.add_triangles(idx, 0, idx.len(), base + seg.vertex_offset);
        }
    }

    // ── flush ──

    /// Seals the pending geometry into a drawable. No-op when nothing is pending.
    pub fn flush(&mut self) {
        if self.is_empty() {
            if !self.segments.is_empty() || !self.indexes.is_empty() {
                log::debug!("DrawableBuilder {}: segments without vertices discarded", self.name);
                self.indexes.clear();
                self.segments.clear();
            }
            return;
        }

        let name = self.drawable_name.clone().unwrap_or_else(|| self.name.clone());
        let mut drawable = Drawable::new(name, self.imp.create_drawable_impl());
        drawable.set_shader(self.shader.clone());
        drawable.set_render_passes(self.render_pass);
        drawable.set_draw_priority(self.draw_priority);
        drawable.set_sub_layer_index(self.sub_layer_index);
        drawable.set_depth_type(if self.enable_depth { self.depth_type } else { DepthMaskType::ReadOnly });
        drawable.set_cull_face_mode(self.cull_face);
        drawable.set_color_mode(self.color_mode);
        drawable.set_line_width(self.line_width);
        drawable.set_color_attr_name(self.color_attr_name.clone());

        let vertex_count = self.vertex_count();
        let mut attrs = std::mem::take(&mut self.vertex_attrs);
        let attr_index = |name: &str| {
            self.shader
                .as_ref()
                .and_then(|s| s.vertex_attributes().get(name).map(|a| a.index()))
                .unwrap_or(-1)
        };

        if !self.polyline.vertices.is_empty() {
            let raw: Arc<[u8]> = bytemuck::cast_slice::<LineLayoutVertex, u8>(&self.polyline.vertices).into();
            for (name, offset, data_type) in [
                ("a_pos_normal", LineLayoutVertex::POS_NORMAL_OFFSET, AttributeDataType::Short2),
                ("a_data", LineLayoutVertex::DATA_OFFSET, AttributeDataType::UByte4),
            ] {
                attrs.get_or_add(name, attr_index(name), data_type).set_shared_raw_data(SharedRawData {
                    data: raw.clone(),
                    offset,
                    vertex_offset: 0,
                    stride: LineLayoutVertex::STRIDE,
                    data_type,
                });
            }
        } else if !self.vertices.is_empty() {
            let index = attr_index(&self.vertex_attr_name);
            let pos = attrs.get_or_add(&self.vertex_attr_name, index, AttributeDataType::Short2);
            pos.clear();
            for (i, v) in self.vertices.iter().enumerate() {
                pos.set(i, AttributeValue::Short2([v.x, v.y]));
            }
        }

        let color_index = attr_index(&self.color_attr_name);
        match self.color_attr_mode {
            ColorAttrMode::None => {}
            ColorAttrMode::PerDrawable => {
                let color = attrs.get_or_add(&self.color_attr_name, color_index, AttributeDataType::Float4);
                color.fill(AttributeValue::Float4(Drawable::color_attr_rgba(self.current_color)), vertex_count);
            }
            ColorAttrMode::PerVertex => {
                let color = attrs.get_or_add(&self.color_attr_name, color_index, AttributeDataType::Float4);
                color.clear();
                for (i, c) in self.colors.iter().enumerate() {
                    color.set(i, AttributeValue::Float4(*c));
                }
            }
        }

        drawable.set_vertex_attributes(attrs);
        drawable.set_vertex_count(vertex_count);
        drawable.set_index_data(std::mem::take(&mut self.indexes), std::mem::take(&mut self.segments));
        for t in &self.textures {
            drawable.set_texture(t.texture.clone(), t.location);
        }
        for tweaker in self.tweakers.drain(..) {
            drawable.add_tweaker(tweaker);
        }
        self.imp.init(&mut drawable);

        log::debug!(
            "DrawableBuilder {}: flushed {} ({} vertices, {} segments)",
            self.name,
            drawable.id(),
            vertex_count,
            drawable.segments().len()
        );
        self.drawables.push(Box::new(drawable));

        self.vertices.clear();
        self.colors.clear();
        self.polyline.vertices.clear();
        self.polyline.triangles.clear();
        self.raw_vertex_count = 0;
    }

    #[inline]
    pub fn drawables(&self) -> &[Box<Drawable>] {
        &self.drawables
    }

    /// Moves every built drawable out, leaving the builder ready for reuse.
    pub fn clear_drawables(&mut self) -> Vec<Box<Drawable>> {
        std::mem::take(&mut self.drawables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::HeadlessBuilderImpl;

    fn builder() -> DrawableBuilder {
        DrawableBuilder::new("test", Box::new(HeadlessBuilderImpl::default()))
    }

    fn positions(d: &Drawable) -> Vec<[i16; 2]> {
        d.vertex_attributes()
            .get(POSITION_ATTRIBUTE)
            .map(|a| {
                a.items()
                    .iter()
                    .filter_map(|v| match v {
                        AttributeValue::Short2(p) => Some(*p),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    // ── triangles ──

    #[test]
    fn n_triangles_flush_into_one_drawable() {
        let mut b = builder();
        for i in 0..5 {
            b.add_triangle(i, 0, i + 1, 0, i, 1);
        }
        b.flush();
        let drawables = b.clear_drawables();
        assert_eq!(drawables.len(), 1);
        assert_eq!(drawables[0].vertex_count(), 15);
        assert_eq!(drawables[0].indexes().len(), 15);
        assert!(b.clear_drawables().is_empty());
    }

    #[test]
    fn append_triangle_shares_last_edge() {
        let mut b = builder();
        b.add_triangle(0, 0, 1, 0, 0, 1);
        b.append_triangle(1, 1);
        assert_eq!(b.pending_indexes(), &[0, 1, 2, 1, 2, 3]);
    }

    #[test]
    fn append_triangle_without_prior_vertices_is_ignored() {
        let mut b = builder();
        b.append_triangle(1, 1);
        assert!(b.is_empty());
        b.flush();
        assert!(b.drawables().is_empty());
    }

    #[test]
    fn add_quad_decomposes_into_two_triangles() {
        let mut b = builder();
        b.add_quad(0, 0, 10, 10);
        b.flush();
        let d = &b.drawables()[0];
        assert_eq!(d.indexes(), &[0, 1, 2, 1, 3, 2]);
        assert_eq!(positions(d), vec![[0, 0], [10, 0], [0, 10], [10, 10]]);
        assert_eq!(d.segments().len(), 1);
        assert_eq!(d.segments()[0].segment.index_length, 6);
    }

    #[test]
    fn segments_split_at_index_range() {
        let mut b = builder();
        // 21846 triangles = 65538 vertices, two past the 16-bit range.
        for _ in 0..21846 {
            b.add_triangle(0, 0, 1, 0, 0, 1);
        }
        let segs = b.pending_segments();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].segment.vertex_length, 65535);
        assert_eq!(segs[1].segment.vertex_offset, 65535);
        assert_eq!(segs[1].segment.vertex_length, 3);
        assert_eq!(&b.pending_indexes()[segs[1].segment.index_offset..], &[0, 1, 2]);
    }

    // ── bulk ingestion ──

    #[test]
    fn add_vertices_returns_base_for_indexes() {
        let mut b = builder();
        b.add_quad(0, 0, 1, 1);
        let pts = [GeometryCoordinate::new(5, 5), GeometryCoordinate::new(6, 5), GeometryCoordinate::new(5, 6)];
        let base = b.add_vertices(&pts, 0, 3);
        assert_eq!(base, 4);
        b.add_triangles(&[0, 1, 2], 0, 3, base);
        assert_eq!(&b.pending_indexes()[6..], &[4, 5, 6]);
        assert_eq!(b.pending_segments()[0].segment.vertex_length, 7);
    }

    #[test]
    fn add_lines_opens_line_segment() {
        let mut b = builder();
        let pts = [GeometryCoordinate::new(0, 0), GeometryCoordinate::new(9, 9)];
        let base = b.add_vertices(&pts, 0, 2);
        b.add_lines(&[0, 1], 0, 2, base);
        assert_eq!(b.pending_segments()[0].mode, DrawMode::Lines);
    }

    #[test]
    fn segments_without_vertices_do_not_leak_into_next_drawable() {
        let mut b = builder();
        b.set_segments(
            DrawMode::Triangles,
            vec![0, 1, 2, 1, 2, 3],
            &[Segment { vertex_offset: 0, vertex_length: 4, index_offset: 0, index_length: 6 }],
        );
        b.flush();
        assert!(b.drawables().is_empty());
        assert!(b.pending_segments().is_empty());
        assert!(b.pending_indexes().is_empty());

        b.add_triangle(0, 0, 1, 0, 0, 1);
        b.flush();
        let d = &b.drawables()[0];
        assert_eq!(d.indexes(), &[0, 1, 2]);
        assert_eq!(d.segments().len(), 1);
    }

    // ── polylines & fills ──

    #[test]
    fn polyline_uses_shared_line_layout() {
        let mut b = builder();
        b.add_polyline(&[GeometryCoordinate::new(0, 0), GeometryCoordinate::new(100, 0)], &PolylineOptions::default());
        b.add_polyline(&[GeometryCoordinate::new(3, 3), GeometryCoordinate::new(3, 3)], &PolylineOptions::default());
        b.add_polyline(&[GeometryCoordinate::new(0, 50), GeometryCoordinate::new(100, 50)], &PolylineOptions::default());
        assert_eq!(b.pending_indexes(), &[0, 1, 2, 1, 2, 3, 4, 5, 6, 5, 6, 7]);
        b.flush();
        let d = &b.drawables()[0];
        assert_eq!(d.vertex_count(), 8);
        let data = d.vertex_attributes().get("a_data").unwrap();
        assert_eq!(data.shared_raw_data().map(|r| r.stride), Some(LineLayoutVertex::STRIDE));
    }

    #[test]
    fn fill_triangulates_into_positions() {
        let mut b = builder();
        let ring: Vec<_> = [(0, 0), (10, 0), (10, 10), (0, 10)].iter().map(|&(x, y)| GeometryCoordinate::new(x, y)).collect();
        b.add_fill(&vec![ring]);
        b.flush();
        let d = &b.drawables()[0];
        assert_eq!(d.vertex_count(), 4);
        assert_eq!(d.indexes().len(), 6);
    }

    // ── settings ──

    #[test]
    fn settings_persist_across_flushes() {
        let mut b = builder();
        b.set_render_pass(RenderPass::TRANSLUCENT);
        b.set_sub_layer_index(3);
        b.set_color_mode(ColorMode::unblended());
        b.add_quad(0, 0, 1, 1);
        b.flush();
        b.add_quad(0, 0, 2, 2);
        b.flush();
        for d in b.drawables() {
            assert_eq!(d.render_passes(), RenderPass::TRANSLUCENT);
            assert_eq!(d.sub_layer_index(), 3);
            assert_eq!(d.color_mode(), ColorMode::unblended());
        }
        assert_ne!(b.drawables()[0].id(), b.drawables()[1].id());
    }

    #[test]
    fn reset_draw_priority_updates_built_drawables() {
        let mut b = builder();
        b.add_quad(0, 0, 1, 1);
        b.flush();
        b.reset_draw_priority(9);
        b.add_quad(0, 0, 1, 1);
        b.flush();
        assert!(b.drawables().iter().all(|d| d.draw_priority() == 9));
    }

    #[test]
    fn per_drawable_color_fills_every_vertex() {
        let mut b = builder();
        b.set_color_attr_mode(ColorAttrMode::PerDrawable);
        b.set_color(Color::green());
        b.add_quad(0, 0, 1, 1);
        b.flush();
        let colors = b.drawables()[0].vertex_attributes().get(COLOR_ATTRIBUTE).unwrap();
        assert_eq!(colors.count(), 4);
        assert!(colors.items().iter().all(|c| *c == AttributeValue::Float4([0.0, 1.0, 0.0, 1.0])));
    }

    #[test]
    fn per_vertex_color_tracks_current_color() {
        let mut b = builder();
        b.set_color_attr_mode(ColorAttrMode::PerVertex);
        b.set_color(Color::red());
        b.add_triangle(0, 0, 1, 0, 0, 1);
        b.set_color(Color::blue());
        b.append_triangle(1, 1);
        b.flush();
        let colors = b.drawables()[0].vertex_attributes().get(COLOR_ATTRIBUTE).unwrap();
        assert_eq!(colors.get(0), Some(&AttributeValue::Float4([1.0, 0.0, 0.0, 1.0])));
        assert_eq!(colors.get(3), Some(&AttributeValue::Float4([0.0, 0.0, 1.0, 1.0])));
    }
}
