use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use bytemuck::{Pod, Zeroable};

use crate::gfx::{
    AttributeDataType, ColorMode, Context, CullFaceMode, DrawMode, DrawableBuilder, DrawableTweaker,
    POSITION_ATTRIBUTE, PolylineOptions, RenderPass, Segment, ShaderProgram, ShaderRegistry, SharedRawData,
    Texture2D, VertexAttributeArray, generate_fill_buffers,
};
use crate::map::TransformState;
use crate::paint::Color;
use crate::renderer::{
    ChangeRequest, LayerGroupRef, LayerUpdateParameters, RenderLayer, TileLayerGroup, lock_group,
};
use crate::shaders::{CUSTOM_SYMBOL_ICON_SHADER, FILL_SHADER, LINE_SHADER, LinePropertiesUbo};
use crate::tile::{GeometryCollection, GeometryCoordinate, OverscaledTileId};

use super::drawable_tweakers::{FillDrawableTweaker, LineDrawableTweaker, SymbolDrawableTweaker, SymbolPlacement};

const TEXTURE_ATTRIBUTE: &str = "a_tex";
const TEXTURE_SAMPLER: &str = "u_texture";
const GROUP_CAPACITY: usize = 64;

const LINE_UNIFORM_PROPERTIES: &[&str] = &["a_color", "a_blur", "a_opacity", "a_gapwidth", "a_offset", "a_width"];
const FILL_UNIFORM_PROPERTIES: &[&str] = &["a_color", "a_opacity"];

/// Application code that produces drawables for a [`CustomDrawableLayer`].
pub trait CustomDrawableLayerHost {
    /// Called once before the first update.
    fn initialize(&mut self) {}

    /// Called every frame. Hosts with nothing new to build should return without touching
    /// the interface.
    fn update(&mut self, interface: &mut Interface<'_>);

    /// Called once when the layer goes away.
    fn deinitialize(&mut self) {}
}

/// Line appearance for [`Interface::add_polyline`].
#[derive(Debug, Clone, PartialEq)]
pub struct LineOptions {
    pub geometry: PolylineOptions,
    pub color: Color,
    pub blur: f32,
    pub opacity: f32,
    pub gap_width: f32,
    pub offset: f32,
    pub width: f32,
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            geometry: PolylineOptions::default(),
            color: Color::black(),
            blur: 0.0,
            opacity: 1.0,
            gap_width: 0.0,
            offset: 0.0,
            width: 1.0,
        }
    }
}

impl LineOptions {
    fn properties_ubo(&self) -> LinePropertiesUbo {
        LinePropertiesUbo {
            color: self.color.to_f32_array(),
            blur: self.blur,
            opacity: self.opacity,
            gapwidth: self.gap_width,
            offset: self.offset,
            width: self.width,
            _pad: [0.0; 3],
        }
    }
}

/// Fill appearance for [`Interface::add_fill`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FillOptions {
    pub color: Color,
    pub opacity: f32,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self { color: Color::black(), opacity: 1.0 }
    }
}

/// Icon appearance for [`Interface::add_symbol`].
#[derive(Clone)]
pub struct SymbolOptions {
    pub texture: Option<Arc<dyn Texture2D>>,
    /// Texture coordinates of the top-left and bottom-right corners.
    pub texture_coordinates: [[f32; 2]; 2],
    /// Icon width and height.
    pub size: [f32; 2],
    /// Icon point relative to its box, `[0, 0]` top-left to `[1, 1]` bottom-right.
    pub anchor: [f32; 2],
    pub angle_degrees: f32,
    pub scale_with_map: bool,
    pub pitch_with_map: bool,
}

impl Default for SymbolOptions {
    fn default() -> Self {
        Self {
            texture: None,
            texture_coordinates: [[0.0, 0.0], [1.0, 1.0]],
            size: [16.0, 16.0],
            anchor: [0.5, 0.5],
            angle_degrees: 0.0,
            scale_with_map: false,
            pitch_with_map: false,
        }
    }
}

impl core::fmt::Debug for SymbolOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SymbolOptions")
            .field("texture", &self.texture.as_ref().map(|t| t.size()))
            .field("texture_coordinates", &self.texture_coordinates)
            .field("size", &self.size)
            .field("anchor", &self.anchor)
            .field("angle_degrees", &self.angle_degrees)
            .field("scale_with_map", &self.scale_with_map)
            .field("pitch_with_map", &self.pitch_with_map)
            .finish()
    }
}

impl SymbolOptions {
    fn placement(&self) -> SymbolPlacement {
        SymbolPlacement {
            size: self.size,
            anchor: self.anchor,
            angle_degrees: self.angle_degrees,
            scale_with_map: self.scale_with_map,
            pitch_with_map: self.pitch_with_map,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct SymbolIconVertex {
    a_pos: [f32; 2],
    a_tex: [f32; 2],
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum BuilderKind {
    Line,
    Fill,
    Symbol,
}

impl BuilderKind {
    fn name(self) -> &'static str {
        match self {
            BuilderKind::Line => "lines",
            BuilderKind::Fill => "fill",
            BuilderKind::Symbol => "symbol",
        }
    }
}

/// What a host sees during [`CustomDrawableLayerHost::update`].
///
/// Geometry added for one kind (lines, fills, symbols) accumulates in a builder until the
/// kind changes, an options setter is called, or the update ends. Finished drawables go
/// into the layer's tile group under the current tile id, in the translucent pass.
pub struct Interface<'a> {
    group: LayerGroupRef,
    shaders: &'a ShaderRegistry,
    context: &'a dyn Context,
    state: &'a TransformState,
    tile_id: Option<OverscaledTileId>,
    line_options: LineOptions,
    fill_options: FillOptions,
    symbol_options: SymbolOptions,
    builder: Option<(BuilderKind, DrawableBuilder)>,
    line_shader: Option<Arc<dyn ShaderProgram>>,
    fill_shader: Option<Arc<dyn ShaderProgram>>,
    symbol_shader: Option<Arc<dyn ShaderProgram>>,
}

impl<'a> Interface<'a> {
    /// Creates the layer's tile group on first use and queues it for the orchestrator.
    pub fn new(
        layer_id: &str,
        layer_index: i32,
        group: &mut Option<LayerGroupRef>,
        shaders: &'a ShaderRegistry,
        context: &'a dyn Context,
        state: &'a TransformState,
        changes: &mut Vec<ChangeRequest>,
    ) -> Self {
        let group = group
            .get_or_insert_with(|| {
                let created: LayerGroupRef =
                    Arc::new(Mutex::new(context.create_tile_layer_group(layer_index, GROUP_CAPACITY, layer_id)));
                changes.push(ChangeRequest::AddLayerGroup { group: created.clone(), replace: false });
                created
            })
            .clone();

        Self {
            group,
            shaders,
            context,
            state,
            tile_id: None,
            line_options: LineOptions::default(),
            fill_options: FillOptions::default(),
            symbol_options: SymbolOptions::default(),
            builder: None,
            line_shader: None,
            fill_shader: None,
            symbol_shader: None,
        }
    }

    #[inline]
    pub fn state(&self) -> &TransformState {
        self.state
    }

    /// Drawables currently stored in the layer's group.
    pub fn drawable_count(&self) -> usize {
        lock_group(&self.group).map(|g| g.drawable_count()).unwrap_or(0)
    }

    /// Tile the following geometry belongs to.
    pub fn set_tile_id(&mut self, tile_id: OverscaledTileId) {
        self.tile_id = Some(tile_id);
    }

    pub fn set_line_options(&mut self, options: LineOptions) {
        self.finish();
        self.line_options = options;
    }

    pub fn set_fill_options(&mut self, options: FillOptions) {
        self.finish();
        self.fill_options = options;
    }

    pub fn set_symbol_options(&mut self, options: SymbolOptions) {
        self.finish();
        self.symbol_options = options;
    }

    /// Adds a polyline in tile units.
    pub fn add_polyline(&mut self, coordinates: &[GeometryCoordinate]) {
        let geometry = self.line_options.geometry;
        let Some(builder) = self.builder_for(BuilderKind::Line) else { return };
        builder.add_polyline(coordinates, &geometry);
    }

    /// Adds a filled polygon (outer ring first, then holes) in tile units.
    pub fn add_fill(&mut self, geometry: &GeometryCollection) {
        let Some(builder) = self.builder_for(BuilderKind::Fill) else { return };
        let buffers = generate_fill_buffers(geometry);
        if buffers.vertices.is_empty() {
            return;
        }

        let mut attrs = VertexAttributeArray::new();
        if let Some(attr) = attrs.add(POSITION_ATTRIBUTE, -1, AttributeDataType::Short2, 0) {
            attr.set_shared_raw_data(SharedRawData {
                data: bytemuck::cast_slice::<GeometryCoordinate, u8>(&buffers.vertices).into(),
                offset: 0,
                vertex_offset: 0,
                stride: size_of::<GeometryCoordinate>(),
                data_type: AttributeDataType::Short2,
            });
        }
        builder.set_vertex_attr_name(POSITION_ATTRIBUTE);
        builder.set_vertex_attributes(attrs);
        builder.set_raw_vertices(buffers.vertices.len());
        builder.set_segments(DrawMode::Triangles, buffers.triangles, &buffers.triangle_segments);
        builder.flush();
    }

    /// Adds one icon centered on `point` (tile units).
    ///
    /// Each corner encodes the point doubled plus its corner bit, so the shader can recover
    /// both the center and the extrusion direction.
    pub fn add_symbol(&mut self, point: GeometryCoordinate) {
        let options = self.symbol_options.clone();
        let Some(builder) = self.builder_for(BuilderKind::Symbol) else { return };

        let tc = options.texture_coordinates;
        let mut vertices = Vec::with_capacity(4);
        for y in 0..=1usize {
            for x in 0..=1usize {
                vertices.push(SymbolIconVertex {
                    a_pos: [(point.x as i32 * 2 + x as i32) as f32, (point.y as i32 * 2 + y as i32) as f32],
                    a_tex: [tc[x][0], tc[y][1]],
                });
            }
        }
        let raw: Arc<[u8]> = bytemuck::cast_slice::<SymbolIconVertex, u8>(&vertices).into();

        let mut attrs = VertexAttributeArray::new();
        for (name, offset) in [(POSITION_ATTRIBUTE, 0), (TEXTURE_ATTRIBUTE, 8)] {
            if let Some(attr) = attrs.add(name, -1, AttributeDataType::Float2, 0) {
                attr.set_shared_raw_data(SharedRawData {
                    data: raw.clone(),
                    offset,
                    vertex_offset: 0,
                    stride: size_of::<SymbolIconVertex>(),
                    data_type: AttributeDataType::Float2,
                });
            }
        }
        builder.set_vertex_attr_name(POSITION_ATTRIBUTE);
        builder.set_vertex_attributes(attrs);
        builder.set_raw_vertices(vertices.len());
        builder.set_segments(
            DrawMode::Triangles,
            vec![0, 1, 2, 1, 2, 3],
            &[Segment { vertex_offset: 0, vertex_length: 4, index_offset: 0, index_length: 6 }],
        );

        builder.clear_textures();
        if let Some(texture) = options.texture.clone() {
            let location = builder.shader().and_then(|s| s.sampler_location(TEXTURE_SAMPLER));
            if let Some(location) = location {
                builder.set_texture(texture, location);
            }
        }

        builder.add_tweaker(Arc::new(SymbolDrawableTweaker::new(options.placement())));
        builder.flush();
    }

    /// Moves every finished drawable into the tile group.
    ///
    /// Without a tile id the drawables have nowhere to go and are dropped.
    pub fn finish(&mut self) {
        let Some((kind, builder)) = self.builder.as_mut() else { return };
        if builder.is_empty() && builder.drawables().is_empty() {
            return;
        }
        builder.flush();
        let drawables = builder.clear_drawables();

        let Some(tile_id) = self.tile_id else {
            log::warn!("custom drawable layer: {} drawables built without a tile id; dropped", drawables.len());
            return;
        };
        let tweaker: Option<Arc<dyn DrawableTweaker>> = match kind {
            BuilderKind::Line => Some(Arc::new(LineDrawableTweaker::new(self.line_options.properties_ubo()))),
            BuilderKind::Fill => {
                Some(Arc::new(FillDrawableTweaker::new(self.fill_options.color, self.fill_options.opacity)))
            }
            BuilderKind::Symbol => None,
        };

        let Some(mut guard) = lock_group(&self.group) else { return };
        let Some(tiles) = guard.as_any_mut().downcast_mut::<TileLayerGroup>() else {
            log::error!("custom drawable layer: layer group is not a tile group");
            return;
        };
        for mut drawable in drawables {
            if let Some(tweaker) = &tweaker {
                drawable.add_tweaker(tweaker.clone());
            }
            tiles.add_drawable(RenderPass::TRANSLUCENT, tile_id, drawable);
        }
    }

    /// The builder for `kind`, finishing and replacing a builder of another kind.
    fn builder_for(&mut self, kind: BuilderKind) -> Option<&mut DrawableBuilder> {
        let shader = self.shader_for(kind)?;
        if self.builder.as_ref().is_none_or(|(k, _)| *k != kind) {
            self.finish();
            self.builder = Some((kind, self.create_builder(kind.name(), shader)));
        }
        self.builder.as_mut().map(|(_, b)| b)
    }

    fn create_builder(&self, name: &str, shader: Arc<dyn ShaderProgram>) -> DrawableBuilder {
        let mut builder = self.context.create_drawable_builder(name);
        builder.set_shader(shader);
        builder.set_sub_layer_index(0);
        builder.set_enable_depth(false);
        builder.set_color_mode(ColorMode::alpha_blended());
        builder.set_cull_face_mode(CullFaceMode::disabled());
        builder.set_render_pass(RenderPass::TRANSLUCENT);
        builder
    }

    fn shader_for(&mut self, kind: BuilderKind) -> Option<Arc<dyn ShaderProgram>> {
        let (slot, name, uniforms) = match kind {
            BuilderKind::Line => (&mut self.line_shader, LINE_SHADER, LINE_UNIFORM_PROPERTIES),
            BuilderKind::Fill => (&mut self.fill_shader, FILL_SHADER, FILL_UNIFORM_PROPERTIES),
            BuilderKind::Symbol => (&mut self.symbol_shader, CUSTOM_SYMBOL_ICON_SHADER, &[][..]),
        };
        if let Some(shader) = slot {
            return Some(shader.clone());
        }
        let properties: BTreeSet<String> = uniforms.iter().map(|s| (*s).to_owned()).collect();
        let shader = self.shaders.get_shader_group(name).and_then(|g| g.get_or_create_shader(&properties));
        if shader.is_none() {
            log::warn!("custom drawable layer: shader {name} is not registered");
        }
        *slot = shader.clone();
        shader
    }
}

/// Render layer driven by a [`CustomDrawableLayerHost`].
pub struct CustomDrawableLayer {
    id: String,
    layer_index: i32,
    host: Box<dyn CustomDrawableLayerHost>,
    group: Option<LayerGroupRef>,
    initialized: bool,
}

impl CustomDrawableLayer {
    pub fn new(id: impl Into<String>, layer_index: i32, host: Box<dyn CustomDrawableLayerHost>) -> Self {
        Self { id: id.into(), layer_index, host, group: None, initialized: false }
    }
}

impl RenderLayer for CustomDrawableLayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn layer_index(&self) -> i32 {
        self.layer_index
    }

    fn layer_group(&self) -> Option<LayerGroupRef> {
        self.group.clone()
    }

    fn update(&mut self, params: &mut LayerUpdateParameters<'_>) {
        if !self.initialized {
            self.host.initialize();
            self.initialized = true;
        }
        let mut interface = Interface::new(
            &self.id,
            self.layer_index,
            &mut self.group,
            params.shaders,
            params.context,
            params.state,
            params.changes,
        );
        self.host.update(&mut interface);
        interface.finish();
    }
}

impl Drop for CustomDrawableLayer {
    fn drop(&mut self) {
        if self.initialized {
            self.host.deinitialize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::backend::headless::{HeadlessContext, HeadlessTexture, builtin_shader_registry};
    use crate::gfx::{LineCapType, LineJoinType};
    use crate::renderer::RenderOrchestrator;
    use crate::tile::EXTENT;

    const TILE: OverscaledTileId = OverscaledTileId::new(10, 163, 395);

    fn square(size: i16) -> GeometryCollection {
        vec![vec![
            GeometryCoordinate::new(0, 0),
            GeometryCoordinate::new(size, 0),
            GeometryCoordinate::new(size, size),
            GeometryCoordinate::new(0, size),
            GeometryCoordinate::new(0, 0),
        ]]
    }

    struct SceneHost {
        updates: Arc<AtomicUsize>,
        deinitialized: Arc<AtomicUsize>,
    }

    impl CustomDrawableLayerHost for SceneHost {
        fn update(&mut self, interface: &mut Interface<'_>) {
            self.updates.fetch_add(1, Ordering::Relaxed);
            if interface.drawable_count() > 0 {
                return;
            }
            interface.set_tile_id(TILE);

            let mut line = LineOptions { color: Color::red(), width: 8.0, ..Default::default() };
            line.geometry.begin_cap = LineCapType::Round;
            line.geometry.end_cap = LineCapType::Round;
            line.geometry.join = LineJoinType::Round;
            interface.set_line_options(line);
            let size = EXTENT as i16 / 2;
            interface.add_polyline(&[
                GeometryCoordinate::new(0, 0),
                GeometryCoordinate::new(size, 0),
                GeometryCoordinate::new(size / 2, size / 2),
            ]);

            interface.set_fill_options(FillOptions { color: Color::green(), opacity: 0.5 });
            interface.add_fill(&square(1024));

            interface.set_symbol_options(SymbolOptions {
                texture: Some(Arc::new(HeadlessTexture::new(8, 8))),
                ..Default::default()
            });
            interface.add_symbol(GeometryCoordinate::new(100, 200));
        }

        fn deinitialize(&mut self) {
            self.deinitialized.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn update(layer: &mut CustomDrawableLayer, context: &HeadlessContext, shaders: &ShaderRegistry) -> Vec<ChangeRequest> {
        let state = TransformState::new(512, 512).with_camera([0.5, 0.5], 10.0, 0.0, 0.0);
        let mut changes = Vec::new();
        let mut params = LayerUpdateParameters { shaders, context, state: &state, changes: &mut changes };
        layer.update(&mut params);
        changes
    }

    // ── layer lifecycle ──

    #[test]
    fn first_update_creates_group_and_drawables() {
        let context = HeadlessContext::new(64, 64);
        let shaders = builtin_shader_registry();
        let updates = Arc::new(AtomicUsize::new(0));
        let deinitialized = Arc::new(AtomicUsize::new(0));
        let host = SceneHost { updates: updates.clone(), deinitialized: deinitialized.clone() };
        let mut layer = CustomDrawableLayer::new("custom", 3, Box::new(host));

        let changes = update(&mut layer, &context, &shaders);
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0], ChangeRequest::AddLayerGroup { replace: false, .. }));

        let group = layer.layer_group().unwrap();
        {
            let guard = group.lock().unwrap();
            assert_eq!(guard.layer_index(), 3);
            assert_eq!(guard.drawable_count(), 3);
            let mut names = Vec::new();
            guard.observe_drawables(&mut |d| {
                assert_eq!(d.tile_id(), Some(TILE));
                assert!(d.has_render_pass(RenderPass::TRANSLUCENT));
                names.push(d.name().to_owned());
            });
            names.sort();
            assert_eq!(names, ["fill", "lines", "symbol"]);
        }

        assert!(update(&mut layer, &context, &shaders).is_empty());
        assert_eq!(group.lock().unwrap().drawable_count(), 3);
        assert_eq!(updates.load(Ordering::Relaxed), 2);

        drop(layer);
        assert_eq!(deinitialized.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn drawables_carry_tweakers_for_their_kind() {
        let context = HeadlessContext::new(64, 64);
        let shaders = builtin_shader_registry();
        let host = SceneHost { updates: Arc::default(), deinitialized: Arc::default() };
        let mut layer = CustomDrawableLayer::new("custom", 0, Box::new(host));
        update(&mut layer, &context, &shaders);

        let group = layer.layer_group().unwrap();
        let guard = group.lock().unwrap();
        guard.observe_drawables(&mut |d| {
            assert_eq!(d.tweakers().len(), 1, "{}", d.name());
            match d.name() {
                "symbol" => {
                    assert_eq!(d.vertex_count(), 4);
                    assert_eq!(d.indexes(), &[0, 1, 2, 1, 2, 3]);
                    assert_eq!(d.textures().len(), 1);
                }
                "fill" => assert_eq!(d.indexes().len(), 6),
                _ => assert!(d.vertex_attributes().get("a_pos_normal").is_some()),
            }
        });
    }

    #[test]
    fn symbol_vertices_encode_center_and_corner() {
        let context = HeadlessContext::new(64, 64);
        let shaders = builtin_shader_registry();
        let state = TransformState::new(256, 256);
        let mut changes = Vec::new();
        let mut group = None;
        let mut interface = Interface::new("s", 0, &mut group, &shaders, &context, &state, &mut changes);
        interface.set_tile_id(TILE);
        interface.set_symbol_options(SymbolOptions {
            texture_coordinates: [[0.25, 0.5], [0.75, 1.0]],
            ..Default::default()
        });
        interface.add_symbol(GeometryCoordinate::new(10, 20));
        interface.finish();

        let group = group.unwrap();
        let guard = group.lock().unwrap();
        let tiles = guard.as_any().downcast_ref::<TileLayerGroup>().unwrap();
        let d = tiles.drawable(RenderPass::TRANSLUCENT, TILE).unwrap();
        let raw = d.vertex_attributes().get(POSITION_ATTRIBUTE).and_then(|a| a.shared_raw_data()).unwrap();
        let vertices: &[SymbolIconVertex] = bytemuck::cast_slice(&raw.data);
        assert_eq!(vertices[0].a_pos, [20.0, 40.0]);
        assert_eq!(vertices[3].a_pos, [21.0, 41.0]);
        assert_eq!(vertices[1].a_tex, [0.75, 0.5]);
        assert_eq!(vertices[2].a_tex, [0.25, 1.0]);
    }

    #[test]
    fn drawables_without_tile_are_dropped() {
        let context = HeadlessContext::new(64, 64);
        let shaders = builtin_shader_registry();
        let state = TransformState::new(256, 256);
        let mut changes = Vec::new();
        let mut group = None;
        let mut interface = Interface::new("s", 0, &mut group, &shaders, &context, &state, &mut changes);
        interface.add_fill(&square(100));
        interface.finish();
        assert_eq!(interface.drawable_count(), 0);
    }

    #[test]
    fn missing_shader_skips_geometry() {
        let context = HeadlessContext::new(64, 64);
        let shaders = ShaderRegistry::new();
        let state = TransformState::new(256, 256);
        let mut changes = Vec::new();
        let mut group = None;
        let mut interface = Interface::new("s", 0, &mut group, &shaders, &context, &state, &mut changes);
        interface.set_tile_id(TILE);
        interface.add_fill(&square(100));
        interface.finish();
        assert_eq!(interface.drawable_count(), 0);
    }

    #[test]
    fn orchestrator_picks_up_layer_group() {
        let context = HeadlessContext::new(64, 64);
        let shaders = builtin_shader_registry();
        let state = TransformState::new(512, 512).with_camera([0.5, 0.5], 10.0, 0.0, 0.0);
        let host = SceneHost { updates: Arc::default(), deinitialized: Arc::default() };

        let mut o = RenderOrchestrator::new();
        o.add_render_layer(Box::new(CustomDrawableLayer::new("custom", 2, Box::new(host))));
        o.update_layers(&shaders, &context, &state);
        o.process_changes();
        assert_eq!(o.num_layer_groups(), 1);
        let group = o.layer_group(2).unwrap();
        assert_eq!(group.lock().unwrap().drawable_count(), 3);
        assert!(o.remove_render_layer("custom"));
        o.process_changes();
        assert_eq!(o.num_layer_groups(), 0);
    }
}
