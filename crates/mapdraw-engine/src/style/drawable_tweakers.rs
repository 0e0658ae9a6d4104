use crate::gfx::{Drawable, DrawableTweaker};
use crate::paint::Color;
use crate::renderer::{PaintParameters, TranslateAnchor, get_tile_matrix};
use crate::shaders::{
    CustomSymbolIconDrawableUbo, CustomSymbolIconParametersUbo, FillDrawableUbo, FillEvaluatedPropsUbo,
    FillInterpolateUbo, LineDynamicUbo, LineInterpolationUbo, LinePropertiesUbo, LineUbo, mat4_to_f32, write_ubo,
};
use crate::tile::UnwrappedTileId;

fn tile_matrix(tile_id: UnwrappedTileId, params: &PaintParameters) -> [f32; 16] {
    mat4_to_f32(&get_tile_matrix(tile_id, params, [0.0, 0.0], TranslateAnchor::Viewport, false, false, false))
}

/// Refreshes the line blocks of a custom line drawable.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LineDrawableTweaker {
    properties: LinePropertiesUbo,
}

impl LineDrawableTweaker {
    pub fn new(properties: LinePropertiesUbo) -> Self {
        Self { properties }
    }
}

impl DrawableTweaker for LineDrawableTweaker {
    fn execute(&self, drawable: &mut Drawable, params: &PaintParameters) {
        let Some(tile) = drawable.tile_id() else { return };
        let tile_id = tile.to_unwrapped();
        let zoom = params.state().zoom();
        let p2gl = params.pixels_to_gl_units;

        let line = LineUbo {
            matrix: tile_matrix(tile_id, params),
            ratio: (1.0 / tile_id.pixels_to_tile_units(1.0, zoom)) as f32,
            device_pixel_ratio: params.pixel_ratio,
            _pad: [0.0; 2],
        };
        let dynamic = LineDynamicUbo { units_to_pixels: [1.0 / p2gl[0], 1.0 / p2gl[1]], _pad: [0.0; 2] };

        let uniforms = drawable.mutable_uniform_buffers();
        write_ubo(uniforms, &dynamic);
        write_ubo(uniforms, &line);
        write_ubo(uniforms, &self.properties);
        write_ubo(uniforms, &LineInterpolationUbo::default());
    }
}

/// Refreshes the fill blocks of a custom fill drawable.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FillDrawableTweaker {
    color: Color,
    opacity: f32,
}

impl FillDrawableTweaker {
    pub fn new(color: Color, opacity: f32) -> Self {
        Self { color, opacity }
    }
}

impl DrawableTweaker for FillDrawableTweaker {
    fn execute(&self, drawable: &mut Drawable, params: &PaintParameters) {
        let Some(tile) = drawable.tile_id() else { return };
        let matrix = tile_matrix(tile.to_unwrapped(), params);

        let uniforms = drawable.mutable_uniform_buffers();
        write_ubo(uniforms, &FillDrawableUbo { matrix });
        write_ubo(
            uniforms,
            &FillEvaluatedPropsUbo { color: self.color.to_f32_array(), opacity: self.opacity, _pad: [0.0; 3] },
        );
        write_ubo(uniforms, &FillInterpolateUbo::default());
    }
}

/// Icon placement captured from the symbol options.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SymbolPlacement {
    /// Icon size in logical pixels (or in tile units when pitched with the map).
    pub size: [f32; 2],
    pub anchor: [f32; 2],
    pub angle_degrees: f32,
    pub scale_with_map: bool,
    pub pitch_with_map: bool,
}

/// Refreshes the icon blocks of a custom symbol drawable.
///
/// The extrusion scale maps the unit quad to screen pixels, or to tile units when the icon
/// is pitched with the map. Icons that scale with the map grow with zoom past their tile.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SymbolDrawableTweaker {
    placement: SymbolPlacement,
}

impl SymbolDrawableTweaker {
    pub fn new(placement: SymbolPlacement) -> Self {
        Self { placement }
    }

    fn extrude_scale(&self, tile_id: UnwrappedTileId, params: &PaintParameters) -> [f32; 2] {
        let p = &self.placement;
        let zoom = params.state().zoom();
        let tile_z = tile_id.canonical.z as f64;
        let p2tu = tile_id.pixels_to_tile_units(1.0, if p.scale_with_map { tile_z } else { zoom }) as f32;
        let f = if p.scale_with_map { 2f64.powf(zoom - tile_z) as f32 } else { 1.0 };
        let base = if p.pitch_with_map {
            [p2tu, p2tu]
        } else {
            [params.pixels_to_gl_units[0] * f, params.pixels_to_gl_units[1] * f]
        };
        [base[0] * p.size[0], base[1] * p.size[1]]
    }
}

impl DrawableTweaker for SymbolDrawableTweaker {
    fn execute(&self, drawable: &mut Drawable, params: &PaintParameters) {
        let Some(tile) = drawable.tile_id() else { return };
        let tile_id = tile.to_unwrapped();
        let state = params.state();
        let (w, h) = state.size();

        let parameters = CustomSymbolIconParametersUbo {
            extrude_scale: self.extrude_scale(tile_id, params),
            anchor: self.placement.anchor,
            angle_degrees: self.placement.angle_degrees,
            scale_with_map: self.placement.scale_with_map as u32,
            pitch_with_map: self.placement.pitch_with_map as u32,
            camera_to_center_distance: state.camera_to_center_distance() as f32,
            aspect_ratio: if h == 0 { 1.0 } else { w as f32 / h as f32 },
            _pad: [0.0; 3],
        };

        let uniforms = drawable.mutable_uniform_buffers();
        write_ubo(uniforms, &CustomSymbolIconDrawableUbo { matrix: tile_matrix(tile_id, params) });
        write_ubo(uniforms, &parameters);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::HeadlessDrawableImpl;
    use crate::map::TransformState;
    use crate::shaders::UniformBlockName;
    use crate::tile::OverscaledTileId;

    fn params(zoom: f64) -> PaintParameters {
        let state = TransformState::new(800, 400).with_camera([0.5, 0.5], zoom, 0.0, 0.0);
        PaintParameters::new(&state, 1.0, 1)
    }

    fn tile_drawable(tile: OverscaledTileId) -> Drawable {
        let mut d = Drawable::new("custom", Box::new(HeadlessDrawableImpl::default()));
        d.set_tile_id(Some(tile));
        d
    }

    fn placement() -> SymbolPlacement {
        SymbolPlacement {
            size: [20.0, 10.0],
            anchor: [0.5, 1.0],
            angle_degrees: 45.0,
            scale_with_map: false,
            pitch_with_map: false,
        }
    }

    // ── line ──

    #[test]
    fn line_tweaker_is_idempotent() {
        let props = LinePropertiesUbo {
            color: Color::red().to_f32_array(),
            blur: 0.0,
            opacity: 1.0,
            gapwidth: 0.0,
            offset: 0.0,
            width: 8.0,
            _pad: [0.0; 3],
        };
        let tweaker = LineDrawableTweaker::new(props);
        let mut d = tile_drawable(OverscaledTileId::new(10, 163, 395));
        let p = params(10.5);
        tweaker.execute(&mut d, &p);
        let first = d.uniform_buffers().clone();
        d.mutable_uniform_buffers().clear_dirty();
        tweaker.execute(&mut d, &p);
        assert_eq!(d.uniform_buffers().len(), 4);
        assert!(!d.uniform_buffers().is_dirty());
        for (name, buffer) in first.iter() {
            assert_eq!(d.uniform_buffers().get(name).map(|b| b.data()), Some(buffer.data()));
        }
        assert_eq!(d.uniform_buffers().read::<LinePropertiesUbo>(LinePropertiesUbo::NAME), Some(props));
    }

    #[test]
    fn line_tweaker_skips_drawables_without_tile() {
        let tweaker = LineDrawableTweaker::new(bytemuck::Zeroable::zeroed());
        let mut d = Drawable::new("custom", Box::new(HeadlessDrawableImpl::default()));
        tweaker.execute(&mut d, &params(3.0));
        assert!(d.uniform_buffers().is_empty());
    }

    // ── fill ──

    #[test]
    fn fill_tweaker_writes_color_and_opacity() {
        let tweaker = FillDrawableTweaker::new(Color::blue(), 0.25);
        let mut d = tile_drawable(OverscaledTileId::new(2, 1, 1));
        tweaker.execute(&mut d, &params(2.0));
        let props: FillEvaluatedPropsUbo = d.uniform_buffers().read(FillEvaluatedPropsUbo::NAME).unwrap();
        assert_eq!(props.color, Color::blue().to_f32_array());
        assert_eq!(props.opacity, 0.25);
        assert!(d.uniform_buffers().get(FillDrawableUbo::NAME).is_some());
    }

    // ── symbol ──

    #[test]
    fn screen_aligned_icon_scales_with_pixels() {
        let tweaker = SymbolDrawableTweaker::new(placement());
        let mut d = tile_drawable(OverscaledTileId::new(3, 2, 2));
        let p = params(4.0);
        tweaker.execute(&mut d, &p);
        let ubo: CustomSymbolIconParametersUbo =
            d.uniform_buffers().read(CustomSymbolIconParametersUbo::NAME).unwrap();
        assert_eq!(ubo.extrude_scale, [p.pixels_to_gl_units[0] * 20.0, p.pixels_to_gl_units[1] * 10.0]);
        assert_eq!(ubo.aspect_ratio, 2.0);
        assert_eq!(ubo.angle_degrees, 45.0);
        assert_eq!((ubo.scale_with_map, ubo.pitch_with_map), (0, 0));
    }

    #[test]
    fn icon_scaling_with_map_grows_past_tile_zoom() {
        let tweaker = SymbolDrawableTweaker::new(SymbolPlacement { scale_with_map: true, ..placement() });
        let tile = OverscaledTileId::new(3, 2, 2);
        let p = params(5.0);
        let scale = tweaker.extrude_scale(tile.to_unwrapped(), &p);
        assert_eq!(scale[0], p.pixels_to_gl_units[0] * 4.0 * 20.0);
    }

    #[test]
    fn pitched_icon_uses_tile_units() {
        let pitched = SymbolPlacement { pitch_with_map: true, ..placement() };
        let tweaker = SymbolDrawableTweaker::new(pitched);
        let tile = OverscaledTileId::new(3, 2, 2).to_unwrapped();
        let scale = tweaker.extrude_scale(tile, &params(4.0));
        let p2tu = tile.pixels_to_tile_units(1.0, 4.0) as f32;
        assert_eq!(scale, [p2tu * 20.0, p2tu * 10.0]);
    }
}
