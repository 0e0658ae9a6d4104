use std::sync::atomic::{AtomicBool, Ordering};

use crate::gfx::{Drawable, DrawableData};
use crate::paint::Color;
use crate::shaders::{
    LINE_IMAGE_TEXTURE, LineDynamicUbo, LineGradientUbo, LineInterpolationUbo, LinePatternUbo, LinePropertiesUbo,
    LineSdfUbo, LineUbo, mat4_to_f32, write_ubo,
};
use crate::tile::UnwrappedTileId;

use super::super::layer_group::LayerGroupBase;
use super::super::layer_tweaker::LayerTweaker;
use super::super::paint_parameters::PaintParameters;
use super::super::tile_matrix::{TranslateAnchor, get_tile_matrix};

/// Line drawable flavour, stored in the drawable's sub-type tag.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LineType {
    Simple = 0,
    Pattern = 1,
    Sdf = 2,
    Gradient = 3,
}

impl TryFrom<u8> for LineType {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, u8> {
        match tag {
            0 => Ok(LineType::Simple),
            1 => Ok(LineType::Pattern),
            2 => Ok(LineType::Sdf),
            3 => Ok(LineType::Gradient),
            other => Err(other),
        }
    }
}

impl From<LineType> for u8 {
    fn from(t: LineType) -> u8 {
        t as u8
    }
}

/// Evaluated paint properties of a line layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LinePaintProperties {
    pub color: Color,
    pub blur: f32,
    pub opacity: f32,
    pub gap_width: f32,
    pub offset: f32,
    pub width: f32,
    pub translate: [f32; 2],
    pub translate_anchor: TranslateAnchor,
    /// Dash lengths in line widths. Used by SDF lines only.
    pub dasharray: Vec<f32>,
}

impl Default for LinePaintProperties {
    fn default() -> Self {
        Self {
            color: Color::black(),
            blur: 0.0,
            opacity: 1.0,
            gap_width: 0.0,
            offset: 0.0,
            width: 1.0,
            translate: [0.0, 0.0],
            translate_anchor: TranslateAnchor::Map,
            dasharray: Vec::new(),
        }
    }
}

impl LinePaintProperties {
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

/// Writes line uniforms for every drawable of a line layer group.
///
/// Layer-wide blocks go into the group (and reach drawables through propagation); the
/// per-drawable block depends on the drawable's [`LineType`].
pub struct LineLayerTweaker {
    id: String,
    properties: LinePaintProperties,
    warned_unknown_type: AtomicBool,
}

impl LineLayerTweaker {
    pub fn new(id: impl Into<String>, properties: LinePaintProperties) -> Self {
        Self { id: id.into(), properties, warned_unknown_type: AtomicBool::new(false) }
    }

    #[inline]
    pub fn properties(&self) -> &LinePaintProperties {
        &self.properties
    }

    fn tweak_drawable(&self, drawable: &mut Drawable, params: &PaintParameters) {
        if drawable.shader().is_none() {
            return;
        }
        let Some(tile) = drawable.tile_id() else { return };
        let tile_id = tile.to_unwrapped();

        let kind = match LineType::try_from(drawable.sub_type()) {
            Ok(kind) => kind,
            Err(tag) => {
                if !self.warned_unknown_type.swap(true, Ordering::Relaxed) {
                    log::error!("LineLayerTweaker {}: unknown line type {tag}; drawable skipped", self.id);
                }
                return;
            }
        };

        let state = params.state();
        let zoom = state.zoom();
        let matrix = mat4_to_f32(&get_tile_matrix(
            tile_id,
            params,
            self.properties.translate,
            self.properties.translate_anchor,
            false,
            false,
            false,
        ));
        let ratio = (1.0 / tile_id.pixels_to_tile_units(1.0, zoom)) as f32;

        match kind {
            LineType::Simple => write_ubo(
                drawable.mutable_uniform_buffers(),
                &LineUbo { matrix, ratio, device_pixel_ratio: params.pixel_ratio, _pad: [0.0; 2] },
            ),
            LineType::Gradient => {
                write_ubo(drawable.mutable_uniform_buffers(), &LineGradientUbo { matrix, ratio, _pad: [0.0; 3] })
            }
            LineType::Pattern => {
                let (w, h) = drawable.texture(LINE_IMAGE_TEXTURE).map(|t| t.size()).unwrap_or((0, 0));
                let crossfade = params.crossfade;
                let ubo = LinePatternUbo {
                    matrix,
                    scale: [
                        params.pixel_ratio,
                        (1.0 / tile_id.pixels_to_tile_units(1.0, state.integer_zoom())) as f32,
                        crossfade.from_scale,
                        crossfade.to_scale,
                    ],
                    texsize: [w as f32, h as f32],
                    ratio,
                    fade: crossfade.t,
                };
                write_ubo(drawable.mutable_uniform_buffers(), &ubo);
            }
            LineType::Sdf => self.tweak_sdf(drawable, params, tile_id, matrix, ratio),
        }
    }

    fn tweak_sdf(
        &self,
        drawable: &mut Drawable,
        params: &PaintParameters,
        tile_id: UnwrappedTileId,
        matrix: [f32; 16],
        ratio: f32,
    ) {
        let Some(DrawableData::Line { pattern_cap }) = drawable.data().cloned() else { return };
        let Some(atlas) = params.line_atlas.as_ref() else {
            drawable.set_enabled(false);
            return;
        };
        let Some(pos) = atlas.get_dash_position(&self.properties.dasharray, pattern_cap) else {
            drawable.set_enabled(false);
            return;
        };

        match params.line_atlas_texture.clone() {
            Some(texture) => {
                drawable.set_texture(texture, LINE_IMAGE_TEXTURE);
                drawable.set_enabled(true);
            }
            None if drawable.texture(LINE_IMAGE_TEXTURE).is_none() => {
                drawable.set_enabled(false);
                return;
            }
            None => {}
        }

        let crossfade = params.crossfade;
        let integer_zoom = params.state().integer_zoom();
        let width_a = pos.width * crossfade.from_scale;
        let width_b = pos.width * crossfade.to_scale;
        let ubo = LineSdfUbo {
            matrix,
            patternscale_a: [
                (1.0 / tile_id.pixels_to_tile_units(width_a as f64, integer_zoom)) as f32,
                -pos.height / 2.0,
            ],
            patternscale_b: [
                (1.0 / tile_id.pixels_to_tile_units(width_b as f64, integer_zoom)) as f32,
                -pos.height / 2.0,
            ],
            ratio,
            tex_y_a: pos.y,
            tex_y_b: pos.y,
            sdfgamma: atlas.size().0 as f32 / (width_a.min(width_b) * 256.0 * params.pixel_ratio) / 2.0,
            mix: crossfade.t,
            _pad: [0.0; 3],
        };
        write_ubo(drawable.mutable_uniform_buffers(), &ubo);
    }
}

impl LayerTweaker for LineLayerTweaker {
    fn id(&self) -> &str {
        &self.id
    }

    fn execute(&self, group: &mut dyn LayerGroupBase, params: &PaintParameters) {
        let p2gl = params.pixels_to_gl_units;
        let uniforms = group.mutable_uniform_buffers();
        write_ubo(uniforms, &self.properties.properties_ubo());
        write_ubo(uniforms, &LineDynamicUbo { units_to_pixels: [1.0 / p2gl[0], 1.0 / p2gl[1]], _pad: [0.0; 2] });
        write_ubo(uniforms, &LineInterpolationUbo::default());

        group.observe_drawables_mut(&mut |drawable| self.tweak_drawable(drawable, params));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::backend::headless::{HeadlessDrawableImpl, HeadlessShader, HeadlessTexture};
    use crate::gfx::{LinePatternCap, RenderPass, ShaderProgramInfo};
    use crate::map::TransformState;
    use crate::renderer::{LineAtlas, TileLayerGroup};
    use crate::shaders::{LINE_SHADER, UniformBlockName};
    use crate::tile::OverscaledTileId;

    const TILE: OverscaledTileId = OverscaledTileId::new(2, 1, 1);

    fn params() -> PaintParameters {
        let state = TransformState::new(512, 512).with_camera([0.5, 0.5], 2.5, 0.3, 0.0);
        PaintParameters::new(&state, 2.0, 1)
    }

    fn line(kind: u8) -> Box<Drawable> {
        let mut d = Drawable::new("line", Box::new(HeadlessDrawableImpl::default()));
        d.set_shader(Some(Arc::new(HeadlessShader::new(ShaderProgramInfo::new(LINE_SHADER)))));
        d.set_sub_type(kind);
        Box::new(d)
    }

    fn group_with(d: Box<Drawable>) -> TileLayerGroup {
        let mut group = TileLayerGroup::new(0, 4, "lines");
        group.add_drawable(RenderPass::TRANSLUCENT, TILE, d);
        group
    }

    fn first(group: &TileLayerGroup) -> &Drawable {
        group.drawable(RenderPass::TRANSLUCENT, TILE).unwrap()
    }

    // ── simple lines ──

    #[test]
    fn simple_line_writes_layer_and_drawable_blocks() {
        let tweaker = LineLayerTweaker::new("roads", LinePaintProperties { width: 4.0, ..Default::default() });
        let mut group = group_with(line(LineType::Simple.into()));
        let p = params();
        tweaker.execute(&mut group, &p);

        let props: LinePropertiesUbo = group.uniform_buffers().read(LinePropertiesUbo::NAME).unwrap();
        assert_eq!(props.width, 4.0);
        let dynamic: LineDynamicUbo = group.uniform_buffers().read(LineDynamicUbo::NAME).unwrap();
        assert_eq!(dynamic.units_to_pixels[0], 1.0 / p.pixels_to_gl_units[0]);

        let ubo: LineUbo = first(&group).uniform_buffers().read(LineUbo::NAME).unwrap();
        let expected = 1.0 / TILE.to_unwrapped().pixels_to_tile_units(1.0, 2.5);
        assert!((ubo.ratio as f64 - expected).abs() < 1e-6);
        assert_eq!(ubo.device_pixel_ratio, 2.0);
    }

    #[test]
    fn execute_is_idempotent() {
        let tweaker = LineLayerTweaker::new("roads", LinePaintProperties::default());
        let mut group = group_with(line(LineType::Gradient.into()));
        let p = params();
        tweaker.execute(&mut group, &p);
        let once = first(&group).uniform_buffers().clone();
        let layer_once = group.uniform_buffers().clone();
        tweaker.execute(&mut group, &p);
        assert_eq!(first(&group).uniform_buffers().get(LineGradientUbo::NAME), once.get(LineGradientUbo::NAME));
        assert_eq!(group.uniform_buffers(), &layer_once);
    }

    #[test]
    fn drawable_without_tile_is_left_alone() {
        let tweaker = LineLayerTweaker::new("roads", LinePaintProperties::default());
        let mut d = line(LineType::Simple.into());
        tweaker.tweak_drawable(&mut d, &params());
        assert!(d.uniform_buffers().is_empty());
    }

    // ── dispatch ──

    #[test]
    fn unknown_type_gets_no_drawable_block() {
        let tweaker = LineLayerTweaker::new("roads", LinePaintProperties::default());
        let mut group = group_with(line(9));
        tweaker.execute(&mut group, &params());
        let d = first(&group);
        assert!(d.is_enabled());
        assert!(d.uniform_buffers().get(LineUbo::NAME).is_none());
    }

    #[test]
    fn unknown_type_only_skips_the_current_frame() {
        let tweaker = LineLayerTweaker::new("roads", LinePaintProperties::default());
        let mut group = group_with(line(9));
        let p = params();
        tweaker.execute(&mut group, &p);

        group.observe_drawables_mut(&mut |d| d.set_sub_type(LineType::Simple.into()));
        tweaker.execute(&mut group, &p);

        let d = first(&group);
        assert!(d.is_enabled());
        let ubo: LineUbo = d.uniform_buffers().read(LineUbo::NAME).unwrap();
        assert_eq!(ubo.device_pixel_ratio, 2.0);
    }

    #[test]
    fn pattern_line_reads_texture_size() {
        let tweaker = LineLayerTweaker::new("rails", LinePaintProperties::default());
        let mut d = line(LineType::Pattern.into());
        d.set_texture(Arc::new(HeadlessTexture::new(32, 8)), LINE_IMAGE_TEXTURE);
        let mut group = group_with(d);
        tweaker.execute(&mut group, &params());
        let ubo: LinePatternUbo = first(&group).uniform_buffers().read(LinePatternUbo::NAME).unwrap();
        assert_eq!(ubo.texsize, [32.0, 8.0]);
        assert_eq!(ubo.scale[0], 2.0);
    }

    #[test]
    fn sdf_line_binds_atlas_texture() {
        let props = LinePaintProperties { dasharray: vec![2.0, 1.0], ..Default::default() };
        let tweaker = LineLayerTweaker::new("dashes", props);
        let mut d = line(LineType::Sdf.into());
        d.set_data(Some(DrawableData::Line { pattern_cap: LinePatternCap::Round }));
        let mut group = group_with(d);

        let mut p = params();
        p.line_atlas = Some(Arc::new(LineAtlas::new(256, 64)));
        p.line_atlas_texture = Some(Arc::new(HeadlessTexture::new(256, 64)));
        tweaker.execute(&mut group, &p);

        let d = first(&group);
        assert!(d.is_enabled());
        assert!(d.texture(LINE_IMAGE_TEXTURE).is_some());
        let ubo: LineSdfUbo = d.uniform_buffers().read(LineSdfUbo::NAME).unwrap();
        assert_eq!(ubo.patternscale_a[1], -7.5);
        assert_eq!(ubo.tex_y_a, ubo.tex_y_b);
    }

    #[test]
    fn sdf_line_without_atlas_is_disabled() {
        let props = LinePaintProperties { dasharray: vec![1.0, 1.0], ..Default::default() };
        let tweaker = LineLayerTweaker::new("dashes", props);
        let mut d = line(LineType::Sdf.into());
        d.set_data(Some(DrawableData::Line { pattern_cap: LinePatternCap::Square }));
        let mut group = group_with(d);
        tweaker.execute(&mut group, &params());
        assert!(!first(&group).is_enabled());
    }
}
