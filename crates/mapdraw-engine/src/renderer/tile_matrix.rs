use glam::{DMat4, DVec3};

use crate::gfx::{Drawable, DrawableTweaker};
use crate::map::TransformState;
use crate::shaders::{DrawableMatrixUbo, mat4_to_f32, write_ubo};
use crate::tile::UnwrappedTileId;

use super::paint_parameters::PaintParameters;

/// Frame of reference for a layer's translate property.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum TranslateAnchor {
    /// Translation rotates with the map.
    #[default]
    Map,
    /// Translation stays aligned with the screen.
    Viewport,
}

/// Applies a layer translation to a projected tile matrix.
///
/// With `in_viewport_pixel_units` the offset is added in clip space after projection
/// (one unit is one logical pixel on screen). Otherwise it is converted to tile units and
/// applied before projection.
pub fn translate_vtx_matrix(
    tile_id: UnwrappedTileId,
    tile_matrix: DMat4,
    translation: [f32; 2],
    anchor: TranslateAnchor,
    state: &TransformState,
    pixels_to_gl_units: [f32; 2],
    in_viewport_pixel_units: bool,
) -> DMat4 {
    if translation == [0.0, 0.0] {
        return tile_matrix;
    }

    let angle = match (in_viewport_pixel_units, anchor) {
        (true, TranslateAnchor::Map) => state.bearing(),
        (false, TranslateAnchor::Viewport) => -state.bearing(),
        _ => 0.0,
    };
    let (sin, cos) = angle.sin_cos();
    let (tx, ty) = (translation[0] as f64, translation[1] as f64);
    let x = cos * tx - sin * ty;
    let y = sin * tx + cos * ty;

    if in_viewport_pixel_units {
        let clip = DVec3::new(x * pixels_to_gl_units[0] as f64, y * pixels_to_gl_units[1] as f64, 0.0);
        DMat4::from_translation(clip) * tile_matrix
    } else {
        let zoom = state.zoom();
        let local = DVec3::new(tile_id.pixels_to_tile_units(x, zoom), tile_id.pixels_to_tile_units(y, zoom), 0.0);
        tile_matrix * DMat4::from_translation(local)
    }
}

/// Projection × tile matrix for `tile_id` in the current frame, with translation applied.
pub fn get_tile_matrix(
    tile_id: UnwrappedTileId,
    params: &PaintParameters,
    translation: [f32; 2],
    anchor: TranslateAnchor,
    near_clipped: bool,
    in_viewport_pixel_units: bool,
    aligned: bool,
) -> DMat4 {
    let projection = if aligned {
        &params.transform.aligned_proj_matrix
    } else if near_clipped {
        &params.transform.near_clipped_proj_matrix
    } else {
        &params.transform.proj_matrix
    };
    let state = params.state();
    let tile_matrix = *projection * state.matrix_for(tile_id);
    translate_vtx_matrix(
        tile_id,
        tile_matrix,
        translation,
        anchor,
        state,
        params.pixels_to_gl_units,
        in_viewport_pixel_units,
    )
}

/// Default tweaker: writes the tile matrix into `DrawableMatrixUBO`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct TileMatrixTweaker {
    pub translation: [f32; 2],
    pub anchor: TranslateAnchor,
    pub near_clipped: bool,
    pub in_viewport_pixel_units: bool,
}

impl DrawableTweaker for TileMatrixTweaker {
    fn execute(&self, drawable: &mut Drawable, params: &PaintParameters) {
        let Some(tile_id) = drawable.tile_id() else { return };
        let matrix = get_tile_matrix(
            tile_id.to_unwrapped(),
            params,
            self.translation,
            self.anchor,
            self.near_clipped,
            self.in_viewport_pixel_units,
            false,
        );
        write_ubo(drawable.mutable_uniform_buffers(), &DrawableMatrixUbo { matrix: mat4_to_f32(&matrix) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders::UniformBlockName;
    use glam::DVec4;

    fn params() -> PaintParameters {
        let state = TransformState::new(512, 512).with_camera([0.5, 0.5], 1.0, 0.0, 0.0);
        PaintParameters::new(&state, 1.0, 1)
    }

    fn ndc(m: DMat4, x: f64, y: f64) -> (f64, f64) {
        let p = m * DVec4::new(x, y, 0.0, 1.0);
        (p.x / p.w, p.y / p.w)
    }

    #[test]
    fn zero_translation_is_plain_projection() {
        let p = params();
        let tile = UnwrappedTileId::new(1, 0, 0);
        let m = get_tile_matrix(tile, &p, [0.0, 0.0], TranslateAnchor::Viewport, false, false, false);
        assert_eq!(m, p.transform.proj_matrix * p.state().matrix_for(tile));
    }

    #[test]
    fn viewport_pixel_translation_moves_in_screen_space() {
        let p = params();
        let tile = UnwrappedTileId::new(1, 0, 0);
        let base = get_tile_matrix(tile, &p, [0.0, 0.0], TranslateAnchor::Viewport, false, true, false);
        let moved = get_tile_matrix(tile, &p, [10.0, 0.0], TranslateAnchor::Viewport, false, true, false);
        let (x0, y0) = ndc(base, 100.0, 100.0);
        let (x1, y1) = ndc(moved, 100.0, 100.0);
        // 10 logical pixels on a 512 wide viewport.
        assert!((x1 - x0 - 10.0 * 2.0 / 512.0).abs() < 1e-9);
        assert!((y1 - y0).abs() < 1e-9);
    }

    #[test]
    fn map_translation_is_in_tile_units() {
        let p = params();
        let tile = UnwrappedTileId::new(1, 0, 0);
        let moved = get_tile_matrix(tile, &p, [4.0, 0.0], TranslateAnchor::Map, false, false, false);
        let base = get_tile_matrix(tile, &p, [0.0, 0.0], TranslateAnchor::Map, false, false, false);
        let units = tile.pixels_to_tile_units(4.0, 1.0);
        let (a, _) = ndc(moved, 0.0, 0.0);
        let (b, _) = ndc(base, units, 0.0);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn tweaker_skips_drawables_without_tile() {
        use crate::backend::headless::HeadlessDrawableImpl;
        let mut d = Drawable::new("d", Box::new(HeadlessDrawableImpl::default()));
        TileMatrixTweaker::default().execute(&mut d, &params());
        assert!(d.uniform_buffers().is_empty());
        d.set_tile_id(Some(crate::tile::OverscaledTileId::new(1, 0, 0)));
        TileMatrixTweaker::default().execute(&mut d, &params());
        assert!(d.uniform_buffers().get(DrawableMatrixUbo::NAME).is_some());
    }
}
