use glam::{DMat4, DVec3};

use crate::tile::{EXTENT, TILE_SIZE, UnwrappedTileId};

/// Default vertical field of view (radians).
pub const DEFAULT_FOV: f64 = 0.6435011087932844;

/// Camera state the renderer projects tiles with.
///
/// `center` is in normalized world coordinates (`0..1` on both axes, origin top-left).
/// Angles are radians.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformState {
    width: u32,
    height: u32,
    zoom: f64,
    bearing: f64,
    pitch: f64,
    center: [f64; 2],
    fov: f64,
}

impl TransformState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            zoom: 0.0,
            bearing: 0.0,
            pitch: 0.0,
            center: [0.5, 0.5],
            fov: DEFAULT_FOV,
        }
    }

    pub fn with_camera(mut self, center: [f64; 2], zoom: f64, bearing: f64, pitch: f64) -> Self {
        self.center = center;
        self.zoom = zoom;
        self.bearing = bearing;
        self.pitch = pitch;
        self
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.max(0.0);
    }

    pub fn set_bearing(&mut self, bearing: f64) {
        self.bearing = bearing;
    }

    pub fn set_pitch(&mut self, pitch: f64) {
        self.pitch = pitch.clamp(0.0, 60f64.to_radians());
    }

    pub fn set_center(&mut self, center: [f64; 2]) {
        self.center = center;
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    #[inline]
    pub fn integer_zoom(&self) -> f64 {
        self.zoom.floor()
    }

    #[inline]
    pub fn bearing(&self) -> f64 {
        self.bearing
    }

    #[inline]
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    #[inline]
    pub fn fov(&self) -> f64 {
        self.fov
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        2f64.powf(self.zoom)
    }

    /// World size in logical pixels at the current zoom.
    #[inline]
    pub fn world_size(&self) -> f64 {
        TILE_SIZE * self.scale()
    }

    pub fn camera_to_center_distance(&self) -> f64 {
        0.5 * self.height as f64 / (self.fov / 2.0).tan()
    }

    /// Tile-units-to-world-pixels matrix for `tile_id`, without projection.
    pub fn matrix_for(&self, tile_id: UnwrappedTileId) -> DMat4 {
        let tile_scale = (1u64 << tile_id.canonical.z) as f64;
        let s = self.world_size() / tile_scale;
        let x = (tile_id.canonical.x as f64 + tile_id.wrap as f64 * tile_scale) * s;
        let y = tile_id.canonical.y as f64 * s;
        DMat4::from_translation(DVec3::new(x, y, 0.0))
            * DMat4::from_scale(DVec3::new(s / EXTENT, s / EXTENT, 1.0))
    }

    /// World-pixels-to-clip-space projection.
    ///
    /// `near_z` moves the near plane; `aligned` snaps the center to the pixel grid.
    pub fn proj_matrix(&self, near_z: f64, aligned: bool) -> DMat4 {
        let camera_to_center = self.camera_to_center_distance();
        let half_fov = self.fov / 2.0;
        let ground_angle = std::f64::consts::FRAC_PI_2 + self.pitch;
        let top_half_surface_distance =
            half_fov.sin() * camera_to_center / (std::f64::consts::PI - ground_angle - half_fov).sin();
        let furthest = (std::f64::consts::FRAC_PI_2 - self.pitch).cos() * top_half_surface_distance
            + camera_to_center;
        let far_z = furthest * 1.01;
        let near_z = near_z.clamp(f64::EPSILON, far_z * 0.5);

        let aspect = self.width as f64 / self.height as f64;
        let world = self.world_size();
        let cx = self.center[0] * world;
        let cy = self.center[1] * world;

        let mut m = DMat4::perspective_rh_gl(self.fov, aspect, near_z, far_z)
            * DMat4::from_scale(DVec3::new(1.0, -1.0, 1.0))
            * DMat4::from_translation(DVec3::new(0.0, 0.0, -camera_to_center))
            * DMat4::from_rotation_x(self.pitch)
            * DMat4::from_rotation_z(self.bearing)
            * DMat4::from_translation(DVec3::new(-cx, -cy, 0.0));

        if aligned {
            let x_shift = (self.width % 2) as f64 / 2.0;
            let y_shift = (self.height % 2) as f64 / 2.0;
            let bearing_cos = self.bearing.cos();
            let bearing_sin = (-self.bearing).sin();
            let dxa = -cx.fract() + bearing_cos * x_shift + bearing_sin * y_shift;
            let dya = -cy.fract() + bearing_cos * y_shift + bearing_sin * x_shift;
            m *= DMat4::from_translation(DVec3::new(dxa, dya, 0.0));
        }
        m
    }

    /// Clip-space size of one logical pixel, y flipped.
    #[inline]
    pub fn pixels_to_gl_units(&self) -> [f32; 2] {
        [2.0 / self.width as f32, -2.0 / self.height as f32]
    }
}

/// Projection matrices derived from a [`TransformState`] once per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformParameters {
    pub state: TransformState,
    pub proj_matrix: DMat4,
    /// Near plane pushed out to improve depth precision for geometry close to the camera.
    pub near_clipped_proj_matrix: DMat4,
    pub aligned_proj_matrix: DMat4,
}

impl TransformParameters {
    pub fn new(state: &TransformState) -> Self {
        let near_clipped = 0.1 * state.camera_to_center_distance();
        Self {
            state: state.clone(),
            proj_matrix: state.proj_matrix(1.0, false),
            near_clipped_proj_matrix: state.proj_matrix(near_clipped, false),
            aligned_proj_matrix: state.proj_matrix(1.0, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec4;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn matrix_for_maps_tile_corners_to_world_pixels() {
        let state = TransformState::new(512, 512).with_camera([0.5, 0.5], 1.0, 0.0, 0.0);
        let m = state.matrix_for(UnwrappedTileId::new(1, 1, 0));
        let origin = m * DVec4::new(0.0, 0.0, 0.0, 1.0);
        let far = m * DVec4::new(EXTENT, EXTENT, 0.0, 1.0);
        assert!(approx(origin.x, 512.0) && approx(origin.y, 0.0));
        assert!(approx(far.x, 1024.0) && approx(far.y, 512.0));
    }

    #[test]
    fn matrix_for_applies_wrap() {
        let state = TransformState::new(512, 512);
        let m = state.matrix_for(UnwrappedTileId::with_wrap(1, crate::tile::CanonicalTileId::new(0, 0, 0)));
        let origin = m * DVec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(approx(origin.x, 512.0));
    }

    #[test]
    fn center_projects_to_clip_origin() {
        let state = TransformState::new(800, 600).with_camera([0.25, 0.75], 2.0, 0.3, 0.0);
        let world = state.world_size();
        let p = state.proj_matrix(1.0, false) * DVec4::new(0.25 * world, 0.75 * world, 0.0, 1.0);
        assert!(approx(p.x / p.w, 0.0));
        assert!(approx(p.y / p.w, 0.0));
    }

    #[test]
    fn one_pixel_right_of_center_is_one_pixel_in_clip_space() {
        let state = TransformState::new(800, 600).with_camera([0.5, 0.5], 3.0, 0.0, 0.0);
        let world = state.world_size();
        let p = state.proj_matrix(1.0, false) * DVec4::new(0.5 * world + 1.0, 0.5 * world, 0.0, 1.0);
        assert!(approx(p.x / p.w, 2.0 / 800.0));
    }

    #[test]
    fn near_clipped_projection_differs_only_in_depth() {
        let state = TransformState::new(800, 600).with_camera([0.5, 0.5], 3.0, 0.0, 0.0);
        let params = TransformParameters::new(&state);
        let world = state.world_size();
        let v = DVec4::new(0.5 * world + 10.0, 0.5 * world - 4.0, 0.0, 1.0);
        let a = params.proj_matrix * v;
        let b = params.near_clipped_proj_matrix * v;
        assert!(approx(a.x / a.w, b.x / b.w));
        assert!(approx(a.y / a.w, b.y / b.w));
        assert!(!approx(a.z / a.w, b.z / b.w));
    }
}
