/// Premultiplied RGBA color.
///
/// Invariant:
/// - `rgb` components are stored in `[0, 1]` and already multiplied by `a`.
///
/// Style evaluation produces colors in this form; drawables and UBOs consume it
/// either directly (uniform blocks) or through [`Color::to_array`] (vertex attributes).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32, // premultiplied
    pub g: f32, // premultiplied
    pub b: f32, // premultiplied
    pub a: f32,
}

impl Color {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn transparent() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    #[inline]
    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    #[inline]
    pub const fn white() -> Self {
        Self::new(1.0, 1.0, 1.0, 1.0)
    }

    #[inline]
    pub const fn red() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0)
    }

    #[inline]
    pub const fn green() -> Self {
        Self::new(0.0, 1.0, 0.0, 1.0)
    }

    #[inline]
    pub const fn blue() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    /// Creates a premultiplied color from straight-alpha sRGB bytes (`0`–`255`).
    #[inline]
    pub fn from_srgb_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::from_straight(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0)
    }

    /// Creates a premultiplied color from straight alpha components.
    #[inline]
    pub fn from_straight(r: f32, g: f32, b: f32, a: f32) -> Self {
        let a = a.clamp(0.0, 1.0);
        Self {
            r: r.clamp(0.0, 1.0) * a,
            g: g.clamp(0.0, 1.0) * a,
            b: b.clamp(0.0, 1.0) * a,
            a,
        }
    }

    /// Partially scaled component array: `rgb` in `[0, 255]`, alpha left in `[0, 1]`.
    ///
    /// This is the representation vertex color attributes are built from; see
    /// [`crate::gfx::Drawable::color_attr_rgba`] for the inverse.
    #[inline]
    pub fn to_array(self) -> [f64; 4] {
        [
            self.r as f64 * 255.0,
            self.g as f64 * 255.0,
            self.b as f64 * 255.0,
            self.a as f64,
        ]
    }

    /// Returns the color scaled by `opacity` (all channels, since storage is premultiplied).
    #[inline]
    pub fn with_opacity(self, opacity: f32) -> Self {
        let o = opacity.clamp(0.0, 1.0);
        Self::new(self.r * o, self.g * o, self.b * o, self.a * o)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }

    #[inline]
    pub fn to_f32_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_array_scales_rgb_only() {
        let c = Color::new(1.0, 0.5, 0.0, 0.25);
        let a = c.to_array();
        assert_eq!(a[0], 255.0);
        assert_eq!(a[1], 127.5);
        assert_eq!(a[2], 0.0);
        assert_eq!(a[3], 0.25);
    }

    #[test]
    fn from_straight_premultiplies() {
        let c = Color::from_straight(1.0, 1.0, 1.0, 0.5);
        assert_eq!(c, Color::new(0.5, 0.5, 0.5, 0.5));
    }

    #[test]
    fn with_opacity_scales_alpha() {
        let c = Color::white().with_opacity(0.5);
        assert_eq!(c.a, 0.5);
        assert_eq!(c.r, 0.5);
    }
}
