use core::fmt;

/// Number of tile units along one edge of a tile.
pub const EXTENT: f64 = 8192.0;

/// Size of a tile in logical pixels at its native zoom.
pub const TILE_SIZE: f64 = 512.0;

/// Tile address in the canonical (unwrapped, non-overscaled) pyramid.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct CanonicalTileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl CanonicalTileId {
    #[inline]
    pub const fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

/// Canonical tile plus the world copy it is rendered in.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct UnwrappedTileId {
    pub wrap: i16,
    pub canonical: CanonicalTileId,
}

impl UnwrappedTileId {
    #[inline]
    pub const fn new(z: u8, x: u32, y: u32) -> Self {
        Self { wrap: 0, canonical: CanonicalTileId::new(z, x, y) }
    }

    #[inline]
    pub const fn with_wrap(wrap: i16, canonical: CanonicalTileId) -> Self {
        Self { wrap, canonical }
    }

    /// Converts a length in logical pixels at `zoom` into tile units of this tile.
    #[inline]
    pub fn pixels_to_tile_units(&self, pixel_value: f64, zoom: f64) -> f64 {
        pixel_value * (EXTENT / (TILE_SIZE * 2f64.powf(zoom - self.canonical.z as f64)))
    }
}

/// Tile address including the zoom level the data is displayed at.
///
/// `overscaled_z >= canonical.z`; overscaling happens when the map is zoomed past the
/// source's maximum zoom.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct OverscaledTileId {
    pub overscaled_z: u8,
    pub wrap: i16,
    pub canonical: CanonicalTileId,
}

impl OverscaledTileId {
    #[inline]
    pub const fn new(z: u8, x: u32, y: u32) -> Self {
        Self { overscaled_z: z, wrap: 0, canonical: CanonicalTileId::new(z, x, y) }
    }

    #[inline]
    pub fn overscaled(overscaled_z: u8, wrap: i16, canonical: CanonicalTileId) -> Self {
        debug_assert!(overscaled_z >= canonical.z);
        Self { overscaled_z, wrap, canonical }
    }

    #[inline]
    pub fn to_unwrapped(&self) -> UnwrappedTileId {
        UnwrappedTileId::with_wrap(self.wrap, self.canonical)
    }

    /// `2^(overscaled_z - z)`. Saturates for out-of-range fields, which are public.
    #[inline]
    pub fn overscale_factor(&self) -> u32 {
        let shift = self.overscaled_z.saturating_sub(self.canonical.z) as u32;
        1u32.checked_shl(shift).unwrap_or(u32::MAX)
    }
}

impl fmt::Display for OverscaledTileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.canonical.z, self.canonical.x, self.canonical.y, self.overscaled_z
        )?;
        if self.wrap != 0 {
            write!(f, "@{}", self.wrap)?;
        }
        Ok(())
    }
}
