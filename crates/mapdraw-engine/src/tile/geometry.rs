use bytemuck::{Pod, Zeroable};

/// A point in tile units.
#[repr(C)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Pod, Zeroable)]
pub struct GeometryCoordinate {
    pub x: i16,
    pub y: i16,
}

impl GeometryCoordinate {
    #[inline]
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

/// An open line or a single ring.
pub type GeometryCoordinates = Vec<GeometryCoordinate>;

/// A set of rings: a polygon's outer ring followed by its holes, possibly several polygons.
pub type GeometryCollection = Vec<GeometryCoordinates>;

/// Twice the signed area of `ring` (shoelace). Sign gives the winding.
pub fn signed_area(ring: &[GeometryCoordinate]) -> i64 {
    let n = ring.len();
    if n < 3 {
        return 0;
    }
    let mut sum = 0i64;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        sum += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
    }
    sum
}

/// Splits rings into polygons: a ring whose winding matches the first ring starts a new
/// polygon, the others are holes of the polygon before them. Degenerate rings are dropped.
pub fn classify_rings(rings: &[GeometryCoordinates]) -> Vec<Vec<&[GeometryCoordinate]>> {
    let mut polygons: Vec<Vec<&[GeometryCoordinate]>> = Vec::new();
    let mut outer_sign = 0i64;

    for ring in rings {
        let area = signed_area(ring);
        if area == 0 {
            continue;
        }
        if outer_sign == 0 {
            outer_sign = area.signum();
        }
        match polygons.last_mut() {
            Some(polygon) if area.signum() != outer_sign => polygon.push(ring),
            _ => polygons.push(vec![ring.as_slice()]),
        }
    }
    polygons
}
