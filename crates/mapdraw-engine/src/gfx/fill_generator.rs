//! Polygon fill triangulation.
//!
//! Rings are classified into polygons, holes are bridged into their outer ring, and the
//! resulting simple polygon is ear-clipped. Output indexes are segment-relative.

use crate::tile::{GeometryCollection, GeometryCoordinate, classify_rings};

use super::segment::{MAX_SEGMENT_VERTICES, Segment};

/// Vertices, triangle indexes and segments of a filled geometry collection.
#[derive(Debug, Default, Clone)]
pub struct FillBuffers {
    pub vertices: Vec<GeometryCoordinate>,
    pub triangles: Vec<u16>,
    pub triangle_segments: Vec<Segment>,
    /// Outline indexes (line pairs), present when generated with outlines.
    pub lines: Vec<u16>,
    pub line_segments: Vec<Segment>,
}

/// Triangulates every polygon in `geometry`.
pub fn generate_fill_buffers(geometry: &GeometryCollection) -> FillBuffers {
    generate(geometry, false)
}

/// Triangulates every polygon in `geometry` and emits its ring outlines as line pairs.
pub fn generate_fill_and_outline_buffers(geometry: &GeometryCollection) -> FillBuffers {
    generate(geometry, true)
}

fn generate(geometry: &GeometryCollection, outlines: bool) -> FillBuffers {
    let mut out = FillBuffers::default();

    for polygon in classify_rings(geometry) {
        let rings: Vec<Vec<GeometryCoordinate>> = polygon.iter().map(|r| open_ring(r)).collect();
        let total: usize = rings.iter().map(Vec::len).sum();
        if total == 0 {
            continue;
        }
        if total > MAX_SEGMENT_VERTICES {
            log::warn!("fill polygon with {total} vertices exceeds one segment; dropped");
            continue;
        }

        let start_vertex = out.vertices.len();
        let tri_segment = reserve(&mut out.triangle_segments, start_vertex, out.triangles.len(), total);
        let base = out.triangle_segments[tri_segment].vertex_length;

        let line_segment = outlines
            .then(|| reserve(&mut out.line_segments, start_vertex, out.lines.len(), total));
        let line_base = line_segment.map(|s| out.line_segments[s].vertex_length);

        let mut offset = 0usize;
        for ring in &rings {
            out.vertices.extend_from_slice(ring);
            if let Some(line_base) = line_base {
                let n = ring.len();
                for i in 0..n {
                    out.lines.push((line_base + offset + i) as u16);
                    out.lines.push((line_base + offset + (i + 1) % n) as u16);
                }
            }
            offset += ring.len();
        }

        let indexes = triangulate(&rings);
        for i in &indexes {
            out.triangles.push((base + *i as usize) as u16);
        }

        let seg = &mut out.triangle_segments[tri_segment];
        seg.vertex_length += total;
        seg.index_length += indexes.len();
        if let Some(s) = line_segment {
            let seg = &mut out.line_segments[s];
            seg.vertex_length += total;
            seg.index_length += total * 2;
        }
    }
    out
}

/// Returns the index of a segment that can take `count` more vertices.
fn reserve(segments: &mut Vec<Segment>, vertex_offset: usize, index_offset: usize, count: usize) -> usize {
    match segments.last() {
        Some(last) if last.fits(count) => segments.len() - 1,
        _ => {
            segments.push(Segment::new(vertex_offset, index_offset));
            segments.len() - 1
        }
    }
}

fn open_ring(ring: &[GeometryCoordinate]) -> Vec<GeometryCoordinate> {
    let mut r = ring.to_vec();
    if r.len() > 1 && r.first() == r.last() {
        r.pop();
    }
    r
}

type P = (i64, i64);

#[inline]
fn orient(a: P, b: P, c: P) -> i64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

fn area2(points: &[P], ring: &[usize]) -> i64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let a = points[ring[i]];
            let b = points[ring[(i + 1) % n]];
            a.0 * b.1 - b.0 * a.1
        })
        .sum()
}

/// Proper intersection: the segments cross at a point interior to both.
fn segments_cross(a: P, b: P, c: P, d: P) -> bool {
    let d1 = orient(a, b, c);
    let d2 = orient(a, b, d);
    let d3 = orient(c, d, a);
    let d4 = orient(c, d, b);
    d1.signum() * d2.signum() < 0 && d3.signum() * d4.signum() < 0
}

/// Even-odd containment of `p` (doubled coordinates) against all rings.
fn inside_rings(points: &[P], rings: &[Vec<usize>], p2: P) -> bool {
    let mut inside = false;
    for ring in rings {
        let n = ring.len();
        for i in 0..n {
            let a = points[ring[i]];
            let b = points[ring[(i + 1) % n]];
            let (ax, ay, bx, by) = (a.0 * 2, a.1 * 2, b.0 * 2, b.1 * 2);
            if (ay > p2.1) != (by > p2.1) {
                // x of the edge at p.y, compared without division.
                let lhs = (p2.0 - ax) * (by - ay);
                let rhs = (bx - ax) * (p2.1 - ay);
                if (by - ay > 0 && lhs < rhs) || (by - ay < 0 && lhs > rhs) {
                    inside = !inside;
                }
            }
        }
    }
    inside
}

fn point_in_triangle(p: P, a: P, b: P, c: P) -> bool {
    let d1 = orient(a, b, p);
    let d2 = orient(b, c, p);
    let d3 = orient(c, a, p);
    let has_neg = d1 < 0 || d2 < 0 || d3 < 0;
    let has_pos = d1 > 0 || d2 > 0 || d3 > 0;
    !(has_neg && has_pos)
}

/// Triangulates one polygon (outer ring first, then holes); indexes are positions in the
/// concatenation of `rings`.
pub fn triangulate(rings: &[Vec<GeometryCoordinate>]) -> Vec<u32> {
    let mut points: Vec<P> = Vec::new();
    let mut ring_ids: Vec<Vec<usize>> = Vec::with_capacity(rings.len());
    for ring in rings {
        let start = points.len();
        points.extend(ring.iter().map(|p| (p.x as i64, p.y as i64)));
        ring_ids.push((start..points.len()).collect());
    }
    let Some((outer, holes)) = ring_ids.split_first() else { return Vec::new() };
    if outer.len() < 3 {
        return Vec::new();
    }

    let mut polygon = outer.clone();
    let sign = area2(&points, &polygon).signum();
    if sign == 0 {
        return Vec::new();
    }

    // Holes with the largest x are bridged first so earlier bridges do not block later ones.
    let mut holes: Vec<Vec<usize>> = holes.iter().filter(|h| h.len() >= 3).cloned().collect();
    holes.sort_by_key(|h| std::cmp::Reverse(h.iter().map(|&i| points[i].0).max().unwrap_or(0)));
    for hole in &mut holes {
        if area2(&points, hole).signum() == sign {
            hole.reverse();
        }
    }

    for (k, hole) in holes.iter().enumerate() {
        let Some(m_pos) = (0..hole.len()).max_by_key(|&i| (points[hole[i]].0, -points[hole[i]].1)) else {
            continue;
        };
        let m = hole[m_pos];
        let Some(v_pos) = find_bridge(&points, &polygon, &holes[k..], &ring_ids, m) else {
            log::warn!("fill hole could not be bridged; skipped");
            continue;
        };
        let v = polygon[v_pos];
        let mut spliced = Vec::with_capacity(polygon.len() + hole.len() + 2);
        spliced.extend_from_slice(&polygon[..=v_pos]);
        for i in 0..=hole.len() {
            spliced.push(hole[(m_pos + i) % hole.len()]);
        }
        spliced.push(v);
        spliced.extend_from_slice(&polygon[v_pos + 1..]);
        polygon = spliced;
    }

    ear_clip(&points, polygon, sign)
}

/// Directed edges of a closed ring of point indexes.
fn edges_of(ring: &[usize]) -> impl Iterator<Item = (usize, usize)> + '_ {
    let n = ring.len();
    (0..n).map(move |i| (ring[i], ring[(i + 1) % n]))
}

fn find_bridge(
    points: &[P],
    polygon: &[usize],
    pending_holes: &[Vec<usize>],
    all_rings: &[Vec<usize>],
    m: usize,
) -> Option<usize> {
    let mp = points[m];
    let mut candidates: Vec<usize> = (0..polygon.len()).collect();
    candidates.sort_by_key(|&i| {
        let p = points[polygon[i]];
        (p.0 - mp.0).pow(2) + (p.1 - mp.1).pow(2)
    });

    'candidate: for pos in candidates {
        let vp = points[polygon[pos]];
        if vp == mp {
            continue;
        }
        for (a, b) in edges_of(polygon).chain(pending_holes.iter().flat_map(|h| edges_of(h))) {
            if segments_cross(mp, vp, points[a], points[b]) {
                continue 'candidate;
            }
        }
        let mid = (mp.0 + vp.0, mp.1 + vp.1);
        if inside_rings(points, all_rings, mid) {
            return Some(pos);
        }
    }
    None
}

fn ear_clip(points: &[P], mut polygon: Vec<usize>, sign: i64) -> Vec<u32> {
    let mut out = Vec::with_capacity(polygon.len().saturating_sub(2) * 3);

    while polygon.len() > 3 {
        let n = polygon.len();
        let mut clipped = false;

        for i in 0..n {
            let (ia, ib, ic) = (polygon[(i + n - 1) % n], polygon[i], polygon[(i + 1) % n]);
            let (a, b, c) = (points[ia], points[ib], points[ic]);
            if orient(a, b, c).signum() != sign {
                continue;
            }
            let blocked = polygon.iter().any(|&j| {
                let p = points[j];
                p != a && p != b && p != c && point_in_triangle(p, a, b, c)
            });
            if blocked {
                continue;
            }
            out.extend_from_slice(&[ia as u32, ib as u32, ic as u32]);
            polygon.remove(i);
            clipped = true;
            break;
        }

        if !clipped {
            // Drop a collinear vertex if there is one; otherwise the ring self-intersects.
            let collinear = (0..n).find(|&i| {
                let a = points[polygon[(i + n - 1) % n]];
                let b = points[polygon[i]];
                let c = points[polygon[(i + 1) % n]];
                orient(a, b, c) == 0
            });
            match collinear {
                Some(i) => {
                    polygon.remove(i);
                }
                None => {
                    log::warn!("fill ring is not simple; {} vertices left untriangulated", n);
                    return out;
                }
            }
        }
    }

    if polygon.len() == 3 {
        let (a, b, c) = (points[polygon[0]], points[polygon[1]], points[polygon[2]]);
        if orient(a, b, c) != 0 {
            out.extend(polygon.iter().map(|&i| i as u32));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(points: &[(i16, i16)]) -> Vec<GeometryCoordinate> {
        points.iter().map(|&(x, y)| GeometryCoordinate::new(x, y)).collect()
    }

    fn tri_area_sum(vertices: &[GeometryCoordinate], idx: &[u16]) -> i64 {
        idx.chunks(3)
            .map(|t| {
                let p = |i: u16| (vertices[i as usize].x as i64, vertices[i as usize].y as i64);
                orient(p(t[0]), p(t[1]), p(t[2])).abs()
            })
            .sum()
    }

    #[test]
    fn square_becomes_two_triangles() {
        let buffers = generate_fill_buffers(&vec![ring(&[(0, 0), (10, 0), (10, 10), (0, 10), (0, 0)])]);
        assert_eq!(buffers.vertices.len(), 4);
        assert_eq!(buffers.triangles.len(), 6);
        assert_eq!(buffers.triangle_segments, vec![Segment { vertex_offset: 0, vertex_length: 4, index_offset: 0, index_length: 6 }]);
        assert_eq!(tri_area_sum(&buffers.vertices, &buffers.triangles), 200);
    }

    #[test]
    fn concave_polygon_covers_its_area() {
        // An L shape: area 75 (doubled 150).
        let l = ring(&[(0, 0), (10, 0), (10, 5), (5, 5), (5, 10), (0, 10)]);
        let buffers = generate_fill_buffers(&vec![l]);
        assert_eq!(buffers.triangles.len(), 12);
        assert_eq!(tri_area_sum(&buffers.vertices, &buffers.triangles), 150);
    }

    #[test]
    fn hole_is_subtracted() {
        let outer = ring(&[(0, 0), (10, 0), (10, 10), (0, 10)]);
        let hole = ring(&[(4, 4), (4, 6), (6, 6), (6, 4)]);
        let buffers = generate_fill_buffers(&vec![outer, hole]);
        assert_eq!(buffers.vertices.len(), 8);
        // 100 - 4 = 96, doubled.
        assert_eq!(tri_area_sum(&buffers.vertices, &buffers.triangles), 192);
    }

    #[test]
    fn outlines_close_every_ring() {
        let buffers = generate_fill_and_outline_buffers(&vec![ring(&[(0, 0), (10, 0), (10, 10)])]);
        assert_eq!(buffers.lines, vec![0, 1, 1, 2, 2, 0]);
        assert_eq!(buffers.line_segments[0].index_length, 6);
    }

    #[test]
    fn second_polygon_indexes_continue_in_segment() {
        let a = ring(&[(0, 0), (10, 0), (10, 10)]);
        let b = ring(&[(20, 0), (30, 0), (30, 10)]);
        let buffers = generate_fill_buffers(&vec![a, b]);
        assert_eq!(buffers.triangle_segments.len(), 1);
        assert_eq!(buffers.triangles.iter().copied().max(), Some(5));
    }
}
