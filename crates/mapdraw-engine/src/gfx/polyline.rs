//! Line tessellation into extrudable vertices.
//!
//! Each input vertex becomes a pair of vertices carrying the tile-unit position and a
//! packed extrusion normal; the line shader pushes them apart by the evaluated width.

use bytemuck::{Pod, Zeroable};

use crate::tile::GeometryCoordinate;

/// Extrusion normals are stored as `round(63 * n) + 128` in one byte per axis.
pub const EXTRUDE_SCALE: f64 = 63.0;

/// Line distances are stored at half resolution.
pub const LINE_DISTANCE_SCALE: f64 = 0.5;

/// Beyond this miter length a flipped bevel degenerates; extrude along the next normal.
const MAX_MITER_LENGTH_FOR_FLIP_BEVEL: f64 = 100.0;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum LineJoinType {
    #[default]
    Miter,
    Bevel,
    Round,
    /// Round join approximated with a bevel.
    FakeRound,
    /// Bevel with the extrusion flipped, used for very sharp corners.
    FlipBevel,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum LineCapType {
    #[default]
    Butt,
    Square,
    Round,
}

/// Tessellation parameters for one polyline.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PolylineOptions {
    pub join: LineJoinType,
    pub begin_cap: LineCapType,
    pub end_cap: LineCapType,
    pub miter_limit: f64,
    pub round_limit: f64,
    /// Treat the input as a closed ring (the last point connects back to the first).
    pub closed: bool,
}

impl Default for PolylineOptions {
    fn default() -> Self {
        Self {
            join: LineJoinType::Miter,
            begin_cap: LineCapType::Butt,
            end_cap: LineCapType::Butt,
            miter_limit: 2.0,
            round_limit: 1.05,
            closed: false,
        }
    }
}

/// Interleaved line vertex: `a_pos_normal` (Short2) then `a_data` (UByte4).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct LineLayoutVertex {
    pub pos_normal: [i16; 2],
    pub data: [u8; 4],
}

impl LineLayoutVertex {
    pub const STRIDE: usize = std::mem::size_of::<LineLayoutVertex>();
    pub const POS_NORMAL_OFFSET: usize = 0;
    pub const DATA_OFFSET: usize = 4;

    /// Packs a position, extrusion and distance.
    ///
    /// The low bit of each position component carries the `round` / `up` flags; `dir` is
    /// the sign of the end offset along the line.
    pub fn new(p: GeometryCoordinate, e: [f64; 2], round: bool, up: bool, dir: i8, linesofar: i32) -> Self {
        let dir_bits = (dir.signum() as i32 + 1) as u8;
        Self {
            pos_normal: [
                p.x.wrapping_mul(2) | round as i16,
                p.y.wrapping_mul(2) | up as i16,
            ],
            data: [
                ((EXTRUDE_SCALE * e[0]).round() + 128.0) as u8,
                ((EXTRUDE_SCALE * e[1]).round() + 128.0) as u8,
                dir_bits | (((linesofar & 0x3F) as u8) << 2),
                ((linesofar >> 6) & 0xFF) as u8,
            ],
        }
    }

    /// Decoded extrusion normal (for tests and debugging).
    pub fn extrude(&self) -> [f64; 2] {
        [
            (self.data[0] as f64 - 128.0) / EXTRUDE_SCALE,
            (self.data[1] as f64 - 128.0) / EXTRUDE_SCALE,
        ]
    }
}

type Vec2 = [f64; 2];

#[inline]
fn sub(a: Vec2, b: Vec2) -> Vec2 {
    [a[0] - b[0], a[1] - b[1]]
}

#[inline]
fn add(a: Vec2, b: Vec2) -> Vec2 {
    [a[0] + b[0], a[1] + b[1]]
}

#[inline]
fn scale(a: Vec2, s: f64) -> Vec2 {
    [a[0] * s, a[1] * s]
}

#[inline]
fn length(a: Vec2) -> f64 {
    (a[0] * a[0] + a[1] * a[1]).sqrt()
}

#[inline]
fn unit(a: Vec2) -> Vec2 {
    let l = length(a);
    if l == 0.0 { a } else { scale(a, 1.0 / l) }
}

#[inline]
fn perp(a: Vec2) -> Vec2 {
    [-a[1], a[0]]
}

#[inline]
fn dot(a: Vec2, b: Vec2) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

#[inline]
fn cross(a: Vec2, b: Vec2) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}

#[inline]
fn to_vec(p: GeometryCoordinate) -> Vec2 {
    [p.x as f64, p.y as f64]
}

/// Output of [`tessellate_polyline`]: vertices plus triangles indexing into them.
#[derive(Debug, Default, Clone)]
pub struct PolylineGeometry {
    pub vertices: Vec<LineLayoutVertex>,
    pub triangles: Vec<[u32; 3]>,
}

struct Tessellator<'a> {
    out: &'a mut PolylineGeometry,
    e1: Option<u32>,
    e2: Option<u32>,
}

impl Tessellator<'_> {
    fn push_vertex(&mut self, v: LineLayoutVertex) {
        let e3 = self.out.vertices.len() as u32;
        self.out.vertices.push(v);
        if let (Some(e1), Some(e2)) = (self.e1, self.e2) {
            self.out.triangles.push([e1, e2, e3]);
        }
        self.e1 = self.e2;
        self.e2 = Some(e3);
    }

    fn add_current_vertex(
        &mut self,
        p: GeometryCoordinate,
        distance: f64,
        normal: Vec2,
        end_left: f64,
        end_right: f64,
        round: bool,
    ) {
        let linesofar = (distance * LINE_DISTANCE_SCALE) as i32;

        let mut extrude = normal;
        if end_left != 0.0 {
            extrude = sub(extrude, scale(perp(normal), end_left));
        }
        self.push_vertex(LineLayoutVertex::new(p, extrude, round, false, direction(end_left), linesofar));

        let mut extrude = scale(normal, -1.0);
        if end_right != 0.0 {
            extrude = sub(extrude, scale(perp(normal), end_right));
        }
        self.push_vertex(LineLayoutVertex::new(p, extrude, round, true, direction(-end_right), linesofar));
    }

    /// Breaks the strip so the next vertex pair does not connect to the previous one.
    fn break_strip(&mut self) {
        self.e1 = None;
        self.e2 = None;
    }
}

/// Tessellates `coordinates` into `out`, appending to whatever it already holds.
///
/// Repeated points are skipped; lines with fewer than two distinct points (three for
/// closed rings) produce nothing. Returns the number of vertices appended.
pub fn tessellate_polyline(
    coordinates: &[GeometryCoordinate],
    options: &PolylineOptions,
    out: &mut PolylineGeometry,
) -> usize {
    let mut points: Vec<GeometryCoordinate> = Vec::with_capacity(coordinates.len());
    for &p in coordinates {
        if points.last() != Some(&p) {
            points.push(p);
        }
    }
    let closed = options.closed && points.len() > 2;
    if closed && points.first() == points.last() {
        points.pop();
    }
    let len = points.len();
    if len < 2 || (options.closed && len < 3) {
        return 0;
    }

    let start = out.vertices.len();
    let mut t = Tessellator { out, e1: None, e2: None };

    let mut distance = 0.0;
    let mut prev_normal: Option<Vec2> = if closed {
        Some(perp(unit(sub(to_vec(points[0]), to_vec(points[len - 1])))))
    } else {
        None
    };

    let count = if closed { len + 1 } else { len };
    for i in 0..count {
        let current = points[i % len];
        let prev = if i > 0 {
            Some(points[(i - 1) % len])
        } else if closed {
            Some(points[len - 1])
        } else {
            None
        };
        let next = if i + 1 < count {
            Some(points[(i + 1) % len])
        } else {
            None
        };

        let next_normal = match next {
            Some(n) => perp(unit(sub(to_vec(n), to_vec(current)))),
            None => prev_normal.unwrap_or([0.0, 0.0]),
        };
        let prev_n = prev_normal.unwrap_or(next_normal);

        let mut join_normal = unit(add(prev_n, next_normal));
        let cos_half_angle = dot(join_normal, next_normal);
        let miter_length = if cos_half_angle != 0.0 { 1.0 / cos_half_angle } else { f64::INFINITY };

        let middle = prev.is_some() && next.is_some();
        let mut join = if middle {
            options.join
        } else if next.is_some() {
            to_join(options.begin_cap)
        } else {
            to_join(options.end_cap)
        };

        if middle && join == LineJoinType::Round {
            if miter_length < options.round_limit {
                join = LineJoinType::Miter;
            } else if miter_length <= 2.0 {
                join = LineJoinType::FakeRound;
            }
        }
        if join == LineJoinType::Miter && miter_length > options.miter_limit {
            join = LineJoinType::Bevel;
        }
        if join == LineJoinType::Bevel {
            if miter_length > 2.0 {
                join = LineJoinType::FlipBevel;
            }
            if miter_length < options.miter_limit {
                join = LineJoinType::Miter;
            }
        }

        if let Some(p) = prev {
            distance += length(sub(to_vec(current), to_vec(p)));
        }

        let cap = if middle {
            None
        } else if next.is_some() {
            Some(options.begin_cap)
        } else {
            Some(options.end_cap)
        };

        match (join, cap) {
            (_, Some(LineCapType::Butt)) => {
                t.add_current_vertex(current, distance, join_normal, 0.0, 0.0, false);
            }
            (_, Some(LineCapType::Square)) => {
                let offset = if prev.is_some() { 1.0 } else { -1.0 };
                t.add_current_vertex(current, distance, join_normal, offset, offset, false);
            }
            (_, Some(LineCapType::Round)) | (LineJoinType::Round, None) => {
                if prev.is_some() {
                    t.add_current_vertex(current, distance, prev_n, 0.0, 0.0, false);
                    t.add_current_vertex(current, distance, prev_n, 1.0, 1.0, true);
                    if next.is_some() {
                        t.break_strip();
                    }
                }
                if next.is_some() {
                    t.add_current_vertex(current, distance, next_normal, -1.0, -1.0, true);
                    t.add_current_vertex(current, distance, next_normal, 0.0, 0.0, false);
                }
            }
            (LineJoinType::Miter, None) => {
                join_normal = scale(join_normal, miter_length);
                t.add_current_vertex(current, distance, join_normal, 0.0, 0.0, false);
            }
            (LineJoinType::FlipBevel, None) => {
                if miter_length > MAX_MITER_LENGTH_FOR_FLIP_BEVEL {
                    join_normal = scale(next_normal, -1.0);
                } else {
                    let direction = if cross(prev_n, next_normal) > 0.0 { -1.0 } else { 1.0 };
                    let bevel_length = miter_length * length(add(prev_n, next_normal))
                        / length(sub(prev_n, next_normal));
                    join_normal = scale(perp(join_normal), bevel_length * direction);
                }
                t.add_current_vertex(current, distance, join_normal, 0.0, 0.0, false);
                t.add_current_vertex(current, distance, scale(join_normal, -1.0), 0.0, 0.0, false);
            }
            (LineJoinType::Bevel | LineJoinType::FakeRound, None) => {
                let turns_left = cross(prev_n, next_normal) > 0.0;
                let offset = -(miter_length * miter_length - 1.0).max(0.0).sqrt();
                let (offset_a, offset_b) = if turns_left { (offset, 0.0) } else { (0.0, offset) };
                t.add_current_vertex(current, distance, prev_n, offset_a, offset_b, false);
                t.add_current_vertex(current, distance, next_normal, -offset_a, -offset_b, false);
            }
        }

        prev_normal = Some(next_normal);
    }

    t.out.vertices.len() - start
}

#[inline]
fn direction(end_offset: f64) -> i8 {
    if end_offset > 0.0 {
        1
    } else if end_offset < 0.0 {
        -1
    } else {
        0
    }
}

fn to_join(cap: LineCapType) -> LineJoinType {
    match cap {
        LineCapType::Round => LineJoinType::Round,
        LineCapType::Butt | LineCapType::Square => LineJoinType::Miter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(points: &[(i16, i16)]) -> Vec<GeometryCoordinate> {
        points.iter().map(|&(x, y)| GeometryCoordinate::new(x, y)).collect()
    }

    #[test]
    fn straight_segment_emits_one_quad() {
        let mut out = PolylineGeometry::default();
        let n = tessellate_polyline(&line(&[(0, 0), (100, 0)]), &PolylineOptions::default(), &mut out);
        assert_eq!(n, 4);
        assert_eq!(out.triangles, vec![[0, 1, 2], [1, 2, 3]]);
    }

    #[test]
    fn packs_position_flags_and_extrusion() {
        let mut out = PolylineGeometry::default();
        tessellate_polyline(&line(&[(10, 20), (10, 120)]), &PolylineOptions::default(), &mut out);
        let first = out.vertices[0];
        let second = out.vertices[1];
        assert_eq!(first.pos_normal, [20, 40]);
        assert_eq!(second.pos_normal, [20, 41]);
        // Direction is +y, so the normal is -x.
        assert_eq!(first.extrude(), [-1.0, 0.0]);
        assert_eq!(second.extrude(), [1.0, 0.0]);
    }

    #[test]
    fn line_distance_is_accumulated() {
        let mut out = PolylineGeometry::default();
        tessellate_polyline(&line(&[(0, 0), (0, 200)]), &PolylineOptions::default(), &mut out);
        let last = out.vertices[3];
        let linesofar = (last.data[2] >> 2) as i32 | (last.data[3] as i32) << 6;
        assert_eq!(linesofar, 100);
    }

    #[test]
    fn repeated_points_are_skipped() {
        let mut out = PolylineGeometry::default();
        let n = tessellate_polyline(
            &line(&[(0, 0), (0, 0), (50, 0), (50, 0), (100, 0)]),
            &PolylineOptions::default(),
            &mut out,
        );
        assert_eq!(n, 6);
        assert_eq!(out.triangles.len(), 4);
    }

    #[test]
    fn degenerate_line_emits_nothing_and_keeps_indexes_consistent() {
        let mut out = PolylineGeometry::default();
        tessellate_polyline(&line(&[(0, 0), (10, 0)]), &PolylineOptions::default(), &mut out);
        assert_eq!(tessellate_polyline(&line(&[(5, 5), (5, 5)]), &PolylineOptions::default(), &mut out), 0);
        tessellate_polyline(&line(&[(0, 10), (10, 10)]), &PolylineOptions::default(), &mut out);

        assert_eq!(out.vertices.len(), 8);
        assert_eq!(out.triangles[2], [4, 5, 6]);
        assert!(out.triangles.iter().flatten().all(|&i| (i as usize) < out.vertices.len()));
    }

    #[test]
    fn sharp_corner_bevels() {
        let mut out = PolylineGeometry::default();
        let opts = PolylineOptions { join: LineJoinType::Bevel, ..PolylineOptions::default() };
        // A 90 degree turn has miter length sqrt(2) < miter limit, so it stays a miter.
        tessellate_polyline(&line(&[(0, 0), (100, 0), (100, 100)]), &opts, &mut out);
        assert_eq!(out.vertices.len(), 6);

        // A near reversal exceeds the miter limit and gets two vertex pairs at the corner.
        let mut out = PolylineGeometry::default();
        tessellate_polyline(&line(&[(0, 0), (100, 0), (0, 10)]), &opts, &mut out);
        assert_eq!(out.vertices.len(), 8);
    }

    #[test]
    fn closed_ring_wraps_around() {
        let mut out = PolylineGeometry::default();
        let opts = PolylineOptions { closed: true, ..PolylineOptions::default() };
        let n = tessellate_polyline(&line(&[(0, 0), (100, 0), (100, 100), (0, 100), (0, 0)]), &opts, &mut out);
        // Four corners plus the closing vertex, one pair each.
        assert_eq!(n, 10);
    }
}
