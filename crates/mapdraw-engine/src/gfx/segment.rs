use super::types::DrawMode;

/// Largest vertex count one segment may address with 16-bit indexes.
pub const MAX_SEGMENT_VERTICES: usize = u16::MAX as usize + 1;

/// A contiguous range of a drawable's vertex and index buffers drawn with one call.
///
/// Indexes inside the range are relative to `vertex_offset`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct Segment {
    pub vertex_offset: usize,
    pub vertex_length: usize,
    pub index_offset: usize,
    pub index_length: usize,
}

impl Segment {
    pub const fn new(vertex_offset: usize, index_offset: usize) -> Self {
        Self { vertex_offset, vertex_length: 0, index_offset, index_length: 0 }
    }

    /// `true` if `extra` more vertices still fit under the 16-bit index limit.
    #[inline]
    pub fn fits(&self, extra: usize) -> bool {
        self.vertex_length + extra <= MAX_SEGMENT_VERTICES
    }
}

/// A segment plus the topology it is drawn with.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DrawSegment {
    pub mode: DrawMode,
    pub segment: Segment,
}
