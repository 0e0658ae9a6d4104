use std::collections::HashMap;
use std::sync::Mutex;

use crate::gfx::LinePatternCap;

/// Where a dash pattern lives in the atlas.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LinePatternPos {
    /// Pattern length in logical pixels.
    pub width: f32,
    /// Rows used by the pattern.
    pub height: f32,
    /// Normalized texture `v` of the pattern's center row.
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DashKey {
    dasharray: Vec<u32>,
    cap: LinePatternCap,
}

#[derive(Debug, Default)]
struct AtlasState {
    next_row: u32,
    positions: HashMap<DashKey, LinePatternPos>,
    image: Vec<u8>,
    dirty: bool,
}

/// Single-channel signed distance field atlas of line dash patterns.
///
/// Each pattern takes one row (square caps) or fifteen rows (round caps). Values are
/// distances to the nearest dash edge in pixels, offset by 128.
#[derive(Debug)]
pub struct LineAtlas {
    width: u32,
    height: u32,
    state: Mutex<AtlasState>,
}

const ROUND_CAP_ROWS: i32 = 7;
const DISTANCE_OFFSET: f32 = 128.0;

impl LineAtlas {
    pub fn new(width: u32, height: u32) -> Self {
        let state = AtlasState { image: vec![0; (width * height) as usize], ..AtlasState::default() };
        Self { width, height, state: Mutex::new(state) }
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the position of `dasharray`, rasterizing it on first use.
    ///
    /// `None` when the pattern is empty or the atlas is full.
    pub fn get_dash_position(&self, dasharray: &[f32], cap: LinePatternCap) -> Option<LinePatternPos> {
        let key = DashKey { dasharray: dasharray.iter().map(|d| d.to_bits()).collect(), cap };
        let Ok(mut state) = self.state.lock() else { return None };
        if let Some(pos) = state.positions.get(&key) {
            return Some(*pos);
        }
        let pos = self.add_dash(&mut state, dasharray, cap)?;
        state.positions.insert(key, pos);
        Some(pos)
    }

    fn add_dash(&self, state: &mut AtlasState, dasharray: &[f32], cap: LinePatternCap) -> Option<LinePatternPos> {
        let length: f32 = dasharray.iter().sum();
        if dasharray.is_empty() || length <= 0.0 {
            return None;
        }
        let round = cap == LinePatternCap::Round;
        let n = if round { ROUND_CAP_ROWS } else { 0 };
        let rows = (2 * n + 1) as u32;
        if state.next_row + rows > self.height {
            log::warn!("LineAtlas: out of space for dash pattern {dasharray:?}");
            return None;
        }

        let stretch = self.width as f32 / length;
        let half_width = stretch * 0.5;
        let odd_length = dasharray.len() % 2 == 1;

        for y in -n..=n {
            let row = state.next_row as i32 + n + y;
            let index = (self.width as i32 * row) as usize;

            let mut left = 0.0f32;
            let mut right = dasharray[0];
            let mut part_index = 1usize;

            for x in 0..self.width {
                while right < x as f32 / stretch {
                    left = right;
                    let Some(&dash) = dasharray.get(part_index % dasharray.len()) else { break };
                    right += dash;
                    if odd_length && part_index == dasharray.len() - 1 {
                        right += dasharray[0];
                    }
                    part_index += 1;
                }

                let dist_left = (x as f32 - left * stretch).abs();
                let dist_right = (x as f32 - right * stretch).abs();
                let dist = dist_left.min(dist_right);
                let inside = part_index % 2 == 1;

                let signed = if round {
                    let dist_middle = if n != 0 { (y as f32 / n as f32) * (half_width + 1.0) } else { 0.0 };
                    if inside {
                        let dist_edge = half_width - dist_middle.abs();
                        (dist * dist + dist_edge * dist_edge).sqrt()
                    } else {
                        half_width - (dist * dist + dist_middle * dist_middle).sqrt()
                    }
                } else if inside {
                    dist
                } else {
                    -dist
                };

                state.image[index + x as usize] = (signed + DISTANCE_OFFSET).clamp(0.0, 255.0) as u8;
            }
        }

        let pos = LinePatternPos {
            width: length,
            height: rows as f32,
            y: (state.next_row as f32 + n as f32 + 0.5) / self.height as f32,
        };
        state.next_row += rows;
        state.dirty = true;
        Some(pos)
    }

    /// Copies the atlas image out if it changed since the last call.
    pub fn take_dirty_image(&self) -> Option<Vec<u8>> {
        let Ok(mut state) = self.state.lock() else { return None };
        if !state.dirty {
            return None;
        }
        state.dirty = false;
        Some(state.image.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_pattern_is_rasterized_once() {
        let atlas = LineAtlas::new(64, 32);
        let a = atlas.get_dash_position(&[2.0, 2.0], LinePatternCap::Square).unwrap();
        assert!(atlas.take_dirty_image().is_some());
        let b = atlas.get_dash_position(&[2.0, 2.0], LinePatternCap::Square).unwrap();
        assert_eq!(a, b);
        assert!(atlas.take_dirty_image().is_none());
        assert_eq!(a.width, 4.0);
        assert_eq!(a.height, 1.0);
    }

    #[test]
    fn round_caps_take_fifteen_rows() {
        let atlas = LineAtlas::new(64, 32);
        let round = atlas.get_dash_position(&[1.0, 1.0], LinePatternCap::Round).unwrap();
        assert_eq!(round.height, 15.0);
        let next = atlas.get_dash_position(&[3.0, 1.0], LinePatternCap::Square).unwrap();
        assert_eq!(next.y, 15.5 / 32.0);
    }

    #[test]
    fn dash_inside_is_positive_gap_negative() {
        let atlas = LineAtlas::new(64, 1);
        atlas.get_dash_position(&[1.0, 1.0], LinePatternCap::Square).unwrap();
        let image = atlas.take_dirty_image().unwrap();
        // Middle of the dash vs. middle of the gap.
        assert!(image[16] > 128);
        assert!(image[48] < 128);
    }

    #[test]
    fn full_atlas_rejects_patterns() {
        let atlas = LineAtlas::new(16, 1);
        assert!(atlas.get_dash_position(&[1.0], LinePatternCap::Square).is_some());
        assert!(atlas.get_dash_position(&[2.0], LinePatternCap::Square).is_none());
        assert!(atlas.get_dash_position(&[], LinePatternCap::Square).is_none());
    }
}
