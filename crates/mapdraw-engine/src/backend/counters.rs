use std::sync::atomic::{AtomicUsize, Ordering};

use crate::gfx::RenderingStats;

/// Resource counters shared between a context and the handles it created.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) buffers_created: AtomicUsize,
    pub(crate) bytes_uploaded: AtomicUsize,
    pub(crate) live_buffers: AtomicUsize,
    pub(crate) live_textures: AtomicUsize,
}

impl Counters {
    pub(crate) fn buffer_created(&self, bytes: usize) {
        self.buffers_created.fetch_add(1, Ordering::Relaxed);
        self.bytes_uploaded.fetch_add(bytes, Ordering::Relaxed);
        self.live_buffers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn buffer_updated(&self, bytes: usize) {
        self.bytes_uploaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn buffer_dropped(&self) {
        self.live_buffers.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn texture_created(&self) {
        self.live_textures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn texture_dropped(&self) {
        self.live_textures.fetch_sub(1, Ordering::Relaxed);
    }

    /// Copies the counters into `stats`.
    pub(crate) fn fill(&self, stats: &mut RenderingStats) {
        stats.buffers_created = self.buffers_created.load(Ordering::Relaxed);
        stats.buffer_bytes_uploaded = self.bytes_uploaded.load(Ordering::Relaxed);
        stats.live_buffers = self.live_buffers.load(Ordering::Relaxed);
        stats.live_textures = self.live_textures.load(Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_counts_follow_create_and_drop() {
        let counters = Counters::default();
        counters.buffer_created(16);
        counters.buffer_created(8);
        counters.buffer_updated(4);
        counters.buffer_dropped();
        counters.texture_created();

        let mut stats = RenderingStats::default();
        counters.fill(&mut stats);
        assert_eq!((stats.buffers_created, stats.live_buffers), (2, 1));
        assert_eq!(stats.buffer_bytes_uploaded, 28);
        assert_eq!(stats.live_textures, 1);
    }
}
