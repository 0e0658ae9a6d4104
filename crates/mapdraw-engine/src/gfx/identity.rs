use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique drawable identity.
///
/// Ids are handed out from a monotonically increasing counter, so ordering by id is
/// creation order. Used as the removal key and as the tie-break in draw ordering.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct DrawableId(u64);

impl DrawableId {
    /// Allocates the next id.
    #[inline]
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DrawableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_strictly_increasing() {
        let a = DrawableId::next();
        let b = DrawableId::next();
        assert!(a < b);
        assert_ne!(a, b);
    }
}
