use std::sync::{Condvar, Mutex};
use std::time::Duration;

#[derive(Debug, Copy, Clone)]
struct RenderableState {
    size: (u32, u32),
    ready: bool,
}

/// The default render target (a window surface or an offscreen image).
///
/// The render thread waits on it before encoding a frame; the owner of the target
/// (window system, offscreen allocator) marks it ready. Waits are bounded so a stalled
/// target skips frames instead of blocking the render thread.
#[derive(Debug)]
pub struct DefaultRenderable {
    state: Mutex<RenderableState>,
    ready: Condvar,
}

impl DefaultRenderable {
    pub fn new(width: u32, height: u32, ready: bool) -> Self {
        Self {
            state: Mutex::new(RenderableState { size: (width, height), ready }),
            ready: Condvar::new(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        match self.state.lock() {
            Ok(state) => state.size,
            Err(poisoned) => poisoned.into_inner().size,
        }
    }

    pub fn resize(&self, width: u32, height: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.size = (width, height);
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state.lock().map(|s| s.ready).unwrap_or(false)
    }

    pub fn set_ready(&self, ready: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.ready = ready;
        }
        if ready {
            self.ready.notify_all();
        }
    }

    /// Blocks until the target is ready or `timeout` elapses. Returns readiness.
    pub fn wait(&self, timeout: Duration) -> bool {
        let Ok(guard) = self.state.lock() else { return false };
        match self.ready.wait_timeout_while(guard, timeout, |s| !s.ready) {
            Ok((state, _)) => state.ready,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn wait_times_out_when_not_ready() {
        let r = DefaultRenderable::new(4, 4, false);
        assert!(!r.wait(Duration::from_millis(5)));
    }

    #[test]
    fn wait_wakes_on_ready() {
        let r = Arc::new(DefaultRenderable::new(4, 4, false));
        let other = r.clone();
        let handle = std::thread::spawn(move || other.set_ready(true));
        assert!(r.wait(Duration::from_secs(5)));
        handle.join().unwrap();
    }
}
