//! Single-slot handoff between the producers of new display data and the
//! render loop.
//!
//! A producer calling [`FrameSync::request_update`] blocks while an earlier
//! request is still waiting to be drawn, and [`FrameSync::draw`] blocks until
//! there is a request to consume. Every request therefore maps to exactly one
//! draw, and neither side can run more than one frame ahead of the other.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct State {
    pending: bool,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct FrameSync {
    state: Mutex<State>,
    // one condvar per waiter role, so notify_one never wakes a producer when
    // the renderer is the one that can make progress (and vice versa)
    ready: Condvar,
    free: Condvar,
}

impl FrameSync {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| {
            log::warn!("Frame sync mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Signals that new data is ready to be drawn. Blocks until the previous
    /// signal has been consumed. Returns `false` once the sync is closed.
    pub fn request_update(&self) -> bool {
        let state = self.lock();
        let mut state = self
            .free
            .wait_while(state, |s| s.pending && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return false;
        }
        state.pending = true;
        drop(state);
        self.ready.notify_one();
        true
    }

    /// Waits for a pending signal and runs `draw` while holding the lock, so
    /// no producer can signal again before the draw finished. Returns `None`
    /// without running `draw` once the sync is closed.
    pub fn draw<R>(&self, draw: impl FnOnce() -> R) -> Option<R> {
        let state = self.lock();
        let mut state = self
            .ready
            .wait_while(state, |s| !s.pending && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return None;
        }
        let result = draw();
        state.pending = false;
        drop(state);
        self.free.notify_one();
        Some(result)
    }

    /// Releases everyone blocked on this sync. Producers stop, and the render
    /// loop sees `None` from `draw`.
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
        self.free.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
