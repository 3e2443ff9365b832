use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Canvas lifecycle. Transitions only move forward.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum CanvasState {
    Constructed,
    Started,
    Rendering,
    CloseRequested,
    Finished,
}

#[derive(Debug)]
struct Inner {
    state: CanvasState,
    frames: u64,
}

/// Lifecycle state plus the presented-frame counter, behind one condvar so
/// waiters can block on either.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    inner: Mutex<Inner>,
    changed: Condvar,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: CanvasState::Constructed,
                frames: 0,
            }),
            changed: Condvar::new(),
        }
    }

    pub fn state(&self) -> CanvasState {
        self.inner.lock().state
    }

    pub fn frames(&self) -> u64 {
        self.inner.lock().frames
    }

    /// Moves from `from` to `to`. Returns false if the state was not `from`.
    pub fn advance(&self, from: CanvasState, to: CanvasState) -> bool {
        debug_assert!(from < to);
        let mut g = self.inner.lock();
        if g.state != from {
            return false;
        }
        g.state = to;
        self.changed.notify_all();
        true
    }

    /// Requests close from `Started` or `Rendering`. Returns whether the state changed.
    pub fn request_close(&self) -> bool {
        let mut g = self.inner.lock();
        if !matches!(g.state, CanvasState::Started | CanvasState::Rendering) {
            return false;
        }
        g.state = CanvasState::CloseRequested;
        self.changed.notify_all();
        true
    }

    pub fn close_requested(&self) -> bool {
        self.state() >= CanvasState::CloseRequested
    }

    pub fn finish(&self) {
        let mut g = self.inner.lock();
        g.state = CanvasState::Finished;
        self.changed.notify_all();
    }

    pub fn frame_presented(&self) -> u64 {
        let mut g = self.inner.lock();
        g.frames += 1;
        self.changed.notify_all();
        g.frames
    }

    /// Blocks until `Finished`.
    pub fn wait_finished(&self) {
        let mut g = self.inner.lock();
        while g.state != CanvasState::Finished {
            self.changed.wait(&mut g);
        }
    }

    /// Blocks until `Finished` or `timeout`. Returns whether it finished.
    pub fn wait_finished_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut g = self.inner.lock();
        while g.state != CanvasState::Finished {
            if self.changed.wait_until(&mut g, deadline).timed_out() {
                break;
            }
        }
        g.state == CanvasState::Finished
    }

    /// Blocks until the frame counter reaches `target` or the canvas finishes.
    /// Gives up after `timeout` when one is set.
    pub fn wait_frame(&self, target: u64, timeout: Option<Duration>) -> u64 {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut g = self.inner.lock();
        while g.frames < target && g.state != CanvasState::Finished {
            match deadline {
                Some(d) => {
                    if self.changed.wait_until(&mut g, d).timed_out() {
                        break;
                    }
                }
                None => self.changed.wait(&mut g),
            }
        }
        g.frames
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn transitions_only_move_forward() {
        let lc = Lifecycle::new();
        assert!(!lc.request_close());
        assert!(lc.advance(CanvasState::Constructed, CanvasState::Started));
        assert!(!lc.advance(CanvasState::Constructed, CanvasState::Started));
        assert!(lc.advance(CanvasState::Started, CanvasState::Rendering));
        assert!(lc.request_close());
        assert!(!lc.advance(CanvasState::Started, CanvasState::Rendering));
        assert!(lc.close_requested());
        lc.finish();
        assert_eq!(lc.state(), CanvasState::Finished);
    }

    #[test]
    fn finish_wakes_waiters() {
        let lc = Arc::new(Lifecycle::new());
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let lc = lc.clone();
                std::thread::spawn(move || lc.wait_finished())
            })
            .collect();

        std::thread::sleep(Duration::from_millis(10));
        lc.finish();
        for w in waiters {
            w.join().unwrap();
        }
    }

    #[test]
    fn wait_frame_returns_on_finish() {
        let lc = Arc::new(Lifecycle::new());
        let t = {
            let lc = lc.clone();
            std::thread::spawn(move || lc.wait_frame(100, None))
        };
        lc.frame_presented();
        lc.finish();
        assert_eq!(t.join().unwrap(), 1);
    }

    #[test]
    fn wait_frame_times_out() {
        let lc = Lifecycle::new();
        assert_eq!(lc.wait_frame(1, Some(Duration::from_millis(5))), 0);
    }
}
