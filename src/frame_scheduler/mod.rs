//! Per-frame scheduling with at most one pending frame.
//!
//! The scheduler doesn't know about display refresh itself. It asks an injected [`FrameSource`]
//! for the next frame, which lets tests and replays drive frames from a virtual clock.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

mod event_loop;
mod manual;

pub use event_loop::CalloopFrameSource;
pub use manual::ManualFrameSource;

/// Runs one frame at the given frame time.
pub type StepCallback = Box<dyn FnOnce(Duration)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepHandle(u32);

impl StepHandle {
    pub(crate) fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Host capability that calls back once on the next display refresh.
pub trait FrameSource {
    /// Queues `callback` for the next frame.
    ///
    /// The callback must not run from within this call.
    fn request_step(&self, callback: StepCallback) -> anyhow::Result<StepHandle>;

    /// Cancels a pending callback. Handles that already fired or were cancelled are ignored.
    fn cancel_step(&self, handle: StepHandle);
}

pub struct FrameScheduler {
    source: Rc<dyn FrameSource>,
    pending: Option<StepHandle>,
}

impl FrameScheduler {
    pub fn new(source: Rc<dyn FrameSource>) -> Self {
        Self {
            source,
            pending: None,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.pending.is_some()
    }

    /// Schedules a frame unless one is already pending.
    ///
    /// `make_callback` is only called when a new frame is actually requested. Returns whether a
    /// frame is pending afterwards.
    pub fn ensure_running(&mut self, make_callback: impl FnOnce() -> StepCallback) -> bool {
        if self.pending.is_some() {
            return true;
        }

        match self.source.request_step(make_callback()) {
            Ok(handle) => {
                trace!("scheduled frame {handle:?}");
                self.pending = Some(handle);
                true
            }
            Err(err) => {
                warn!("error scheduling frame: {err:?}");
                false
            }
        }
    }

    /// Marks the pending frame as running.
    ///
    /// Must be called first thing in the frame callback, so that the step can schedule the next
    /// frame.
    pub fn frame_started(&mut self) {
        self.pending = None;
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            trace!("cancelling frame {handle:?}");
            self.source.cancel_step(handle);
        }
    }
}

impl fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
