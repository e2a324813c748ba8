use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;
use std::time::Duration;

use super::{FrameSource, StepCallback, StepHandle};
use crate::utils::id::IdCounter;

/// Frame source driven by a virtual clock.
///
/// Nothing happens until [`ManualFrameSource::advance`] or [`ManualFrameSource::run_frame`] is
/// called, which makes frame timing fully deterministic.
#[derive(Clone)]
pub struct ManualFrameSource {
    inner: Rc<RefCell<Inner>>,
}

struct Inner {
    now: Duration,
    interval: Duration,
    ids: IdCounter,
    pending: Vec<(StepHandle, StepCallback)>,
}

impl ManualFrameSource {
    pub fn new(interval: Duration) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                now: Duration::ZERO,
                interval,
                ids: IdCounter::new(),
                pending: Vec::new(),
            })),
        }
    }

    /// Time of the last frame run.
    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    pub fn pending_count(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Moves the clock one interval forward and runs a frame there.
    pub fn advance(&self) -> usize {
        let time = {
            let inner = self.inner.borrow();
            inner.now + inner.interval
        };
        self.run_frame(time)
    }

    /// Runs every callback pending at this point with `time` as the frame time.
    ///
    /// Callbacks requested while the frame runs are left for the next frame. Returns the number
    /// of callbacks run.
    pub fn run_frame(&self, time: Duration) -> usize {
        let due = {
            let mut inner = self.inner.borrow_mut();
            inner.now = time;
            mem::take(&mut inner.pending)
        };

        let count = due.len();
        for (_, callback) in due {
            callback(time);
        }
        count
    }
}

impl FrameSource for ManualFrameSource {
    fn request_step(&self, callback: StepCallback) -> anyhow::Result<StepHandle> {
        let mut inner = self.inner.borrow_mut();
        let handle = StepHandle::new(inner.ids.next());
        inner.pending.push((handle, callback));
        Ok(handle)
    }

    fn cancel_step(&self, handle: StepHandle) {
        self.inner
            .borrow_mut()
            .pending
            .retain(|(other, _)| *other != handle);
    }
}

impl fmt::Debug for ManualFrameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ManualFrameSource")
            .field("now", &inner.now)
            .field("interval", &inner.interval)
            .field("pending", &inner.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn runs_callbacks_with_frame_time() {
        let source = ManualFrameSource::new(Duration::from_millis(16));
        let seen = Rc::new(Cell::new(None));

        let seen_clone = seen.clone();
        source
            .request_step(Box::new(move |time| seen_clone.set(Some(time))))
            .unwrap();

        assert_eq!(source.advance(), 1);
        assert_eq!(seen.get(), Some(Duration::from_millis(16)));
        assert_eq!(source.now(), Duration::from_millis(16));
        assert_eq!(source.advance(), 0);
    }

    #[test]
    fn callbacks_requested_during_a_frame_wait_for_the_next_one() {
        let source = ManualFrameSource::new(Duration::from_millis(10));
        let runs = Rc::new(Cell::new(0));

        let source_clone = source.clone();
        let runs_clone = runs.clone();
        source
            .request_step(Box::new(move |_| {
                runs_clone.set(runs_clone.get() + 1);
                let runs = runs_clone.clone();
                source_clone
                    .request_step(Box::new(move |_| runs.set(runs.get() + 1)))
                    .unwrap();
            }))
            .unwrap();

        assert_eq!(source.advance(), 1);
        assert_eq!(runs.get(), 1);
        assert_eq!(source.pending_count(), 1);

        assert_eq!(source.advance(), 1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn cancelled_callback_never_runs() {
        let source = ManualFrameSource::new(Duration::from_millis(16));
        let ran = Rc::new(Cell::new(false));

        let ran_clone = ran.clone();
        let handle = source
            .request_step(Box::new(move |_| ran_clone.set(true)))
            .unwrap();
        source.cancel_step(handle);
        source.cancel_step(handle);

        source.advance();
        assert!(!ran.get());
    }
}
