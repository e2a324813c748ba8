use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context as _;
use calloop::timer::{TimeoutAction, Timer};
use calloop::{LoopHandle, RegistrationToken};

use super::{FrameSource, StepCallback, StepHandle};
use crate::frame_clock::FrameClock;
use crate::utils::get_monotonic_time;
use crate::utils::id::IdCounter;

/// Frame source that fires calloop timers on an estimated refresh grid.
///
/// Without a real vblank signal, frames are paced by a [`FrameClock`] that assumes every frame
/// we run is presented.
pub struct CalloopFrameSource<D: 'static> {
    event_loop: LoopHandle<'static, D>,
    frame_clock: Rc<RefCell<FrameClock>>,
    tokens: Rc<RefCell<HashMap<StepHandle, RegistrationToken>>>,
    ids: IdCounter,
}

impl<D: 'static> CalloopFrameSource<D> {
    pub fn new(event_loop: LoopHandle<'static, D>, refresh_interval: Duration) -> Self {
        Self {
            event_loop,
            frame_clock: Rc::new(RefCell::new(FrameClock::new(Some(refresh_interval)))),
            tokens: Rc::new(RefCell::new(HashMap::new())),
            ids: IdCounter::new(),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.tokens.borrow().len()
    }
}

impl<D: 'static> FrameSource for CalloopFrameSource<D> {
    fn request_step(&self, callback: StepCallback) -> anyhow::Result<StepHandle> {
        let handle = StepHandle::new(self.ids.next());

        let now = get_monotonic_time();
        let target = self.frame_clock.borrow().next_presentation_time(now);
        let timer = Timer::from_duration(target.saturating_sub(now));

        let frame_clock = self.frame_clock.clone();
        let tokens = self.tokens.clone();
        let mut callback = Some(callback);

        let token = self
            .event_loop
            .insert_source(timer, move |_, _, _| {
                tokens.borrow_mut().remove(&handle);

                let time = get_monotonic_time();
                frame_clock.borrow_mut().presented(time);

                if let Some(callback) = callback.take() {
                    callback(time);
                }

                TimeoutAction::Drop
            })
            .map_err(|err| err.error)
            .context("error inserting frame timer")?;

        self.tokens.borrow_mut().insert(handle, token);
        Ok(handle)
    }

    fn cancel_step(&self, handle: StepHandle) {
        let token = self.tokens.borrow_mut().remove(&handle);
        if let Some(token) = token {
            self.event_loop.remove(token);
        }
    }
}

impl<D: 'static> fmt::Debug for CalloopFrameSource<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalloopFrameSource")
            .field("frame_clock", &self.frame_clock.borrow())
            .field("pending", &self.tokens.borrow().len())
            .finish()
    }
}
