//! Scroll controller: attaches motion to one scroll target at a time.
//!
//! Input listeners and frame callbacks both run on the host's single UI thread, so the shared
//! state lives in an `Rc<RefCell<_>>`. Callbacks only hold a `Weak` to it and check the
//! attachment generation, so a callback that outlives its attachment does nothing.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use serde::Serialize;
use tickglide_config::Config;

use crate::frame_scheduler::{FrameScheduler, FrameSource, StepCallback};
use crate::input::{Disposition, InputEvent, InputNormalizer, InputSource, ListenerId};
use crate::motion::{MotionParams, MotionState, Phase, StepReport};
use crate::target::{ScrollTarget, ScrollTargetAdapter};

pub type FrameObserver = Box<dyn FnMut(Duration, &StepReport)>;

#[derive(Clone)]
pub struct ScrollController {
    inner: Rc<RefCell<Inner>>,
}

struct Inner {
    params: MotionParams,
    normalizer: InputNormalizer,
    frames: Rc<dyn FrameSource>,
    next_generation: u32,
    attachment: Option<Attachment>,
    observer: Option<FrameObserver>,
}

struct Attachment {
    generation: u32,
    // Field order matters only for drops; detach() tears down explicitly.
    scheduler: FrameScheduler,
    input: Rc<dyn InputSource>,
    listener: ListenerId,
    state: MotionState,
    target: ScrollTargetAdapter,
}

/// Point-in-time view of the motion state, for inspection and logging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionSnapshot {
    pub phase: Phase,
    pub velocity: f64,
    /// -1, 0 or 1.
    pub direction: i8,
    pub last_tick_time: Option<Duration>,
    pub scheduled: bool,
    pub buffered_ticks: usize,
}

impl ScrollController {
    pub fn new(config: &Config, frames: Rc<dyn FrameSource>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                params: MotionParams::from(&config.motion),
                normalizer: InputNormalizer::new(&config.input),
                frames,
                next_generation: 0,
                attachment: None,
                observer: None,
            })),
        }
    }

    /// Starts driving `target` from the events of `input`.
    ///
    /// Any previous attachment is detached first; motion always starts from rest.
    pub fn attach<T: ScrollTarget + 'static>(
        &self,
        target: &Rc<RefCell<T>>,
        input: Rc<dyn InputSource>,
    ) {
        self.detach();

        let weak = Rc::downgrade(&self.inner);
        let listener = input.subscribe(Box::new(move |event| handle_event(&weak, event)));

        let mut inner = self.inner.borrow_mut();
        let generation = inner.next_generation;
        inner.next_generation = inner.next_generation.wrapping_add(1);

        inner.attachment = Some(Attachment {
            generation,
            scheduler: FrameScheduler::new(inner.frames.clone()),
            input,
            listener,
            state: MotionState::new(inner.params),
            target: ScrollTargetAdapter::new(target),
        });

        debug!("attached scroll controller, generation {generation}");
    }

    /// Stops all motion and releases the target and the input source.
    ///
    /// Safe to call when nothing is attached.
    pub fn detach(&self) {
        let Some(mut attachment) = self.inner.borrow_mut().attachment.take() else {
            return;
        };

        // Cancel frames first, then stop listening, then drop the state, so that nothing can
        // touch the target in between.
        attachment.scheduler.cancel();
        attachment.input.unsubscribe(attachment.listener);
        debug!(
            "detached scroll controller, generation {}",
            attachment.generation
        );
        drop(attachment);
    }

    pub fn is_attached(&self) -> bool {
        self.inner.borrow().attachment.is_some()
    }

    pub fn is_scheduled(&self) -> bool {
        self.inner
            .borrow()
            .attachment
            .as_ref()
            .is_some_and(|a| a.scheduler.is_scheduled())
    }

    pub fn snapshot(&self) -> Option<MotionSnapshot> {
        let inner = self.inner.borrow();
        let attachment = inner.attachment.as_ref()?;
        let state = &attachment.state;

        Some(MotionSnapshot {
            phase: state.phase(),
            velocity: state.velocity(),
            direction: state.direction_sign(),
            last_tick_time: state.ticks().last_tick_time(),
            scheduled: attachment.scheduler.is_scheduled(),
            buffered_ticks: state.ticks().len(),
        })
    }

    /// Sets a callback that sees the result of every frame step.
    pub fn set_frame_observer(&self, observer: Option<FrameObserver>) {
        self.inner.borrow_mut().observer = observer;
    }

    /// Feeds an event directly, for hosts that route input themselves.
    pub fn handle_event(&self, event: &InputEvent) -> Disposition {
        handle_event(&Rc::downgrade(&self.inner), event)
    }
}

fn handle_event(inner: &Weak<RefCell<Inner>>, event: &InputEvent) -> Disposition {
    let Some(rc) = inner.upgrade() else {
        return Disposition::Propagate;
    };
    let mut guard = rc.borrow_mut();
    let inner = &mut *guard;

    let Some(tick) = inner.normalizer.normalize(event) else {
        return Disposition::Propagate;
    };

    let Some(attachment) = &mut inner.attachment else {
        trace!("dropping {tick:?}: no scroll target attached");
        return Disposition::Propagate;
    };

    if attachment.state.record_tick(tick) {
        trace!("recorded {tick:?}");
        ensure_running(&rc, attachment);
    }

    Disposition::Consumed
}

fn ensure_running(rc: &Rc<RefCell<Inner>>, attachment: &mut Attachment) {
    let weak = Rc::downgrade(rc);
    let generation = attachment.generation;
    attachment.scheduler.ensure_running(move || -> StepCallback {
        Box::new(move |now| run_frame(&weak, generation, now))
    });
}

fn run_frame(weak: &Weak<RefCell<Inner>>, generation: u32, now: Duration) {
    let _span = tracy_client::span!("run_frame");

    let Some(rc) = weak.upgrade() else {
        return;
    };

    let (report, observer) = {
        let mut guard = rc.borrow_mut();
        let inner = &mut *guard;

        let Some(attachment) = inner
            .attachment
            .as_mut()
            .filter(|a| a.generation == generation)
        else {
            trace!("ignoring frame for stale generation {generation}");
            return;
        };

        attachment.scheduler.frame_started();
        let report = attachment.state.step(now, &mut attachment.target);

        if !report.is_idle() {
            ensure_running(&rc, attachment);
        }

        (report, inner.observer.take())
    };

    // Called without holding the borrow so the observer can inspect the controller.
    if let Some(mut observer) = observer {
        observer(now, &report);

        let mut inner = rc.borrow_mut();
        if inner.observer.is_none() {
            inner.observer = Some(observer);
        }
    }
}

impl fmt::Debug for ScrollController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ScrollController")
            .field("params", &inner.params)
            .field("normalizer", &inner.normalizer)
            .field("attached", &inner.attachment.is_some())
            .finish()
    }
}
