//! The surface being scrolled.
//!
//! Targets are owned by the surrounding view. The controller only keeps a weak reference and
//! treats every access as fallible: the view may be gone, busy, or an embedded document may
//! refuse access to its offset altogether.

use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::rc::{Rc, Weak};

pub trait ScrollTarget {
    fn offset(&self) -> Result<f64, TargetUnavailable>;

    fn set_offset(&mut self, offset: f64) -> Result<(), TargetUnavailable>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetUnavailable {
    /// The owner dropped the target.
    Gone,
    /// The target is borrowed elsewhere right now.
    Busy,
    /// The target refused the access, e.g. an embedded document from another origin.
    Denied(String),
}

impl fmt::Display for TargetUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetUnavailable::Gone => f.write_str("scroll target no longer exists"),
            TargetUnavailable::Busy => f.write_str("scroll target is in use"),
            TargetUnavailable::Denied(reason) => {
                write!(f, "scroll target denied offset access: {reason}")
            }
        }
    }
}

impl Error for TargetUnavailable {}

/// Result of trying to move the target.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Written { offset: f64 },
    Skipped(TargetUnavailable),
}

impl WriteOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, WriteOutcome::Skipped(_))
    }
}

/// Guards every access to a borrowed [`ScrollTarget`].
///
/// Failures are reported once as a warning, then only at trace level, and never propagated.
pub struct ScrollTargetAdapter {
    target: Weak<RefCell<dyn ScrollTarget>>,
    printed_warning: bool,
}

impl ScrollTargetAdapter {
    pub fn new<T: ScrollTarget + 'static>(target: &Rc<RefCell<T>>) -> Self {
        let target: Rc<RefCell<dyn ScrollTarget>> = target.clone();
        Self {
            target: Rc::downgrade(&target),
            printed_warning: false,
        }
    }

    /// Moves the target by `delta`.
    ///
    /// A failed access is not retried; the next frame simply tries again.
    pub fn apply_delta(&mut self, delta: f64) -> WriteOutcome {
        let rv = self.with_target(|target| {
            let offset = target.offset()? + delta;
            target.set_offset(offset)?;
            // The target may clamp the value to its extent.
            target.offset().or(Ok(offset))
        });

        match rv {
            Ok(offset) => WriteOutcome::Written { offset },
            Err(err) => {
                self.report(&err);
                WriteOutcome::Skipped(err)
            }
        }
    }

    fn with_target<R>(
        &self,
        f: impl FnOnce(&mut dyn ScrollTarget) -> Result<R, TargetUnavailable>,
    ) -> Result<R, TargetUnavailable> {
        let target = self.target.upgrade().ok_or(TargetUnavailable::Gone)?;
        let mut target = target
            .try_borrow_mut()
            .map_err(|_| TargetUnavailable::Busy)?;
        f(&mut *target)
    }

    fn report(&mut self, err: &TargetUnavailable) {
        if self.printed_warning {
            trace!("skipping scroll target access: {err}");
        } else {
            self.printed_warning = true;
            warn!("skipping scroll target access, motion will continue without it: {err}");
        }
    }
}

impl fmt::Debug for ScrollTargetAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollTargetAdapter")
            .field("alive", &(self.target.strong_count() > 0))
            .field("printed_warning", &self.printed_warning)
            .finish()
    }
}

/// In-memory scroll target, clamped to `0..=extent` when an extent is set.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Viewport {
    offset: f64,
    extent: Option<f64>,
}

impl Viewport {
    pub fn new(extent: Option<f64>) -> Self {
        Self {
            offset: 0.,
            extent: extent.map(|extent| extent.max(0.)),
        }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }
}

impl ScrollTarget for Viewport {
    fn offset(&self) -> Result<f64, TargetUnavailable> {
        Ok(self.offset)
    }

    fn set_offset(&mut self, offset: f64) -> Result<(), TargetUnavailable> {
        self.offset = match self.extent {
            Some(extent) => offset.clamp(0., extent),
            None => offset,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Denying;

    impl ScrollTarget for Denying {
        fn offset(&self) -> Result<f64, TargetUnavailable> {
            Ok(0.)
        }

        fn set_offset(&mut self, _offset: f64) -> Result<(), TargetUnavailable> {
            Err(TargetUnavailable::Denied(String::from("cross-origin")))
        }
    }

    #[test]
    fn applies_delta() {
        let viewport = Rc::new(RefCell::new(Viewport::new(None)));
        let mut adapter = ScrollTargetAdapter::new(&viewport);

        assert_eq!(adapter.apply_delta(2.5), WriteOutcome::Written { offset: 2.5 });
        assert_eq!(adapter.apply_delta(-4.), WriteOutcome::Written { offset: -1.5 });
        assert_eq!(viewport.borrow().offset(), -1.5);
    }

    #[test]
    fn reports_clamped_offset() {
        let viewport = Rc::new(RefCell::new(Viewport::new(Some(10.))));
        let mut adapter = ScrollTargetAdapter::new(&viewport);

        assert_eq!(adapter.apply_delta(-3.), WriteOutcome::Written { offset: 0. });
        assert_eq!(adapter.apply_delta(25.), WriteOutcome::Written { offset: 10. });
    }

    #[test]
    fn dropped_target_is_skipped() {
        let viewport = Rc::new(RefCell::new(Viewport::new(None)));
        let mut adapter = ScrollTargetAdapter::new(&viewport);
        drop(viewport);

        assert_eq!(
            adapter.apply_delta(1.),
            WriteOutcome::Skipped(TargetUnavailable::Gone)
        );
    }

    #[test]
    fn borrowed_target_is_skipped() {
        let viewport = Rc::new(RefCell::new(Viewport::new(None)));
        let mut adapter = ScrollTargetAdapter::new(&viewport);

        let _guard = viewport.borrow_mut();
        assert_eq!(
            adapter.apply_delta(1.),
            WriteOutcome::Skipped(TargetUnavailable::Busy)
        );
    }

    #[test]
    fn denied_write_is_skipped_every_time() {
        let target = Rc::new(RefCell::new(Denying));
        let mut adapter = ScrollTargetAdapter::new(&target);

        for _ in 0..3 {
            assert!(adapter.apply_delta(1.).is_skipped());
        }
        assert!(adapter.printed_warning);
    }

    #[test]
    fn recovers_when_target_becomes_available() {
        let viewport = Rc::new(RefCell::new(Viewport::new(None)));
        let mut adapter = ScrollTargetAdapter::new(&viewport);

        {
            let _guard = viewport.borrow();
            assert!(adapter.apply_delta(1.).is_skipped());
        }
        assert_eq!(adapter.apply_delta(1.), WriteOutcome::Written { offset: 1. });
    }
}
