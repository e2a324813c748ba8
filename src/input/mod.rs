//! Input normalization.
//!
//! Raw events from the host arrive in several shapes: device-native wheel ticks without any
//! payload, generic wheel events with a signed delta, and navigation keys. All of them collapse
//! into a [`Tick`] that only carries a direction and a timestamp. Magnitude is never taken from
//! the device; the motion integrator synthesizes it.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::utils::id::IdCounter;

pub mod tick_buffer;

pub use tick_buffer::TickBuffer;

/// Direction of a tick along the scroll axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Toward smaller offsets.
    Backward,
    /// Toward larger offsets.
    Forward,
}

impl Direction {
    pub fn signum(self) -> f64 {
        match self {
            Direction::Backward => -1.,
            Direction::Forward => 1.,
        }
    }

    /// Returns the direction of a signed amount, or `None` for zero and NaN.
    pub fn from_sign(amount: f64) -> Option<Self> {
        if amount > 0. {
            Some(Direction::Forward)
        } else if amount < 0. {
            Some(Direction::Backward)
        } else {
            None
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Direction::Backward => Direction::Forward,
            Direction::Forward => Direction::Backward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub timestamp: Duration,
    pub direction: Direction,
}

/// The two event kinds a notched hardware wheel reports.
///
/// The device names them after the finger motion, which is the opposite of the content motion:
/// rolling "up" drags the list toward its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickKind {
    ScrollUp,
    ScrollDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Next,
    Previous,
    /// Any key that doesn't navigate.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputEventKind {
    DeviceTick(TickKind),
    Wheel { delta_y: f64 },
    Key(Key),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEvent {
    /// Monotonic time supplied by the host.
    pub time: Duration,
    pub kind: InputEventKind,
}

/// What the host should do with an event after a listener saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The event was turned into motion: suppress default scrolling and stop propagation.
    Consumed,
    /// The event is not ours.
    Propagate,
}

/// Maps raw events to ticks.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputNormalizer {
    invert_device_ticks: bool,
    ignore_wheel: bool,
    ignore_keys: bool,
}

impl InputNormalizer {
    pub fn new(config: &tickglide_config::Input) -> Self {
        Self {
            invert_device_ticks: config.invert_device_ticks,
            ignore_wheel: config.ignore_wheel,
            ignore_keys: config.ignore_keys,
        }
    }

    pub fn normalize(&self, event: &InputEvent) -> Option<Tick> {
        let direction = match event.kind {
            InputEventKind::DeviceTick(kind) => {
                Some(device_tick_direction(kind, self.invert_device_ticks))
            }
            InputEventKind::Wheel { .. } if self.ignore_wheel => None,
            InputEventKind::Wheel { delta_y } => Direction::from_sign(delta_y),
            InputEventKind::Key(_) if self.ignore_keys => None,
            InputEventKind::Key(Key::Next) => Some(Direction::Forward),
            InputEventKind::Key(Key::Previous) => Some(Direction::Backward),
            InputEventKind::Key(Key::Other) => None,
        }?;

        Some(Tick {
            timestamp: event.time,
            direction,
        })
    }
}

/// The one place that decides which device tick kind moves content which way.
fn device_tick_direction(kind: TickKind, invert: bool) -> Direction {
    let direction = match kind {
        TickKind::ScrollUp => Direction::Forward,
        TickKind::ScrollDown => Direction::Backward,
    };

    if invert {
        direction.reversed()
    } else {
        direction
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

pub type Listener = Box<dyn FnMut(&InputEvent) -> Disposition>;

/// Something that delivers raw input events to subscribed listeners.
pub trait InputSource {
    fn subscribe(&self, listener: Listener) -> ListenerId;

    /// Removes the listener. Unknown ids are ignored.
    fn unsubscribe(&self, id: ListenerId);
}

/// Input source driven by explicit [`ManualInputSource::dispatch`] calls.
///
/// Listeners are called in subscription order until one consumes the event.
#[derive(Clone, Default)]
pub struct ManualInputSource {
    inner: Rc<ManualInputInner>,
}

#[derive(Default)]
struct ManualInputInner {
    ids: IdCounter,
    listeners: RefCell<Vec<(ListenerId, Rc<RefCell<Listener>>)>>,
}

impl ManualInputSource {
    pub fn dispatch(&self, event: InputEvent) -> Disposition {
        // Listeners may unsubscribe anyone, including themselves, while we iterate.
        let listeners: Vec<_> = self.inner.listeners.borrow().clone();

        for (id, listener) in listeners {
            if !self.is_subscribed(id) {
                continue;
            }

            let Ok(mut listener) = listener.try_borrow_mut() else {
                warn!("input listener dispatched re-entrantly, skipping");
                continue;
            };

            if listener(&event) == Disposition::Consumed {
                return Disposition::Consumed;
            }
        }

        Disposition::Propagate
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    fn is_subscribed(&self, id: ListenerId) -> bool {
        self.inner
            .listeners
            .borrow()
            .iter()
            .any(|(other, _)| *other == id)
    }
}

impl InputSource for ManualInputSource {
    fn subscribe(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.inner.ids.next());
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(listener))));
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.inner
            .listeners
            .borrow_mut()
            .retain(|(other, _)| *other != id);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn event(kind: InputEventKind) -> InputEvent {
        InputEvent {
            time: Duration::from_millis(42),
            kind,
        }
    }

    fn direction_of(normalizer: &InputNormalizer, kind: InputEventKind) -> Option<Direction> {
        normalizer.normalize(&event(kind)).map(|tick| tick.direction)
    }

    #[test]
    fn device_ticks_are_inverted_relative_to_their_names() {
        let normalizer = InputNormalizer::default();
        assert_eq!(
            direction_of(&normalizer, InputEventKind::DeviceTick(TickKind::ScrollUp)),
            Some(Direction::Forward)
        );
        assert_eq!(
            direction_of(&normalizer, InputEventKind::DeviceTick(TickKind::ScrollDown)),
            Some(Direction::Backward)
        );
    }

    #[test]
    fn invert_device_ticks_flips_only_device_ticks() {
        let normalizer = InputNormalizer::new(&tickglide_config::Input {
            invert_device_ticks: true,
            ..Default::default()
        });
        assert_eq!(
            direction_of(&normalizer, InputEventKind::DeviceTick(TickKind::ScrollUp)),
            Some(Direction::Backward)
        );
        assert_eq!(
            direction_of(&normalizer, InputEventKind::Wheel { delta_y: 3. }),
            Some(Direction::Forward)
        );
        assert_eq!(
            direction_of(&normalizer, InputEventKind::Key(Key::Next)),
            Some(Direction::Forward)
        );
    }

    #[test]
    fn wheel_uses_sign_only() {
        let normalizer = InputNormalizer::default();
        assert_eq!(
            direction_of(&normalizer, InputEventKind::Wheel { delta_y: 0.01 }),
            Some(Direction::Forward)
        );
        assert_eq!(
            direction_of(&normalizer, InputEventKind::Wheel { delta_y: -500. }),
            Some(Direction::Backward)
        );
        assert_eq!(
            direction_of(&normalizer, InputEventKind::Wheel { delta_y: 0. }),
            None
        );
        assert_eq!(
            direction_of(&normalizer, InputEventKind::Wheel { delta_y: f64::NAN }),
            None
        );
    }

    #[test]
    fn keys() {
        let normalizer = InputNormalizer::default();
        assert_eq!(
            direction_of(&normalizer, InputEventKind::Key(Key::Next)),
            Some(Direction::Forward)
        );
        assert_eq!(
            direction_of(&normalizer, InputEventKind::Key(Key::Previous)),
            Some(Direction::Backward)
        );
        assert_eq!(direction_of(&normalizer, InputEventKind::Key(Key::Other)), None);
    }

    #[test]
    fn ignored_sources() {
        let normalizer = InputNormalizer::new(&tickglide_config::Input {
            ignore_wheel: true,
            ignore_keys: true,
            ..Default::default()
        });
        assert_eq!(
            direction_of(&normalizer, InputEventKind::Wheel { delta_y: 1. }),
            None
        );
        assert_eq!(direction_of(&normalizer, InputEventKind::Key(Key::Next)), None);
        assert!(direction_of(&normalizer, InputEventKind::DeviceTick(TickKind::ScrollUp)).is_some());
    }

    #[test]
    fn tick_keeps_event_time() {
        let tick = InputNormalizer::default()
            .normalize(&event(InputEventKind::Key(Key::Next)))
            .unwrap();
        assert_eq!(tick.timestamp, Duration::from_millis(42));
    }

    #[test]
    fn consumed_events_stop_propagation() {
        let source = ManualInputSource::default();
        let second_called = Rc::new(Cell::new(false));

        source.subscribe(Box::new(|_| Disposition::Consumed));
        let flag = second_called.clone();
        source.subscribe(Box::new(move |_| {
            flag.set(true);
            Disposition::Propagate
        }));

        let disposition = source.dispatch(event(InputEventKind::Key(Key::Next)));
        assert_eq!(disposition, Disposition::Consumed);
        assert!(!second_called.get());
    }

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let source = ManualInputSource::default();
        let calls = Rc::new(Cell::new(0));

        let counter = calls.clone();
        let id = source.subscribe(Box::new(move |_| {
            counter.set(counter.get() + 1);
            Disposition::Propagate
        }));

        source.dispatch(event(InputEventKind::Key(Key::Next)));
        source.unsubscribe(id);
        source.unsubscribe(id);
        let disposition = source.dispatch(event(InputEventKind::Key(Key::Next)));

        assert_eq!(calls.get(), 1);
        assert_eq!(disposition, Disposition::Propagate);
        assert_eq!(source.listener_count(), 0);
    }

    #[test]
    fn listener_can_unsubscribe_a_later_listener_mid_dispatch() {
        let source = ManualInputSource::default();
        let later_called = Rc::new(Cell::new(false));
        let later_id = Rc::new(Cell::new(None));

        let source_clone = source.clone();
        let id_slot = later_id.clone();
        source.subscribe(Box::new(move |_| {
            if let Some(id) = id_slot.get() {
                source_clone.unsubscribe(id);
            }
            Disposition::Propagate
        }));

        let flag = later_called.clone();
        later_id.set(Some(source.subscribe(Box::new(move |_| {
            flag.set(true);
            Disposition::Propagate
        }))));

        source.dispatch(event(InputEventKind::Key(Key::Next)));
        assert!(!later_called.get());
        assert_eq!(source.listener_count(), 1);
    }
}
