use std::collections::VecDeque;
use std::time::Duration;

use super::{Direction, Tick};

/// Sliding window of recent ticks, used to tell live input from idle.
///
/// The window only answers "is input arriving right now" and "which way did it last go". It
/// never contributes to velocity magnitude.
#[derive(Debug)]
pub struct TickBuffer {
    history: VecDeque<Tick>,
    /// Newest tick ever recorded, kept across [`TickBuffer::clear`].
    last_tick_time: Option<Duration>,
    /// Ticks recorded since the last [`TickBuffer::take_unconsumed`].
    unconsumed: usize,
    /// Ticks at least this old are pruned on every record.
    window: Duration,
    /// Input counts as live for this long after the last tick.
    timeout: Duration,
}

impl TickBuffer {
    pub fn new(window: Duration, timeout: Duration) -> Self {
        Self {
            history: VecDeque::new(),
            last_tick_time: None,
            unconsumed: 0,
            window,
            timeout,
        }
    }

    /// Pushes a new tick into the window.
    ///
    /// Returns `false` if the tick was dropped for going back in time.
    pub fn record(&mut self, tick: Tick) -> bool {
        if let Some(last) = self.last_tick_time {
            if tick.timestamp < last {
                trace!(
                    "ignoring tick with timestamp {:?} earlier than last {last:?}",
                    tick.timestamp,
                );
                return false;
            }
        }

        self.history.push_back(tick);
        self.last_tick_time = Some(tick.timestamp);
        self.unconsumed += 1;

        self.trim_history(tick.timestamp);
        true
    }

    pub fn is_active(&self, now: Duration) -> bool {
        let Some(last) = self.last_tick_time else {
            return false;
        };

        !self.history.is_empty() && now.saturating_sub(last) < self.timeout
    }

    /// Direction of the most recent tick still in the window.
    pub fn last_direction(&self) -> Option<Direction> {
        self.history.back().map(|tick| tick.direction)
    }

    pub fn last_tick_time(&self) -> Option<Duration> {
        self.last_tick_time
    }

    /// Returns how many ticks were recorded since the previous call, and resets the count.
    pub fn take_unconsumed(&mut self) -> usize {
        std::mem::take(&mut self.unconsumed)
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tick> + '_ {
        self.history.iter()
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.unconsumed = 0;
    }

    fn trim_history(&mut self, now: Duration) {
        while let Some(first) = self.history.front() {
            if now.saturating_sub(first.timestamp) < self.window {
                break;
            }

            let _ = self.history.pop_front();
        }
    }
}
