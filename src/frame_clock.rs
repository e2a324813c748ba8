use std::num::NonZeroU64;
use std::time::Duration;

/// Predicts display refresh times from the last presented frame and the refresh interval.
#[derive(Debug)]
pub struct FrameClock {
    last_presentation_time: Option<Duration>,
    refresh_interval_ns: Option<NonZeroU64>,
}

impl FrameClock {
    pub fn new(refresh_interval: Option<Duration>) -> Self {
        let refresh_interval_ns = refresh_interval
            .and_then(|interval| u64::try_from(interval.as_nanos()).ok())
            .and_then(NonZeroU64::new);

        Self {
            last_presentation_time: None,
            refresh_interval_ns,
        }
    }

    pub fn presented(&mut self, presentation_time: Duration) {
        if presentation_time.is_zero() {
            // Not interested in these.
            return;
        }

        self.last_presentation_time = Some(presentation_time);
    }

    /// Returns the first refresh strictly after `now`.
    ///
    /// Without a known refresh interval or any presented frame yet, returns `now`.
    pub fn next_presentation_time(&self, now: Duration) -> Duration {
        let Some(refresh_interval_ns) = self.refresh_interval_ns else {
            return now;
        };
        let Some(last_presentation_time) = self.last_presentation_time else {
            return now;
        };

        let refresh_interval_ns = refresh_interval_ns.get();

        if now < last_presentation_time {
            // A frame was presented ahead of our idea of the current time.
            return last_presentation_time + Duration::from_nanos(refresh_interval_ns);
        }

        let since_last = now - last_presentation_time;
        let since_last_ns =
            since_last.as_secs() * 1_000_000_000 + u64::from(since_last.subsec_nanos());
        let to_next_ns = (since_last_ns / refresh_interval_ns + 1) * refresh_interval_ns;
        last_presentation_time + Duration::from_nanos(to_next_ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn without_interval_returns_now() {
        let mut clock = FrameClock::new(None);
        clock.presented(10 * MS);
        assert_eq!(clock.next_presentation_time(13 * MS), 13 * MS);
    }

    #[test]
    fn before_first_frame_returns_now() {
        let clock = FrameClock::new(Some(16 * MS));
        assert_eq!(clock.next_presentation_time(5 * MS), 5 * MS);
    }

    #[test]
    fn aligns_to_refresh_grid() {
        let mut clock = FrameClock::new(Some(16 * MS));
        clock.presented(100 * MS);

        assert_eq!(clock.next_presentation_time(100 * MS), 116 * MS);
        assert_eq!(clock.next_presentation_time(105 * MS), 116 * MS);
        assert_eq!(clock.next_presentation_time(116 * MS), 132 * MS);
        assert_eq!(clock.next_presentation_time(150 * MS), 164 * MS);
    }

    #[test]
    fn early_presentation() {
        let mut clock = FrameClock::new(Some(16 * MS));
        clock.presented(100 * MS);
        assert_eq!(clock.next_presentation_time(90 * MS), 116 * MS);
    }

    #[test]
    fn zero_presentation_time_is_ignored() {
        let mut clock = FrameClock::new(Some(16 * MS));
        clock.presented(Duration::ZERO);
        assert_eq!(clock.next_presentation_time(7 * MS), 7 * MS);
    }
}
