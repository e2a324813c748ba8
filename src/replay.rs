//! Offline replay of recorded input.
//!
//! A trace is a JSON document with timed input events. The replay runs the real controller
//! against an in-memory viewport, with frames driven by a virtual clock, so the output only
//! depends on the trace and the config.

use std::cell::RefCell;
use std::fs;
use std::io::{self, Read as _, Write as _};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{bail, ensure, Context as _};
use serde::{Deserialize, Serialize};
use tickglide_config::Config;

use crate::cli::ReplayArgs;
use crate::controller::ScrollController;
use crate::frame_scheduler::ManualFrameSource;
use crate::input::{InputEvent, InputEventKind, ManualInputSource};
use crate::motion::Phase;
use crate::target::{Viewport, WriteOutcome};
use crate::utils::{from_millis_f64, to_millis_f64};

/// Upper bound on frames in one replay, in case the motion never settles.
const MAX_FRAMES: usize = 1_000_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Trace {
    #[serde(default)]
    pub frame_interval_ms: Option<f64>,
    /// Length of the scrolled list; unbounded when missing.
    #[serde(default)]
    pub extent: Option<f64>,
    pub events: Vec<TraceEvent>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceEvent {
    pub at_ms: f64,
    pub event: InputEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRecord {
    pub time_ms: f64,
    pub phase: Phase,
    pub velocity: f64,
    pub direction: i8,
    pub delta: f64,
    /// Offset after the frame, `None` when the write was skipped or the frame was idle.
    pub offset: Option<f64>,
    pub skipped: bool,
}

impl Trace {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = if path == Path::new("-") {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("error reading trace from stdin")?;
            text
        } else {
            fs::read_to_string(path).with_context(|| format!("error reading {path:?}"))?
        };

        Self::parse(&text)
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("error parsing trace")
    }

    fn input_events(&self) -> anyhow::Result<Vec<InputEvent>> {
        let mut last = 0.;
        let mut events = Vec::with_capacity(self.events.len());

        for (idx, event) in self.events.iter().enumerate() {
            ensure!(
                event.at_ms.is_finite() && event.at_ms >= 0.,
                "event {idx} has invalid time {}",
                event.at_ms
            );
            if event.at_ms < last {
                bail!(
                    "event {idx} at {} ms is earlier than the previous event at {last} ms",
                    event.at_ms
                );
            }
            last = event.at_ms;

            events.push(InputEvent {
                time: from_millis_f64(event.at_ms),
                kind: event.event,
            });
        }

        Ok(events)
    }
}

/// Replays `trace` and returns one record per frame in which the controller ran.
pub fn replay(
    trace: &Trace,
    config: &Config,
    frame_interval: Duration,
) -> anyhow::Result<Vec<FrameRecord>> {
    let _span = tracy_client::span!("replay");

    ensure!(!frame_interval.is_zero(), "frame interval must be positive");
    let interval_ns = frame_interval.as_nanos();

    let events = trace.input_events()?;
    debug!(
        "replaying {} events at {frame_interval:?} per frame",
        events.len()
    );

    let frames = ManualFrameSource::new(frame_interval);
    let input = ManualInputSource::default();
    let viewport = Rc::new(RefCell::new(Viewport::new(trace.extent)));

    let controller = ScrollController::new(config, Rc::new(frames.clone()));
    controller.attach(&viewport, Rc::new(input.clone()));

    let records = Rc::new(RefCell::new(Vec::new()));
    let records_clone = records.clone();
    controller.set_frame_observer(Some(Box::new(move |now, report| {
        let (offset, skipped) = match &report.write {
            Some(WriteOutcome::Written { offset }) => (Some(*offset), false),
            Some(WriteOutcome::Skipped(_)) => (None, true),
            None => (None, false),
        };

        records_clone.borrow_mut().push(FrameRecord {
            time_ms: to_millis_f64(now),
            phase: report.phase,
            velocity: report.velocity,
            direction: report
                .direction
                .map_or(0, |direction| direction.signum() as i8),
            delta: report.delta,
            offset,
            skipped,
        });
    })));

    let mut events = events.into_iter().peekable();
    let mut frame_time = Duration::ZERO;
    let mut frame_count = 0;

    loop {
        while let Some(event) = events.next_if(|event| event.time <= frame_time) {
            input.dispatch(event);
        }

        frames.run_frame(frame_time);

        frame_count += 1;
        ensure!(
            frame_count <= MAX_FRAMES,
            "motion did not settle within {MAX_FRAMES} frames"
        );

        if controller.is_scheduled() {
            frame_time += frame_interval;
            continue;
        }

        // Nothing is moving: skip ahead to the first frame at or after the next event.
        let Some(next) = events.peek() else {
            break;
        };
        let frame_idx = next.time.as_nanos().div_ceil(interval_ns);
        frame_time = Duration::from_nanos(
            u64::try_from(frame_idx * interval_ns).context("trace is too long")?,
        );
    }

    controller.detach();

    let records = records.take();
    Ok(records)
}

pub fn format_record(record: &FrameRecord) -> String {
    let phase = match record.phase {
        Phase::Idle => "idle",
        Phase::Accelerating => "accelerating",
        Phase::Decelerating => "decelerating",
    };

    let offset = match (record.offset, record.skipped) {
        (Some(offset), _) => format!("{offset:.3}"),
        (None, true) => String::from("skipped"),
        (None, false) => String::from("-"),
    };

    format!(
        "{:>9.1}ms {phase:<12} velocity {:>7.3} direction {:>2} offset {offset}",
        record.time_ms, record.velocity, record.direction,
    )
}

pub fn run(args: &ReplayArgs, config: &Config) -> anyhow::Result<()> {
    let trace = Trace::load(&args.trace)?;

    let frame_interval = match args.frame_interval_ms.or(trace.frame_interval_ms) {
        Some(ms) => {
            ensure!(
                ms.is_finite() && ms > 0.,
                "frame interval must be positive, got {ms}"
            );
            from_millis_f64(ms)
        }
        None => config.frames.refresh_interval(),
    };

    let records = replay(&trace, config, frame_interval)?;

    let mut stdout = io::stdout().lock();
    if args.json {
        let json = serde_json::to_string(&records).context("error formatting frames")?;
        writeln!(stdout, "{json}")?;
    } else {
        for record in &records {
            writeln!(stdout, "{}", format_record(record))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use insta::assert_debug_snapshot;
    use tickglide_config::{FloatOrInt, Motion};

    use super::*;

    const FRAME: Duration = Duration::from_millis(16);

    fn short_config() -> Config {
        Config {
            motion: Motion {
                tick_timeout_ms: 10,
                velocity_threshold: FloatOrInt(1.5),
                ..Motion::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn parses_all_event_kinds() {
        let trace = Trace::parse(
            r#"{
                "frame_interval_ms": 8,
                "extent": 100,
                "events": [
                    { "at_ms": 0, "event": { "device_tick": "scroll_up" } },
                    { "at_ms": 5, "event": { "device_tick": "scroll_down" } },
                    { "at_ms": 10.5, "event": { "wheel": { "delta_y": -120 } } },
                    { "at_ms": 20, "event": { "key": "next" } },
                    { "at_ms": 20, "event": { "key": "other" } }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(trace.frame_interval_ms, Some(8.));
        assert_eq!(trace.extent, Some(100.));
        assert_eq!(trace.events.len(), 5);
        assert_eq!(
            trace.events[2].event,
            InputEventKind::Wheel { delta_y: -120. }
        );
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(Trace::parse(r#"{ "events": [], "speed": 3 }"#).is_err());
    }

    #[test]
    fn rejects_out_of_order_events() {
        let trace = Trace::parse(
            r#"{ "events": [
                { "at_ms": 50, "event": { "key": "next" } },
                { "at_ms": 10, "event": { "key": "next" } }
            ] }"#,
        )
        .unwrap();
        assert!(replay(&trace, &Config::default(), FRAME).is_err());
    }

    #[test]
    fn rejects_zero_interval() {
        let trace = Trace::parse(r#"{ "events": [] }"#).unwrap();
        assert!(replay(&trace, &Config::default(), Duration::ZERO).is_err());
    }

    #[test]
    fn empty_trace_has_no_frames() {
        let trace = Trace::parse(r#"{ "events": [] }"#).unwrap();
        let records = replay(&trace, &Config::default(), FRAME).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn single_tick() {
        let trace = Trace::parse(
            r#"{ "events": [ { "at_ms": 0, "event": { "device_tick": "scroll_up" } } ] }"#,
        )
        .unwrap();
        let records = replay(&trace, &short_config(), FRAME).unwrap();

        assert_debug_snapshot!(records[0], @r"
        FrameRecord {
            time_ms: 0.0,
            phase: Accelerating,
            velocity: 2.0,
            direction: 1,
            delta: 2.0,
            offset: Some(
                2.0,
            ),
            skipped: false,
        }
        ");

        let phases: Vec<_> = records.iter().map(|r| r.phase).collect();
        assert_eq!(
            phases,
            [
                Phase::Accelerating,
                Phase::Decelerating,
                Phase::Decelerating,
                Phase::Decelerating,
                Phase::Decelerating,
                Phase::Idle,
            ]
        );

        let times: Vec<_> = records.iter().map(|r| r.time_ms).collect();
        assert_eq!(times, [0., 16., 32., 48., 64., 80.]);

        let last_offset = records[4].offset.unwrap();
        assert_abs_diff_eq!(
            last_offset,
            2. + 1.84 + 1.6928 + 1.557376 + 1.43278592,
            epsilon = 1e-9
        );
        assert_eq!(records[5].offset, None);
    }

    #[test]
    fn idle_gaps_are_skipped() {
        let trace = Trace::parse(
            r#"{ "events": [
                { "at_ms": 0, "event": { "key": "next" } },
                { "at_ms": 10000, "event": { "key": "previous" } }
            ] }"#,
        )
        .unwrap();
        let records = replay(&trace, &short_config(), FRAME).unwrap();

        // Two runs of motion, nothing recorded in between.
        assert_eq!(records.len(), 12);
        assert_eq!(records[6].time_ms, 10000.);
        assert_eq!(records[6].direction, -1);
        assert_abs_diff_eq!(records[6].delta, -2.);
    }

    #[test]
    fn extent_clamps_offset() {
        let trace = Trace::parse(
            r#"{ "extent": 3, "events": [ { "at_ms": 0, "event": { "key": "next" } } ] }"#,
        )
        .unwrap();
        let records = replay(&trace, &short_config(), FRAME).unwrap();
        let max = records
            .iter()
            .filter_map(|r| r.offset)
            .fold(0., f64::max);
        assert_eq!(max, 3.);
    }

    #[test]
    fn format() {
        let record = FrameRecord {
            time_ms: 16.,
            phase: Phase::Decelerating,
            velocity: 1.84,
            direction: -1,
            delta: -1.84,
            offset: Some(-3.84),
            skipped: false,
        };
        assert_eq!(
            format_record(&record),
            "     16.0ms decelerating velocity   1.840 direction -1 offset -3.840"
        );

        let record = FrameRecord {
            offset: None,
            skipped: true,
            ..record
        };
        assert!(format_record(&record).ends_with("offset skipped"));
    }
}
