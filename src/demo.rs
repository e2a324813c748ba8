//! Live demo on a real event loop.
//!
//! Synthetic wheel ticks are injected from calloop timers, frames come from
//! [`CalloopFrameSource`], and every frame is logged until the motion settles.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context as _;
use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, LoopSignal};
use tickglide_config::Config;

use crate::cli::DemoArgs;
use crate::controller::ScrollController;
use crate::frame_scheduler::CalloopFrameSource;
use crate::input::{InputEvent, InputEventKind, ManualInputSource, TickKind};
use crate::target::{Viewport, WriteOutcome};
use crate::utils::get_monotonic_time;

struct DemoState {
    input: ManualInputSource,
    controller: ScrollController,
    remaining_ticks: u32,
    signal: LoopSignal,
}

pub fn run(args: &DemoArgs, config: &Config) -> anyhow::Result<()> {
    let mut event_loop: EventLoop<'static, DemoState> =
        EventLoop::try_new().context("error creating event loop")?;
    let handle = event_loop.handle();

    let refresh_interval = config.frames.refresh_interval();
    let frames = CalloopFrameSource::new(handle.clone(), refresh_interval);

    let input = ManualInputSource::default();
    let viewport = Rc::new(RefCell::new(Viewport::new(Some(args.extent))));

    let controller = ScrollController::new(config, Rc::new(frames));
    controller.attach(&viewport, Rc::new(input.clone()));

    let start = get_monotonic_time();
    controller.set_frame_observer(Some(Box::new(move |now, report| {
        let offset = match &report.write {
            Some(WriteOutcome::Written { offset }) => format!("{offset:.2}"),
            Some(WriteOutcome::Skipped(err)) => format!("skipped ({err})"),
            None => String::from("-"),
        };
        info!(
            "{:>8.1}ms {:?} velocity {:.3} offset {offset}",
            now.saturating_sub(start).as_secs_f64() * 1000.,
            report.phase,
            report.velocity,
        );
    })));

    for i in 0..args.ticks {
        let kind = match args.reverse_after {
            Some(n) if i >= n => TickKind::ScrollDown,
            _ => TickKind::ScrollUp,
        };

        let delay = Duration::from_millis(args.spacing_ms.saturating_mul(u64::from(i)));
        handle
            .insert_source(Timer::from_duration(delay), move |_, _, state| {
                state.input.dispatch(InputEvent {
                    time: get_monotonic_time(),
                    kind: InputEventKind::DeviceTick(kind),
                });
                state.remaining_ticks = state.remaining_ticks.saturating_sub(1);
                TimeoutAction::Drop
            })
            .map_err(|err| err.error)
            .context("error inserting tick timer")?;
    }

    debug!(
        "sending {} ticks every {} ms, refresh interval {refresh_interval:?}",
        args.ticks, args.spacing_ms
    );

    let mut state = DemoState {
        input,
        controller: controller.clone(),
        remaining_ticks: args.ticks,
        signal: event_loop.get_signal(),
    };

    event_loop
        .run(refresh_interval, &mut state, |state| {
            if state.remaining_ticks == 0 && !state.controller.is_scheduled() {
                state.signal.stop();
            }
        })
        .context("error running event loop")?;

    controller.detach();
    info!("settled at offset {:.2}", viewport.borrow().offset());

    Ok(())
}
