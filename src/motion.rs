//! Momentum integrator.
//!
//! Once per frame the integrator looks at the tick buffer. While ticks keep arriving it moves at
//! a velocity that grows with every new tick, once they stop it coasts down geometrically, and
//! when the coast has run out it goes idle and asks not to be scheduled again.

use std::time::Duration;

use serde::Serialize;

use crate::input::{Direction, Tick, TickBuffer};
use crate::target::{ScrollTargetAdapter, WriteOutcome};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    pub base_velocity: f64,
    pub max_velocity: f64,
    pub acceleration: f64,
    pub deceleration: f64,
    pub velocity_threshold: f64,
    pub tick_timeout: Duration,
    pub window: Duration,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self::from(&tickglide_config::Motion::default())
    }
}

impl From<&tickglide_config::Motion> for MotionParams {
    fn from(config: &tickglide_config::Motion) -> Self {
        Self {
            base_velocity: config.base_velocity.0,
            max_velocity: config.max_velocity.0,
            acceleration: config.acceleration.0,
            deceleration: config.deceleration.0,
            velocity_threshold: config.velocity_threshold.0,
            tick_timeout: config.tick_timeout(),
            window: config.window(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Accelerating,
    Decelerating,
}

/// What a single frame step did.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub phase: Phase,
    pub velocity: f64,
    pub direction: Option<Direction>,
    /// Signed offset change requested this frame.
    pub delta: f64,
    /// `None` on the idle step, which doesn't touch the target.
    pub write: Option<WriteOutcome>,
}

impl StepReport {
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }
}

/// Motion bookkeeping for one attached scroll target.
#[derive(Debug)]
pub struct MotionState {
    params: MotionParams,
    ticks: TickBuffer,
    /// Always within `0..=max_velocity`.
    velocity: f64,
    /// `None` only when fully stopped.
    direction: Option<Direction>,
    phase: Phase,
}

impl MotionState {
    pub fn new(params: MotionParams) -> Self {
        Self {
            ticks: TickBuffer::new(params.window, params.tick_timeout),
            params,
            velocity: 0.,
            direction: None,
            phase: Phase::Idle,
        }
    }

    pub fn record_tick(&mut self, tick: Tick) -> bool {
        self.ticks.record(tick)
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// Direction as a sign: -1, 0 or 1.
    pub fn direction_sign(&self) -> i8 {
        match self.direction {
            Some(Direction::Backward) => -1,
            Some(Direction::Forward) => 1,
            None => 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn ticks(&self) -> &TickBuffer {
        &self.ticks
    }

    /// Advances the motion by one frame at time `now` and moves the target accordingly.
    ///
    /// An unavailable target only skips the write; velocity and direction evolve regardless.
    pub fn step(&mut self, now: Duration, target: &mut ScrollTargetAdapter) -> StepReport {
        let params = self.params;
        let prev_phase = self.phase;

        if self.ticks.is_active(now) {
            // Velocity grows per tick, not per frame: frames between ticks hold it.
            let new_ticks = self.ticks.take_unconsumed() as f64;
            self.velocity = if prev_phase == Phase::Idle {
                // The first tick from rest only sets the floor.
                params.base_velocity + params.acceleration * (new_ticks - 1.).max(0.)
            } else {
                self.velocity + params.acceleration * new_ticks
            };
            self.velocity = self.velocity.clamp(0., params.max_velocity);
            // Reversals take effect at once and keep the current speed.
            self.direction = self.ticks.last_direction();
            self.phase = Phase::Accelerating;
        } else if self.velocity > params.velocity_threshold {
            // Ticks that expired before any frame saw them don't accelerate later.
            self.ticks.take_unconsumed();
            self.velocity *= params.deceleration;
            self.phase = Phase::Decelerating;
        } else {
            self.stop();

            if prev_phase != Phase::Idle {
                trace!("motion stopped at {now:?}");
            }

            return StepReport {
                phase: Phase::Idle,
                velocity: 0.,
                direction: None,
                delta: 0.,
                write: None,
            };
        }

        if prev_phase != self.phase {
            trace!(
                "motion {:?} -> {:?} at {now:?}, velocity {:.3}",
                prev_phase,
                self.phase,
                self.velocity
            );
        }

        let delta = self.direction.map_or(0., Direction::signum) * self.velocity;
        let write = target.apply_delta(delta);

        StepReport {
            phase: self.phase,
            velocity: self.velocity,
            direction: self.direction,
            delta,
            write: Some(write),
        }
    }

    fn stop(&mut self) {
        self.velocity = 0.;
        self.direction = None;
        self.phase = Phase::Idle;
        self.ticks.clear();
    }
}
