use std::time::Duration;

use miette::miette;

use crate::FloatOrInt;

/// Tunables of the momentum integrator.
///
/// Velocities are in offset units per frame. The defaults are tuned for a list of cards
/// scrolled by a notched wheel at 60 Hz.
#[derive(knuffel::Decode, Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    /// Velocity of the first frame after input starts from rest.
    #[knuffel(child, unwrap(argument), default = Motion::default().base_velocity)]
    pub base_velocity: FloatOrInt<0, 10000>,
    #[knuffel(child, unwrap(argument), default = Motion::default().max_velocity)]
    pub max_velocity: FloatOrInt<0, 10000>,
    /// Velocity gained with every tick after the first.
    #[knuffel(child, unwrap(argument), default = Motion::default().acceleration)]
    pub acceleration: FloatOrInt<0, 10000>,
    /// Multiplier applied to velocity on every frame once input stops.
    #[knuffel(child, unwrap(argument), default = Motion::default().deceleration)]
    pub deceleration: FloatOrInt<0, 1>,
    /// Velocity at or below which coasting stops.
    #[knuffel(child, unwrap(argument), default = Motion::default().velocity_threshold)]
    pub velocity_threshold: FloatOrInt<0, 10000>,
    #[knuffel(child, unwrap(argument), default = Motion::default().tick_timeout_ms)]
    pub tick_timeout_ms: u16,
    #[knuffel(child, unwrap(argument), default = Motion::default().window_ms)]
    pub window_ms: u16,
}

impl Default for Motion {
    fn default() -> Self {
        Self {
            base_velocity: FloatOrInt(2.),
            max_velocity: FloatOrInt(15.),
            acceleration: FloatOrInt(0.8),
            deceleration: FloatOrInt(0.92),
            velocity_threshold: FloatOrInt(0.1),
            tick_timeout_ms: 150,
            window_ms: 200,
        }
    }
}

impl Motion {
    pub fn tick_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.tick_timeout_ms))
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(u64::from(self.window_ms))
    }

    /// Checks the relations between values that the parser can't check one by one.
    pub fn validate(&self) -> miette::Result<()> {
        if self.max_velocity.0 <= 0. {
            return Err(miette!("max-velocity must be greater than 0"));
        }

        if self.base_velocity.0 <= 0. {
            return Err(miette!("base-velocity must be greater than 0"));
        }

        if self.base_velocity.0 > self.max_velocity.0 {
            return Err(miette!(
                "base-velocity ({}) must not exceed max-velocity ({})",
                self.base_velocity.0,
                self.max_velocity.0
            ));
        }

        if self.deceleration.0 <= 0. || self.deceleration.0 >= 1. {
            return Err(miette!(
                "deceleration must be strictly between 0 and 1, otherwise motion never stops"
            ));
        }

        if self.velocity_threshold.0 <= 0. {
            return Err(miette!("velocity-threshold must be greater than 0"));
        }

        if self.tick_timeout_ms == 0 || self.window_ms == 0 {
            return Err(miette!("tick-timeout-ms and window-ms must be greater than 0"));
        }

        Ok(())
    }
}
