use std::time::Duration;

use crate::FloatOrInt;

#[derive(knuffel::Decode, Debug, Clone, Copy, PartialEq)]
pub struct Frames {
    /// Display refresh rate in Hz, used when no real vblank source paces the frames.
    #[knuffel(child, unwrap(argument), default = Frames::default().refresh_rate)]
    pub refresh_rate: FloatOrInt<1, 1000>,
}

impl Default for Frames {
    fn default() -> Self {
        Self {
            refresh_rate: FloatOrInt(60.),
        }
    }
}

impl Frames {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_nanos((1e9 / self.refresh_rate.0.max(1.)).round() as u64)
    }
}
