#[macro_use]
extern crate tracing;

pub mod cli;
pub mod controller;
pub mod demo;
pub mod frame_clock;
pub mod frame_scheduler;
pub mod input;
pub mod motion;
pub mod replay;
pub mod target;
pub mod utils;

pub use controller::{MotionSnapshot, ScrollController};
