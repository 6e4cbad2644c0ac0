//! Frame timing.
//!
//! - one [`FrameClock`] per render loop, ticked once per presented frame
//! - a [`FixedTimestep`] when simulation runs at a fixed rate and rendering
//!   interpolates between updates

mod fixed_step;
mod frame_clock;

pub use fixed_step::{FixedSteps, FixedTimestep};
pub use frame_clock::{FrameClock, FrameTime};
