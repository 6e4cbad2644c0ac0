use std::time::Duration;

/// Outcome of feeding one frame to a [`FixedTimestep`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FixedSteps {
    /// Fixed updates to run this frame.
    pub ticks: u32,
    /// Position between the last two updates, in `[0, 1)`, for render
    /// interpolation.
    pub alpha: f32,
}

/// Accumulator driving a fixed-rate update loop from variable frame times.
///
/// ```
/// # use std::time::Duration;
/// # use shogle_core::time::FixedTimestep;
/// let mut step = FixedTimestep::new(Duration::from_millis(10));
/// let steps = step.advance(Duration::from_millis(25));
/// assert_eq!(steps.ticks, 2);
/// assert!((steps.alpha - 0.5).abs() < 1e-3);
/// ```
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step: Duration,
    accumulator: Duration,
    max_ticks: u32,
}

impl FixedTimestep {
    /// # Panics
    /// Panics if `step` is zero.
    pub fn new(step: Duration) -> Self {
        assert!(!step.is_zero(), "fixed timestep must be non-zero");
        Self { step, accumulator: Duration::ZERO, max_ticks: 8 }
    }

    /// Steps per second.
    pub fn from_rate(hz: u32) -> Self {
        assert!(hz > 0, "fixed update rate must be non-zero");
        Self::new(Duration::from_secs(1) / hz)
    }

    /// Caps the updates run in one frame; time beyond the cap is dropped.
    pub fn with_max_ticks(mut self, max_ticks: u32) -> Self {
        self.max_ticks = max_ticks.max(1);
        self
    }

    #[inline]
    pub fn step(&self) -> Duration {
        self.step
    }

    #[inline]
    pub fn step_secs(&self) -> f32 {
        self.step.as_secs_f32()
    }

    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
    }

    pub fn advance(&mut self, dt: Duration) -> FixedSteps {
        self.accumulator += dt;

        let mut ticks = 0;
        while self.accumulator >= self.step {
            if ticks == self.max_ticks {
                log::trace!("fixed timestep fell behind; dropping {:?}", self.accumulator);
                self.accumulator = Duration::ZERO;
                break;
            }
            self.accumulator -= self.step;
            ticks += 1;
        }

        let alpha = self.accumulator.as_secs_f32() / self.step.as_secs_f32();
        FixedSteps { ticks, alpha }
    }

    /// [`advance`](Self::advance) for a [`FrameTime`](super::FrameTime) delta.
    #[inline]
    pub fn advance_secs(&mut self, dt: f32) -> FixedSteps {
        self.advance(Duration::from_secs_f32(dt.max(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_partial_steps() {
        let mut step = FixedTimestep::new(Duration::from_millis(10));
        assert_eq!(step.advance(Duration::from_millis(4)).ticks, 0);
        assert_eq!(step.advance(Duration::from_millis(4)).ticks, 0);
        let s = step.advance(Duration::from_millis(4));
        assert_eq!(s.ticks, 1);
        assert!((s.alpha - 0.2).abs() < 1e-3);
    }

    #[test]
    fn catch_up_is_capped() {
        let mut step = FixedTimestep::new(Duration::from_millis(10)).with_max_ticks(3);
        let s = step.advance(Duration::from_secs(1));
        assert_eq!(s.ticks, 3);
        assert_eq!(s.alpha, 0.0);
        assert_eq!(step.advance(Duration::from_millis(10)).ticks, 1);
    }

    #[test]
    fn rate_sets_step() {
        let step = FixedTimestep::from_rate(50);
        assert_eq!(step.step(), Duration::from_millis(20));
    }
}
