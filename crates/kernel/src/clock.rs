use std::time::Instant;

/// Source of per-frame elapsed time.
pub trait Clock {
    /// Seconds since the previous call. Monotonic and non-negative; the
    /// first call returns zero.
    fn elapsed_since_last(&mut self) -> f32;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Default)]
pub struct SystemClock {
    last: Option<Instant>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn elapsed_since_last(&mut self) -> f32 {
        let now = Instant::now();
        let dt = self
            .last
            .map(|last| now.duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last = Some(now);
        dt
    }
}

/// Clock that reports the same step every frame. Deterministic runs and
/// tests use it.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    step: f32,
}

impl FixedClock {
    pub fn new(step: f32) -> Self {
        Self {
            step: step.max(0.0),
        }
    }
}

impl Clock for FixedClock {
    fn elapsed_since_last(&mut self) -> f32 {
        self.step
    }
}
