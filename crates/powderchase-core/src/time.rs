/// Default fixed simulation step (60 Hz).
pub const DEFAULT_STEP: f32 = 1.0 / 60.0;

/// Longest frame the clock will account for. Anything longer (tab switch,
/// debugger pause) is treated as this much time.
pub const MAX_FRAME_TIME: f32 = 0.25;

/// Clamp a raw frame delta from the host into a sane positive bound.
/// Negative, NaN and infinite values become zero.
pub fn clamp_dt(raw: f32) -> f32 {
    if raw.is_finite() && raw > 0.0 {
        raw.min(MAX_FRAME_TIME)
    } else {
        0.0
    }
}

/// Driver-side fixed-step accumulator. The simulation core assumes its `dt` is
/// already small and bounded; this is where that guarantee is made.
#[derive(Debug, Clone)]
pub struct FixedStepClock {
    step: f32,
    max_substeps: u32,
    accumulator: f32,
}

impl FixedStepClock {
    pub fn new(step: f32, max_substeps: u32) -> Self {
        Self {
            step: if step.is_finite() && step > 0.0 {
                step
            } else {
                DEFAULT_STEP
            },
            max_substeps: max_substeps.max(1),
            accumulator: 0.0,
        }
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Feed a raw frame delta; returns how many fixed steps to run this frame.
    /// Backlog beyond `max_substeps` is dropped rather than carried forward.
    pub fn advance(&mut self, raw_frame_dt: f32) -> u32 {
        self.accumulator += clamp_dt(raw_frame_dt);
        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_substeps {
            self.accumulator -= self.step;
            steps += 1;
        }
        if steps == self.max_substeps {
            self.accumulator = self.accumulator.min(self.step);
        }
        steps
    }
}

impl Default for FixedStepClock {
    fn default() -> Self {
        Self::new(DEFAULT_STEP, 8)
    }
}
