/// Fixed-step simulation clock.
///
/// `advance` accumulates wall delta time and reports how many whole fixed
/// steps are owed; the caller runs its per-tick pipeline that many times,
/// calling `tick` once per step to move `now` forward. All deferred-event
/// scheduling keys off `now`, never off wall-clock time.
pub struct SimClock {
    step: f32,
    accumulator: f32,
    elapsed: f64,
    /// Cap on owed time so one long hitch cannot spiral the loop.
    max_backlog: f32,
}

impl SimClock {
    pub fn new(step: f32) -> Self {
        let step = if step.is_finite() && step > 0.0 {
            step
        } else {
            1.0 / 60.0
        };
        Self {
            step,
            accumulator: 0.0,
            elapsed: 0.0,
            max_backlog: step * 8.0,
        }
    }

    /// Fixed step duration in seconds.
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Elapsed simulation time in seconds.
    pub fn now(&self) -> f64 {
        self.elapsed
    }

    /// Add `dt` of real time; returns the number of fixed steps now owed.
    /// Non-finite or negative dt counts as zero.
    pub fn advance(&mut self, dt: f32) -> u32 {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        self.accumulator = (self.accumulator + dt).min(self.max_backlog);
        let steps = (self.accumulator / self.step).floor() as u32;
        self.accumulator -= steps as f32 * self.step;
        steps
    }

    /// Consume one owed step, advancing simulation time.
    pub fn tick(&mut self) {
        self.elapsed += f64::from(self.step);
    }
}
