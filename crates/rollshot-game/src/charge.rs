use rollshot_core::math::Vec3;

use crate::config::ShotConfig;
use crate::params::ShotParamStore;

/// Triangle wave over one full 0→1→0 cycle of `period` seconds.
///
/// The peak lands exactly at half-period and evaluates to exactly 1.0, so a
/// sample taken at that instant freezes at 1.0 rather than a rounded-down
/// neighbor.
pub fn triangle_wave(t: f32, period: f32) -> f32 {
    if !(t.is_finite() && period.is_finite() && period > 0.0) {
        return 0.0;
    }
    let x = (t / period).fract();
    if x < 0.5 { 2.0 * x } else { 2.0 - 2.0 * x }
}

/// Charging-phase controller: an oscillating power meter plus spin
/// accumulation. Confirming samples the wave at the exact elapsed instant.
pub struct ChargeController {
    period: f32,
    spin_step: f32,
    spin_max: f32,
    elapsed: f32,
}

impl ChargeController {
    pub fn new(config: &ShotConfig) -> Self {
        Self {
            period: config.power_wave_period,
            spin_step: config.spin_step,
            spin_max: config.spin_max,
            elapsed: 0.0,
        }
    }

    /// Reset the meter at CHARGING entry.
    pub fn begin(&mut self) {
        self.elapsed = 0.0;
    }

    /// Advance the meter by one tick while CHARGING.
    pub fn tick(&mut self, dt: f32) {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }
    }

    /// Instantaneous power value in 0..=1.
    pub fn power(&self) -> f32 {
        triangle_wave(self.elapsed, self.period)
    }

    /// Sample the meter; the frozen value is exactly the instantaneous one.
    pub fn sample(&self) -> f32 {
        self.power()
    }

    /// Accumulate a directional spin delta into the store's draft, clamped
    /// to the configured magnitude. `x` is sidespin, `z` top/backspin.
    pub fn add_spin(&self, store: &mut ShotParamStore, x: f32, z: f32) {
        if !(x.is_finite() && z.is_finite()) {
            tracing::debug!("non-finite spin delta ignored");
            return;
        }
        let delta = Vec3::new(x, 0.0, z) * self.spin_step;
        let spin = (store.draft_spin() + delta).clamp_length(self.spin_max);
        store.set_draft_spin(spin);
    }
}
