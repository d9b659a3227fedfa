use crate::config::ShotConfig;
use crate::params::ShotParamStore;

/// Aiming-phase controller: maintains the aim direction as an angle in
/// [0, 2π), fed by discrete keyboard nudges or continuous pointer drags.
pub struct AimController {
    step: f32,
    drag_sensitivity: f32,
}

impl AimController {
    pub fn new(config: &ShotConfig) -> Self {
        Self {
            step: config.aim_step,
            drag_sensitivity: config.aim_drag_sensitivity,
        }
    }

    /// Discrete nudge: `steps` whole increments, signed.
    pub fn nudge(&self, store: &mut ShotParamStore, steps: i32) {
        let angle = store.draft_angle() + self.step * steps as f32;
        store.set_draft_angle(angle);
    }

    /// Continuous drag delta (e.g. pointer pixels), scaled by sensitivity.
    /// Non-finite input is dropped for the frame.
    pub fn drag(&self, store: &mut ShotParamStore, delta: f32) {
        if !delta.is_finite() {
            tracing::debug!("non-finite aim drag ignored");
            return;
        }
        let angle = store.draft_angle() + delta * self.drag_sensitivity;
        store.set_draft_angle(angle);
    }
}
