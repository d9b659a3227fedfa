use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use rollshot_core::math::Vec3;

use crate::config::ShotConfig;

/// Closed set of shot variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShotType {
    #[default]
    Normal,
    Power,
    Curve,
}

impl ShotType {
    const ALL: [Self; 3] = [Self::Normal, Self::Power, Self::Curve];

    /// Next variant in the closed cycle.
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|&t| t == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    /// Validate an external identifier once at the boundary. Unknown names
    /// fall back to the neutral default with a warning.
    pub fn from_name(name: &str) -> Self {
        match name {
            "normal" => Self::Normal,
            "power" => Self::Power,
            "curve" => Self::Curve,
            other => {
                tracing::warn!("unknown shot type {other:?}, defaulting to normal");
                Self::Normal
            },
        }
    }
}

/// Discrete trajectory-preview length category. Scales how far the
/// externally rendered preview extends; never alters physics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuideLength {
    #[default]
    Short,
    Long,
}

impl GuideLength {
    pub fn next(self) -> Self {
        match self {
            Self::Short => Self::Long,
            Self::Long => Self::Short,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "short" => Self::Short,
            "long" => Self::Long,
            other => {
                tracing::warn!("unknown guide length {other:?}, defaulting to short");
                Self::Short
            },
        }
    }
}

/// Wrap an angle into [0, 2π).
pub fn normalize_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can yield exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Immutable record of an executed shot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShotParams {
    pub shot_type: ShotType,
    pub aim_angle: f32,
    pub guide: GuideLength,
    pub power: f32,
    pub spin: Vec3,
    pub is_super_shot: bool,
}

/// The single mutable record of an in-progress shot.
///
/// Values are committed stage by stage as the machine advances, so a later
/// phase can no longer corrupt an already-confirmed earlier value: the
/// working draft feeds each commit, and `freeze` assembles the immutable
/// [`ShotParams`] from the committed values only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShotParamStore {
    draft_type: ShotType,
    draft_angle: f32,
    draft_guide: GuideLength,
    draft_spin: Vec3,
    committed_type: Option<ShotType>,
    committed_angle: Option<f32>,
    committed_guide: Option<GuideLength>,
    frozen: Option<ShotParams>,
}

impl Default for ShotParamStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ShotParamStore {
    pub fn new() -> Self {
        Self {
            draft_type: ShotType::default(),
            draft_angle: 0.0,
            draft_guide: GuideLength::default(),
            draft_spin: Vec3::ZERO,
            committed_type: None,
            committed_angle: None,
            committed_guide: None,
            frozen: None,
        }
    }

    /// Restore defaults (cancel path, or a fresh shot).
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Whether `freeze` has produced the execution record.
    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    pub fn frozen(&self) -> Option<&ShotParams> {
        self.frozen.as_ref()
    }

    // --- working draft, mutated only by the current phase's controller ---

    pub fn draft_type(&self) -> ShotType {
        self.draft_type
    }

    pub fn set_draft_type(&mut self, shot_type: ShotType) {
        if self.frozen.is_none() {
            self.draft_type = shot_type;
        }
    }

    pub fn draft_angle(&self) -> f32 {
        self.draft_angle
    }

    pub fn set_draft_angle(&mut self, angle: f32) {
        if self.frozen.is_none() {
            self.draft_angle = normalize_angle(angle);
        }
    }

    pub fn draft_guide(&self) -> GuideLength {
        self.draft_guide
    }

    pub fn set_draft_guide(&mut self, guide: GuideLength) {
        if self.frozen.is_none() {
            self.draft_guide = guide;
        }
    }

    pub fn draft_spin(&self) -> Vec3 {
        self.draft_spin
    }

    pub fn set_draft_spin(&mut self, spin: Vec3) {
        if self.frozen.is_none() {
            self.draft_spin = spin;
        }
    }

    // --- per-phase commits ---

    pub fn commit_type(&mut self) {
        self.committed_type = Some(self.draft_type);
    }

    pub fn commit_angle(&mut self) {
        self.committed_angle = Some(normalize_angle(self.draft_angle));
    }

    pub fn commit_guide(&mut self) {
        self.committed_guide = Some(self.draft_guide);
    }

    /// Un-commit when `go_back` re-enters the stage.
    pub fn revoke_type(&mut self) {
        self.committed_type = None;
    }

    pub fn revoke_angle(&mut self) {
        self.committed_angle = None;
    }

    pub fn revoke_guide(&mut self) {
        self.committed_guide = None;
    }

    pub fn committed_angle(&self) -> Option<f32> {
        self.committed_angle
    }

    /// Build the immutable execution record from the committed stages plus
    /// the power sampled at the exact confirmation instant. The store is
    /// read-only afterwards until `reset` or `unfreeze`.
    pub fn freeze(&mut self, sampled_power: f32, config: &ShotConfig) -> ShotParams {
        let power = sampled_power.clamp(0.0, 1.0);
        let spin = self.draft_spin.clamp_length(config.spin_max);
        let params = ShotParams {
            shot_type: self.committed_type.unwrap_or(self.draft_type),
            aim_angle: self.committed_angle.unwrap_or(self.draft_angle),
            guide: self.committed_guide.unwrap_or(self.draft_guide),
            power,
            spin,
            is_super_shot: power >= config.super_power_threshold
                && spin.length() <= config.super_spin_max,
        };
        self.frozen = Some(params.clone());
        params
    }

    /// Roll back a freeze whose execution failed, so the player can retry.
    pub fn unfreeze(&mut self) {
        self.frozen = None;
    }
}
