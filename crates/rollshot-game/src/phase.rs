use serde::{Deserialize, Serialize};

/// One step of the discrete shot lifecycle. Exactly one phase is active at
/// a time; the out-of-bounds and recovery phases overlay the shot sequence
/// and `CourseComplete` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShotPhase {
    Idle,
    SelectingType,
    Aiming,
    GuideSelect,
    Charging,
    Rolling,
    BoostReady,
    OutOfBounds,
    Recovery,
    CourseComplete,
}

impl ShotPhase {
    /// Fixed predecessor map for `go_back`. Undefined (None) everywhere the
    /// shot is no longer being set up.
    pub fn predecessor(self) -> Option<Self> {
        match self {
            Self::Aiming => Some(Self::SelectingType),
            Self::GuideSelect => Some(Self::Aiming),
            Self::Charging => Some(Self::GuideSelect),
            _ => None,
        }
    }

    /// Phases before the impulse has been applied. Cancellation is
    /// loss-free exactly here because no physics mutation has happened.
    pub fn is_pre_execution(self) -> bool {
        matches!(
            self,
            Self::SelectingType | Self::Aiming | Self::GuideSelect | Self::Charging
        )
    }

    /// Phases during which the shot parameters may be mutated.
    pub fn params_mutable(self) -> bool {
        self.is_pre_execution()
    }

    /// Phases in which the ball is in play after execution.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Rolling | Self::BoostReady)
    }
}
