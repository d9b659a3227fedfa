use serde::{Deserialize, Serialize};

use rollshot_core::events::Topical;
use rollshot_core::math::Vec3;

use crate::monitor::CollisionSignal;
use crate::params::{GuideLength, ShotParams, ShotType};

/// Topics external collaborators (rendering, UI meters, camera) subscribe
/// to. Consumers only observe; they never mutate core state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyTopic {
    ShotType,
    Aim,
    Guide,
    Power,
    Spin,
    PreviewHidden,
    ShotExecuted,
    ShotCanceled,
    BallBounced,
    BallStopped,
    SuperShot,
    BoostApplied,
    OutOfBounds,
    Recovered,
    CourseComplete,
}

/// Notification payloads published by the shot core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ShotNotification {
    ShotTypeChanged { shot_type: ShotType },
    AimChanged { angle: f32 },
    GuideChanged { guide: GuideLength },
    PowerChanged { power: f32 },
    SpinChanged { spin: Vec3 },
    PreviewHidden,
    ShotExecuted { params: ShotParams },
    ShotCanceled,
    /// A boost-candidate bounce was detected (heuristic; see the monitor).
    BallBounced { signal: CollisionSignal },
    BallStopped { position: Vec3 },
    SuperShotTriggered { params: ShotParams },
    BoostApplied { multiplier: f32 },
    OutOfBoundsEntered { position: Vec3 },
    OutOfBoundsRecovered { position: Vec3 },
    CourseCompleted,
}

impl Topical for ShotNotification {
    type Topic = NotifyTopic;

    fn topic(&self) -> NotifyTopic {
        match self {
            Self::ShotTypeChanged { .. } => NotifyTopic::ShotType,
            Self::AimChanged { .. } => NotifyTopic::Aim,
            Self::GuideChanged { .. } => NotifyTopic::Guide,
            Self::PowerChanged { .. } => NotifyTopic::Power,
            Self::SpinChanged { .. } => NotifyTopic::Spin,
            Self::PreviewHidden => NotifyTopic::PreviewHidden,
            Self::ShotExecuted { .. } => NotifyTopic::ShotExecuted,
            Self::ShotCanceled => NotifyTopic::ShotCanceled,
            Self::BallBounced { .. } => NotifyTopic::BallBounced,
            Self::BallStopped { .. } => NotifyTopic::BallStopped,
            Self::SuperShotTriggered { .. } => NotifyTopic::SuperShot,
            Self::BoostApplied { .. } => NotifyTopic::BoostApplied,
            Self::OutOfBoundsEntered { .. } => NotifyTopic::OutOfBounds,
            Self::OutOfBoundsRecovered { .. } => NotifyTopic::Recovered,
            Self::CourseCompleted => NotifyTopic::CourseComplete,
        }
    }
}
