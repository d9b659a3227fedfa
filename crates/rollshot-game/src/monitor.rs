use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rollshot_core::math::Vec3;

use crate::ball::BallEntity;
use crate::config::ShotConfig;
use crate::phase::ShotPhase;
use crate::physics::ContactEvent;

/// Synthetic collision report for a boost candidate.
///
/// Produced from a velocity-spike heuristic, not from a true contact
/// manifold, so the normal falls back to straight up whenever the physics
/// layer reported no contact this tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollisionSignal {
    pub id: Uuid,
    pub position: Vec3,
    pub normal: Vec3,
    pub relative_speed: f32,
    pub sim_time: f64,
}

/// What the monitor wants the state machine to do this tick.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorDirective {
    /// Sub-threshold speed and grounded: leave Rolling/BoostReady.
    Stopped,
    /// Qualifying speed spike while Rolling: open the boost window.
    BoostWindow(CollisionSignal),
    /// First crossing of the playable boundary.
    LeftBounds { position: Vec3 },
}

/// Per-tick bridge between the continuous simulation and the discrete
/// state machine: stop detection, boost-window detection, and
/// out-of-bounds detection.
pub struct CollisionMonitor {
    stop_speed: f32,
    boost_threshold: f32,
    bounds_min: Vec3,
    bounds_max: Vec3,
    prev_speed: f32,
    outside_latch: bool,
}

impl CollisionMonitor {
    pub fn new(config: &ShotConfig) -> Self {
        Self {
            stop_speed: config.stop_speed,
            boost_threshold: config.boost_speed_threshold,
            bounds_min: config.bounds_min,
            bounds_max: config.bounds_max,
            prev_speed: 0.0,
            outside_latch: false,
        }
    }

    fn inside_bounds(&self, p: Vec3) -> bool {
        p.x >= self.bounds_min.x
            && p.x <= self.bounds_max.x
            && p.y >= self.bounds_min.y
            && p.y <= self.bounds_max.y
            && p.z >= self.bounds_min.z
            && p.z <= self.bounds_max.z
    }

    /// Evaluate the ball against this tick's motion. Called after the
    /// physics step and ball refresh, before transition dispatch.
    pub fn evaluate(
        &mut self,
        phase: ShotPhase,
        ball: &BallEntity,
        contacts: &[ContactEvent],
        now: f64,
    ) -> Vec<MonitorDirective> {
        let mut directives = Vec::new();
        let state = ball.state();
        let speed = state.linear_velocity.length();

        // Boost window: an upward crossing of the threshold, only while
        // Rolling. The contact stream is best-effort, so when no contact
        // arrived this tick the signal carries the default upward normal.
        if phase == ShotPhase::Rolling
            && self.prev_speed <= self.boost_threshold
            && speed > self.boost_threshold
        {
            let normal = contacts
                .iter()
                .find(|c| c.handle == ball.handle())
                .map_or(Vec3::UP, |c| c.normal);
            directives.push(MonitorDirective::BoostWindow(CollisionSignal {
                id: Uuid::new_v4(),
                position: state.position,
                normal,
                relative_speed: speed,
                sim_time: now,
            }));
        }

        // Stop: speed alone is not enough; the grounded check keeps a slow
        // trajectory apex from reading as at-rest.
        if phase.is_in_flight() && !ball.is_moving(self.stop_speed) && ball.is_grounded() {
            directives.push(MonitorDirective::Stopped);
        }

        // Out of bounds: latched so the first crossing fires exactly once,
        // no matter how many ticks the ball spends outside.
        let watched = phase.is_in_flight() || phase == ShotPhase::Idle;
        if self.inside_bounds(state.position) {
            self.outside_latch = false;
        } else if watched && !self.outside_latch {
            self.outside_latch = true;
            directives.push(MonitorDirective::LeftBounds {
                position: state.position,
            });
        }

        self.prev_speed = speed;
        directives
    }
}
