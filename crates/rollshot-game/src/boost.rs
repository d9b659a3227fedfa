use crate::ball::BallEntity;
use crate::physics::{PhysicsError, PhysicsWorld};

/// Boost-phase controller: a one-time velocity multiplier granted while the
/// boost window is open. Once consumed it cannot re-trigger within the same
/// shot; `begin_shot` re-arms it for the next shot.
pub struct BoostController {
    multiplier: f32,
    consumed: bool,
}

impl BoostController {
    pub fn new(multiplier: f32) -> Self {
        Self {
            multiplier: multiplier.max(1.0),
            consumed: false,
        }
    }

    /// Re-arm at shot execution.
    pub fn begin_shot(&mut self) {
        self.consumed = false;
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Apply the multiplier if still armed. Returns whether it fired.
    pub fn apply(
        &mut self,
        world: &mut PhysicsWorld,
        ball: &mut BallEntity,
    ) -> Result<bool, PhysicsError> {
        if self.consumed {
            return Ok(false);
        }
        ball.scale_velocity(world, self.multiplier)?;
        self.consumed = true;
        Ok(true)
    }

    /// Mark the window spent without boosting (expiry, or entry into
    /// BoostReady already counts as the shot's single opportunity).
    pub fn consume_window(&mut self) {
        self.consumed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShotConfig;
    use rollshot_core::math::Vec3;

    fn setup() -> (PhysicsWorld, BallEntity) {
        let config = ShotConfig::default();
        let mut world = PhysicsWorld::new(&config);
        let ball = BallEntity::spawn(&mut world, &config, Vec3::new(0.0, 0.3, 0.0));
        (world, ball)
    }

    #[test]
    fn boost_multiplies_velocity_once() {
        let (mut world, mut ball) = setup();
        ball.apply_impulse(&mut world, Vec3::new(1.0, 0.0, 0.0), 2.0)
            .unwrap();
        let before = ball.state().linear_velocity.x;

        let mut boost = BoostController::new(1.5);
        assert!(boost.apply(&mut world, &mut ball).unwrap());
        assert!((ball.state().linear_velocity.x - before * 1.5).abs() < 1e-5);

        // Second apply within the same shot is inert.
        assert!(!boost.apply(&mut world, &mut ball).unwrap());
        assert!((ball.state().linear_velocity.x - before * 1.5).abs() < 1e-5);
    }

    #[test]
    fn begin_shot_rearms() {
        let (mut world, mut ball) = setup();
        ball.apply_impulse(&mut world, Vec3::new(1.0, 0.0, 0.0), 2.0)
            .unwrap();
        let mut boost = BoostController::new(1.5);
        boost.apply(&mut world, &mut ball).unwrap();
        assert!(boost.is_consumed());
        boost.begin_shot();
        assert!(!boost.is_consumed());
    }

    #[test]
    fn expired_window_counts_as_consumed() {
        let mut boost = BoostController::new(1.5);
        boost.consume_window();
        let (mut world, mut ball) = setup();
        assert!(!boost.apply(&mut world, &mut ball).unwrap());
    }

    #[test]
    fn multiplier_never_slows_the_ball() {
        let boost = BoostController::new(0.2);
        assert!(boost.multiplier >= 1.0);
    }

    #[test]
    fn missing_body_surfaces_error() {
        let (mut world, mut ball) = setup();
        world.remove_body(ball.handle()).unwrap();
        let mut boost = BoostController::new(1.5);
        assert_eq!(
            boost.apply(&mut world, &mut ball),
            Err(PhysicsError::MissingBody)
        );
        // A failed apply must not consume the opportunity.
        assert!(!boost.is_consumed());
    }
}
