use serde::{Deserialize, Serialize};

use rollshot_core::math::Vec3;

use crate::config::ShotConfig;
use crate::physics::{BodyHandle, PhysicsError, PhysicsWorld};

/// Cached motion state of the ball, refreshed from the world each tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BallState {
    pub position: Vec3,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub resting: bool,
    pub sleep_timer: f32,
}

impl BallState {
    fn at(position: Vec3) -> Self {
        Self {
            position,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            resting: true,
            sleep_timer: 0.0,
        }
    }
}

/// Wraps exactly one dynamic rigid body.
///
/// All mutation of the body goes through this wrapper; phase controllers
/// never touch the world directly. The cached [`BallState`] is only updated
/// by `refresh` (after the physics step) and by stop/reset.
pub struct BallEntity {
    handle: BodyHandle,
    radius: f32,
    grounded_margin: f32,
    grounded_vertical_epsilon: f32,
    sleep_enter_speed: f32,
    sleep_enter_secs: f32,
    wake_speed: f32,
    state: BallState,
}

impl BallEntity {
    /// Create the ball's body in `world` at `spawn`.
    pub fn spawn(world: &mut PhysicsWorld, config: &ShotConfig, spawn: Vec3) -> Self {
        let handle = world.create_body(spawn, config.ball_mass, config.ball_radius);
        Self {
            handle,
            radius: config.ball_radius,
            grounded_margin: config.grounded_margin,
            grounded_vertical_epsilon: config.grounded_vertical_epsilon,
            sleep_enter_speed: config.sleep_enter_speed,
            sleep_enter_secs: config.sleep_enter_secs,
            wake_speed: config.wake_speed,
            state: BallState::at(spawn),
        }
    }

    pub fn handle(&self) -> BodyHandle {
        self.handle
    }

    pub fn state(&self) -> &BallState {
        &self.state
    }

    /// Combined linear + angular surface speed.
    pub fn combined_speed(&self) -> f32 {
        self.state.linear_velocity.length() + self.state.angular_velocity.length() * self.radius
    }

    /// Strictly greater-than: a ball exactly at `threshold` is not moving.
    pub fn is_moving(&self, threshold: f32) -> bool {
        self.combined_speed() > threshold
    }

    /// On (or within a small margin of) the ground, and not moving
    /// vertically. Speed alone never decides "stopped"; this check is what
    /// keeps a slow trajectory apex from reading as at-rest.
    pub fn is_grounded(&self) -> bool {
        self.state.position.y <= self.radius + self.grounded_margin
            && self.state.linear_velocity.y.abs() < self.grounded_vertical_epsilon
    }

    /// Pull the body's motion from the world and run sleep hysteresis.
    ///
    /// Entering rest requires staying under the enter threshold for the
    /// enter duration; waking requires exceeding the separate (higher) wake
    /// threshold. The gap prevents the resting flag from flickering around
    /// a single boundary value.
    pub fn refresh(&mut self, world: &PhysicsWorld, dt: f32) {
        let Some(body) = world.body(self.handle) else {
            tracing::warn!("ball body missing during refresh");
            return;
        };
        self.state.position = body.position;
        self.state.linear_velocity = body.velocity;
        self.state.angular_velocity = body.angular_velocity;

        let speed = self.combined_speed();
        if self.state.resting {
            if speed > self.wake_speed {
                self.state.resting = false;
                self.state.sleep_timer = 0.0;
            }
        } else if speed < self.sleep_enter_speed {
            self.state.sleep_timer += dt;
            if self.state.sleep_timer >= self.sleep_enter_secs {
                self.state.resting = true;
            }
        } else {
            self.state.sleep_timer = 0.0;
        }
    }

    /// Apply a linear impulse of `magnitude` along `direction`.
    pub fn apply_impulse(
        &mut self,
        world: &mut PhysicsWorld,
        direction: Vec3,
        magnitude: f32,
    ) -> Result<(), PhysicsError> {
        let impulse = direction.normalized_or_zero() * magnitude;
        world.apply_impulse(self.handle, impulse)?;
        if let Some(body) = world.body(self.handle) {
            self.state.linear_velocity = body.velocity;
            self.state.resting = false;
            self.state.sleep_timer = 0.0;
        }
        Ok(())
    }

    /// Apply a torque impulse (spin).
    pub fn apply_torque(
        &mut self,
        world: &mut PhysicsWorld,
        torque: Vec3,
    ) -> Result<(), PhysicsError> {
        world.apply_torque_impulse(self.handle, torque)?;
        if let Some(body) = world.body(self.handle) {
            self.state.angular_velocity = body.angular_velocity;
        }
        Ok(())
    }

    /// Multiply the linear velocity by `factor` (boost application).
    pub fn scale_velocity(
        &mut self,
        world: &mut PhysicsWorld,
        factor: f32,
    ) -> Result<(), PhysicsError> {
        let factor = if factor.is_finite() { factor.max(0.0) } else { 1.0 };
        let linear = self.state.linear_velocity * factor;
        world.set_velocity(self.handle, linear, self.state.angular_velocity)?;
        self.state.linear_velocity = linear;
        Ok(())
    }

    /// Zero both velocities and mark the ball resting.
    pub fn stop(&mut self, world: &mut PhysicsWorld) -> Result<(), PhysicsError> {
        world.set_velocity(self.handle, Vec3::ZERO, Vec3::ZERO)?;
        self.state.linear_velocity = Vec3::ZERO;
        self.state.angular_velocity = Vec3::ZERO;
        self.state.resting = true;
        self.state.sleep_timer = 0.0;
        Ok(())
    }

    /// Teleport to `position` with both velocities zeroed.
    pub fn reset(&mut self, world: &mut PhysicsWorld, position: Vec3) -> Result<(), PhysicsError> {
        world.set_position(self.handle, position)?;
        world.set_velocity(self.handle, Vec3::ZERO, Vec3::ZERO)?;
        self.state = BallState::at(position);
        Ok(())
    }
}
