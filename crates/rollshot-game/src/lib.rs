//! Turn-based shot core for a physics-driven rolling-ball game.
//!
//! [`ShotGame`] ties the pieces together on a fixed timestep: the physics
//! world steps first, the ball snapshot refreshes, the collision monitor
//! turns continuous motion into discrete directives, and the state machine
//! consumes those directives plus any due deferred transitions. UI-facing
//! notifications accumulate on an event bus the embedder drains.

pub mod aim;
pub mod ball;
pub mod boost;
pub mod charge;
pub mod config;
pub mod machine;
pub mod monitor;
pub mod notify;
pub mod params;
pub mod phase;
pub mod physics;
pub mod select;

use serde::{Deserialize, Serialize};

use rollshot_core::clock::SimClock;
use rollshot_core::events::{EventBus, SubscriberId};
use rollshot_core::math::Vec3;

use crate::ball::{BallEntity, BallState};
use crate::config::ShotConfig;
use crate::machine::{ShotEvent, ShotStateMachine};
use crate::monitor::CollisionMonitor;
use crate::notify::{NotifyTopic, ShotNotification};
use crate::params::ShotParams;
use crate::phase::ShotPhase;
use crate::physics::PhysicsWorld;

/// Errors from snapshot encode/decode.
#[derive(Debug)]
pub enum SnapshotError {
    Encode(rmp_serde::encode::Error),
    Decode(rmp_serde::decode::Error),
    Physics(physics::PhysicsError),
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(e) => write!(f, "snapshot encode failed: {e}"),
            Self::Decode(e) => write!(f, "snapshot decode failed: {e}"),
            Self::Physics(e) => write!(f, "snapshot restore failed: {e}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<rmp_serde::encode::Error> for SnapshotError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Self::Encode(e)
    }
}

impl From<rmp_serde::decode::Error> for SnapshotError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Self::Decode(e)
    }
}

impl From<physics::PhysicsError> for SnapshotError {
    fn from(e: physics::PhysicsError) -> Self {
        Self::Physics(e)
    }
}

/// Between-shots save state, serialized as MessagePack.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GameSnapshot {
    ball: BallState,
    strokes: u32,
    safe_position: Vec3,
}

/// The assembled shot core.
pub struct ShotGame {
    config: ShotConfig,
    world: PhysicsWorld,
    ball: BallEntity,
    machine: ShotStateMachine,
    monitor: CollisionMonitor,
    clock: SimClock,
    bus: EventBus<ShotNotification>,
    paused: bool,
}

impl ShotGame {
    pub fn new(config: ShotConfig, spawn: Vec3) -> Self {
        let mut world = PhysicsWorld::new(&config);
        let ball = BallEntity::spawn(&mut world, &config, spawn);
        let machine = ShotStateMachine::new(&config, spawn);
        let monitor = CollisionMonitor::new(&config);
        let clock = SimClock::new(config.physics_step);
        Self {
            config,
            world,
            ball,
            machine,
            monitor,
            clock,
            bus: EventBus::new(),
            paused: false,
        }
    }

    /// Build with configuration loaded from disk or environment.
    pub fn from_env(spawn: Vec3) -> Self {
        Self::new(ShotConfig::load(), spawn)
    }

    /// Advance the simulation by a variable frame delta. Runs zero or more
    /// fixed ticks; returns how many ran. A no-op while paused.
    pub fn update(&mut self, dt: f32) -> u32 {
        if self.paused {
            return 0;
        }
        let steps = self.clock.advance(dt);
        for _ in 0..steps {
            self.step_once();
        }
        steps
    }

    /// One fixed tick in strict order: physics, ball refresh, monitor,
    /// directive dispatch, deferred transitions. Notifications published
    /// along the way stay queued on the bus for the embedder to drain.
    fn step_once(&mut self) {
        let step = self.clock.step();
        self.clock.tick();
        let now = self.clock.now();

        self.world.step(step);
        self.ball.refresh(&self.world, step);

        let contacts = self.world.drain_contacts();
        let directives =
            self.monitor
                .evaluate(self.machine.phase(), &self.ball, &contacts, now);
        for directive in directives {
            self.machine
                .dispatch(directive, now, &mut self.world, &mut self.ball, &mut self.bus);
        }

        self.machine
            .tick(step, now, &mut self.world, &mut self.ball, &mut self.bus);
    }

    // ------------------------------------------------------------------
    // Input surface
    // ------------------------------------------------------------------

    pub fn start_shot(&mut self) -> bool {
        self.machine.start_shot(&mut self.bus)
    }

    pub fn handle_event(&mut self, event: ShotEvent) -> bool {
        self.machine.advance(
            event,
            self.clock.now(),
            &mut self.world,
            &mut self.ball,
            &mut self.bus,
        )
    }

    pub fn cycle_shot_type(&mut self) {
        self.machine.cycle_type(&mut self.bus);
    }

    pub fn nudge_aim(&mut self, steps: i32) {
        self.machine.nudge_aim(steps, &mut self.bus);
    }

    pub fn drag_aim(&mut self, delta: f32) {
        self.machine.drag_aim(delta, &mut self.bus);
    }

    pub fn cycle_guide(&mut self) {
        self.machine.cycle_guide(&mut self.bus);
    }

    pub fn add_spin(&mut self, x: f32, z: f32) {
        self.machine.add_spin(x, z, &mut self.bus);
    }

    pub fn trigger_boost(&mut self) -> bool {
        self.machine
            .trigger_boost(&mut self.world, &mut self.ball, &mut self.bus)
    }

    pub fn complete_course(&mut self) -> bool {
        self.machine.complete_course(&mut self.bus)
    }

    // ------------------------------------------------------------------
    // Observation surface
    // ------------------------------------------------------------------

    pub fn phase(&self) -> ShotPhase {
        self.machine.phase()
    }

    pub fn strokes(&self) -> u32 {
        self.machine.strokes()
    }

    pub fn ball_state(&self) -> &BallState {
        self.ball.state()
    }

    pub fn power_meter(&self) -> f32 {
        self.machine.power_meter()
    }

    pub fn executed_params(&self) -> Option<&ShotParams> {
        self.machine.executed_params()
    }

    pub fn sim_time(&self) -> f64 {
        self.clock.now()
    }

    pub fn config(&self) -> &ShotConfig {
        &self.config
    }

    pub fn subscribe(&mut self, topics: Option<Vec<NotifyTopic>>) -> SubscriberId {
        self.bus.subscribe(topics)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.bus.unsubscribe(id);
    }

    pub fn drain_events(&mut self, id: SubscriberId) -> Vec<ShotNotification> {
        self.bus.drain(id)
    }

    // ------------------------------------------------------------------
    // Pause and persistence
    // ------------------------------------------------------------------

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Serialize the between-shots state as MessagePack.
    pub fn snapshot(&self) -> Result<Vec<u8>, SnapshotError> {
        let snap = GameSnapshot {
            ball: self.ball.state().clone(),
            strokes: self.machine.strokes(),
            safe_position: self.machine.safe_position(),
        };
        Ok(rmp_serde::to_vec(&snap)?)
    }

    /// Restore a snapshot. The machine always resumes in Idle; any
    /// in-flight shot the snapshot predates is discarded.
    pub fn apply_snapshot(&mut self, bytes: &[u8]) -> Result<(), SnapshotError> {
        let snap: GameSnapshot = rmp_serde::from_slice(bytes)?;
        self.ball.reset(&mut self.world, snap.ball.position)?;
        self.machine.restore(snap.strokes, snap.safe_position);
        Ok(())
    }
}
