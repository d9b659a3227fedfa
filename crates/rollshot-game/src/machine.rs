use rollshot_core::events::EventBus;
use rollshot_core::math::Vec3;
use rollshot_core::schedule::{ScheduleId, ScheduleQueue};

use crate::aim::AimController;
use crate::ball::BallEntity;
use crate::boost::BoostController;
use crate::charge::{ChargeController, triangle_wave};
use crate::config::ShotConfig;
use crate::monitor::MonitorDirective;
use crate::notify::ShotNotification;
use crate::params::{ShotParamStore, ShotParams};
use crate::phase::ShotPhase;
use crate::physics::PhysicsWorld;

/// Phase-advance events accepted by the machine. An event received in a
/// phase with no defined transition is a logged no-op, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotEvent {
    ConfirmType,
    ConfirmDirection,
    ConfirmGuide,
    Execute,
    Cancel,
    GoBack,
}

/// Transitions deferred through the simulation-time schedule queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    /// Settle window elapsed: the applied impulse is observable, so the
    /// Rolling phase may become visible to external consumers.
    BeginRolling,
    BoostWindowExpired,
    /// Out-of-bounds halt elapsed: teleport back to safety.
    ReturnToSafety,
    /// Recovery pause elapsed: resume at the aiming entry phase.
    RecoveryComplete,
}

type Bus = EventBus<ShotNotification>;

/// Authoritative holder of the shot phase.
///
/// Owns the parameter store, the per-phase controllers, and the deferred
/// queue. All timing is keyed to simulation time and polled from `tick`;
/// nothing here waits on the wall clock.
pub struct ShotStateMachine {
    config: ShotConfig,
    phase: ShotPhase,
    store: ShotParamStore,
    aim: AimController,
    charge: ChargeController,
    boost: BoostController,
    queue: ScheduleQueue<Deferred>,
    boost_window: Option<ScheduleId>,
    /// Where an out-of-bounds ball is returned to: the position at the last
    /// execution or the last clean stop.
    safe_position: Vec3,
    strokes: u32,
}

impl ShotStateMachine {
    pub fn new(config: &ShotConfig, spawn: Vec3) -> Self {
        Self {
            config: config.clone(),
            phase: ShotPhase::Idle,
            store: ShotParamStore::new(),
            aim: AimController::new(config),
            charge: ChargeController::new(config),
            boost: BoostController::new(config.boost_multiplier),
            queue: ScheduleQueue::new(),
            boost_window: None,
            safe_position: spawn,
            strokes: 0,
        }
    }

    pub fn phase(&self) -> ShotPhase {
        self.phase
    }

    pub fn store(&self) -> &ShotParamStore {
        &self.store
    }

    /// The frozen execution record, present from execute until the shot
    /// resolves.
    pub fn executed_params(&self) -> Option<&ShotParams> {
        self.store.frozen()
    }

    pub fn strokes(&self) -> u32 {
        self.strokes
    }

    pub fn safe_position(&self) -> Vec3 {
        self.safe_position
    }

    /// Instantaneous power-meter value (0 outside CHARGING).
    pub fn power_meter(&self) -> f32 {
        if self.phase == ShotPhase::Charging && !self.store.is_frozen() {
            self.charge.power()
        } else {
            0.0
        }
    }

    // ------------------------------------------------------------------
    // Phase entry points
    // ------------------------------------------------------------------

    /// Begin a new shot sequence. Succeeds only from Idle.
    pub fn start_shot(&mut self, bus: &mut Bus) -> bool {
        if self.phase != ShotPhase::Idle {
            tracing::debug!(phase = ?self.phase, "start_shot ignored outside Idle");
            return false;
        }
        self.store.reset();
        self.phase = if self.config.skip_type_select {
            ShotPhase::Aiming
        } else {
            ShotPhase::SelectingType
        };
        bus.publish(ShotNotification::ShotTypeChanged {
            shot_type: self.store.draft_type(),
        });
        true
    }

    /// Dispatch a phase-advance event. Returns whether a transition (or
    /// execution) happened.
    pub fn advance(
        &mut self,
        event: ShotEvent,
        now: f64,
        world: &mut PhysicsWorld,
        ball: &mut BallEntity,
        bus: &mut Bus,
    ) -> bool {
        match (event, self.phase) {
            (ShotEvent::ConfirmType, ShotPhase::SelectingType) => {
                self.store.commit_type();
                self.phase = ShotPhase::Aiming;
                true
            },
            (ShotEvent::ConfirmDirection, ShotPhase::Aiming) => {
                self.store.commit_angle();
                self.phase = ShotPhase::GuideSelect;
                true
            },
            (ShotEvent::ConfirmGuide, ShotPhase::GuideSelect) => {
                self.store.commit_guide();
                self.charge.begin();
                self.phase = ShotPhase::Charging;
                true
            },
            (ShotEvent::Execute, ShotPhase::Charging) if !self.store.is_frozen() => {
                self.execute_shot(now, world, ball, bus)
            },
            (ShotEvent::Cancel, _) => self.cancel(bus),
            (ShotEvent::GoBack, _) => self.go_back(),
            (event, phase) => {
                tracing::debug!(?event, ?phase, "event has no transition from phase");
                false
            },
        }
    }

    /// Abort the shot setup. Valid from any pre-execution phase; loss-free
    /// because no physics mutation has happened yet. Rejected once the
    /// impulse is applied (settle window included).
    pub fn cancel(&mut self, bus: &mut Bus) -> bool {
        if !self.phase.is_pre_execution() || self.store.is_frozen() {
            tracing::debug!(phase = ?self.phase, "cancel ignored");
            return false;
        }
        self.store.reset();
        self.phase = ShotPhase::Idle;
        bus.publish(ShotNotification::PreviewHidden);
        bus.publish(ShotNotification::ShotCanceled);
        true
    }

    /// Return to the previous setup phase per the fixed predecessor map,
    /// revoking the commitment of the stage being re-entered.
    pub fn go_back(&mut self) -> bool {
        if self.store.is_frozen() {
            tracing::debug!("go_back ignored after execution");
            return false;
        }
        let Some(prev) = self.phase.predecessor() else {
            tracing::debug!(phase = ?self.phase, "go_back has no predecessor");
            return false;
        };
        match self.phase {
            ShotPhase::Aiming => self.store.revoke_type(),
            ShotPhase::GuideSelect => self.store.revoke_angle(),
            ShotPhase::Charging => self.store.revoke_guide(),
            _ => {},
        }
        self.phase = prev;
        true
    }

    // ------------------------------------------------------------------
    // Parameter mutation (gated per controller's phase)
    // ------------------------------------------------------------------

    pub fn cycle_type(&mut self, bus: &mut Bus) {
        if !self.phase.params_mutable() || self.store.is_frozen() {
            tracing::debug!(phase = ?self.phase, "cycle_type ignored");
            return;
        }
        crate::select::TypeSelector::cycle(&mut self.store);
        bus.publish(ShotNotification::ShotTypeChanged {
            shot_type: self.store.draft_type(),
        });
    }

    pub fn nudge_aim(&mut self, steps: i32, bus: &mut Bus) {
        if self.phase != ShotPhase::Aiming {
            tracing::debug!(phase = ?self.phase, "aim nudge ignored");
            return;
        }
        self.aim.nudge(&mut self.store, steps);
        bus.publish(ShotNotification::AimChanged {
            angle: self.store.draft_angle(),
        });
    }

    pub fn drag_aim(&mut self, delta: f32, bus: &mut Bus) {
        if self.phase != ShotPhase::Aiming {
            tracing::debug!(phase = ?self.phase, "aim drag ignored");
            return;
        }
        self.aim.drag(&mut self.store, delta);
        bus.publish(ShotNotification::AimChanged {
            angle: self.store.draft_angle(),
        });
    }

    pub fn cycle_guide(&mut self, bus: &mut Bus) {
        if self.phase != ShotPhase::GuideSelect {
            tracing::debug!(phase = ?self.phase, "guide cycle ignored");
            return;
        }
        crate::select::GuideSelector::cycle(&mut self.store);
        bus.publish(ShotNotification::GuideChanged {
            guide: self.store.draft_guide(),
        });
    }

    pub fn add_spin(&mut self, x: f32, z: f32, bus: &mut Bus) {
        if self.phase != ShotPhase::Charging || self.store.is_frozen() {
            tracing::debug!(phase = ?self.phase, "spin delta ignored");
            return;
        }
        self.charge.add_spin(&mut self.store, x, z);
        bus.publish(ShotNotification::SpinChanged {
            spin: self.store.draft_spin(),
        });
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    /// Map sampled power (0..1) to an impulse magnitude.
    fn power_curve(&self, power: f32) -> f32 {
        power.clamp(0.0, 1.0).powf(self.config.power_exponent) * self.config.impulse_scalar
    }

    fn execute_shot(
        &mut self,
        now: f64,
        world: &mut PhysicsWorld,
        ball: &mut BallEntity,
        bus: &mut Bus,
    ) -> bool {
        let sampled = self.charge.sample();
        let params = self.store.freeze(sampled, &self.config);

        let type_multiplier = match params.shot_type {
            crate::params::ShotType::Normal => 1.0,
            crate::params::ShotType::Power => 1.15,
            crate::params::ShotType::Curve => 0.9,
        };
        let super_multiplier = if params.is_super_shot {
            self.config.super_multiplier
        } else {
            1.0
        };
        let magnitude = self.power_curve(params.power) * type_multiplier * super_multiplier;
        let direction = Vec3::new(params.aim_angle.cos(), 0.0, params.aim_angle.sin());
        // Sidespin torques about Y (curves the path), top/backspin about X.
        let torque = Vec3::new(-params.spin.z, params.spin.x, 0.0) * self.config.torque_scalar;

        let applied = ball
            .apply_impulse(world, direction, magnitude)
            .and_then(|()| ball.apply_torque(world, torque));
        if let Err(e) = applied {
            // The turn is not lost: report failure and remain in Charging
            // so the caller may retry.
            tracing::warn!("shot execution failed: {e}");
            self.store.unfreeze();
            return false;
        }

        self.strokes += 1;
        self.safe_position = ball.state().position;
        self.boost.begin_shot();
        bus.publish(ShotNotification::ShotExecuted {
            params: params.clone(),
        });
        if params.is_super_shot {
            bus.publish(ShotNotification::SuperShotTriggered { params });
        }
        // Rolling only becomes observable after the settle window, so the
        // physics step has certainly applied the impulse first.
        self.queue
            .schedule_at(now + f64::from(self.config.settle_secs), Deferred::BeginRolling);
        true
    }

    /// Player input during the boost window. Applies the one-time
    /// multiplier and returns to Rolling.
    pub fn trigger_boost(
        &mut self,
        world: &mut PhysicsWorld,
        ball: &mut BallEntity,
        bus: &mut Bus,
    ) -> bool {
        if self.phase != ShotPhase::BoostReady {
            tracing::debug!(phase = ?self.phase, "boost trigger ignored");
            return false;
        }
        match self.boost.apply(world, ball) {
            Ok(true) => {
                if let Some(id) = self.boost_window.take() {
                    self.queue.cancel(id);
                }
                self.phase = ShotPhase::Rolling;
                bus.publish(ShotNotification::BoostApplied {
                    multiplier: self.config.boost_multiplier,
                });
                true
            },
            Ok(false) => false,
            Err(e) => {
                tracing::warn!("boost application failed: {e}");
                false
            },
        }
    }

    /// Terminal transition once the course goal is reached (goal detection
    /// itself is level content, outside this core).
    pub fn complete_course(&mut self, bus: &mut Bus) -> bool {
        if !matches!(self.phase, ShotPhase::Idle | ShotPhase::Rolling | ShotPhase::BoostReady) {
            tracing::debug!(phase = ?self.phase, "complete_course ignored");
            return false;
        }
        self.queue.cancel_all();
        self.boost_window = None;
        self.phase = ShotPhase::CourseComplete;
        bus.publish(ShotNotification::CourseCompleted);
        true
    }

    // ------------------------------------------------------------------
    // Per-tick work
    // ------------------------------------------------------------------

    /// Advance phase-local time and fire due deferred transitions. Called
    /// once per fixed tick, after monitor dispatch.
    pub fn tick(
        &mut self,
        dt: f32,
        now: f64,
        world: &mut PhysicsWorld,
        ball: &mut BallEntity,
        bus: &mut Bus,
    ) {
        if self.phase == ShotPhase::Charging && !self.store.is_frozen() {
            self.charge.tick(dt);
            bus.publish(ShotNotification::PowerChanged {
                power: self.charge.power(),
            });
        }

        for deferred in self.queue.poll(now) {
            self.fire_deferred(deferred, now, world, ball, bus);
        }
    }

    fn fire_deferred(
        &mut self,
        deferred: Deferred,
        now: f64,
        world: &mut PhysicsWorld,
        ball: &mut BallEntity,
        bus: &mut Bus,
    ) {
        match deferred {
            Deferred::BeginRolling => {
                if self.phase == ShotPhase::Charging && self.store.is_frozen() {
                    self.phase = ShotPhase::Rolling;
                }
            },
            Deferred::BoostWindowExpired => {
                if self.phase == ShotPhase::BoostReady {
                    self.boost.consume_window();
                    self.boost_window = None;
                    self.phase = ShotPhase::Rolling;
                }
            },
            Deferred::ReturnToSafety => {
                if self.phase != ShotPhase::OutOfBounds {
                    return;
                }
                if let Err(e) = ball.reset(world, self.safe_position) {
                    tracing::warn!("out-of-bounds teleport failed: {e}");
                }
                self.phase = ShotPhase::Recovery;
                self.queue.schedule_at(
                    now + f64::from(self.config.recovery_secs),
                    Deferred::RecoveryComplete,
                );
            },
            Deferred::RecoveryComplete => {
                if self.phase == ShotPhase::Recovery {
                    self.store.reset();
                    self.phase = ShotPhase::Aiming;
                    bus.publish(ShotNotification::OutOfBoundsRecovered {
                        position: self.safe_position,
                    });
                }
            },
        }
    }

    /// Apply a monitor directive. Runs in the dispatch slot of the tick,
    /// strictly after the physics step and monitor evaluation.
    pub fn dispatch(
        &mut self,
        directive: MonitorDirective,
        now: f64,
        world: &mut PhysicsWorld,
        ball: &mut BallEntity,
        bus: &mut Bus,
    ) {
        match directive {
            MonitorDirective::Stopped => {
                if !self.phase.is_in_flight() {
                    return;
                }
                // Explicitly zero residual velocity so float creep cannot
                // keep the ball infinitesimally sliding.
                if let Err(e) = ball.stop(world) {
                    tracing::warn!("stop failed: {e}");
                }
                if let Some(id) = self.boost_window.take() {
                    self.queue.cancel(id);
                }
                self.safe_position = ball.state().position;
                self.store.reset();
                self.phase = ShotPhase::Idle;
                bus.publish(ShotNotification::BallStopped {
                    position: ball.state().position,
                });
            },
            MonitorDirective::BoostWindow(signal) => {
                if self.phase != ShotPhase::Rolling || self.boost.is_consumed() {
                    return;
                }
                self.phase = ShotPhase::BoostReady;
                self.boost_window = Some(self.queue.schedule_at(
                    now + f64::from(self.config.boost_window_secs),
                    Deferred::BoostWindowExpired,
                ));
                bus.publish(ShotNotification::BallBounced { signal });
            },
            MonitorDirective::LeftBounds { position } => {
                if !(self.phase.is_in_flight() || self.phase == ShotPhase::Idle) {
                    return;
                }
                if let Err(e) = ball.stop(world) {
                    tracing::warn!("out-of-bounds halt failed: {e}");
                }
                self.queue.cancel_all();
                self.boost_window = None;
                self.phase = ShotPhase::OutOfBounds;
                bus.publish(ShotNotification::OutOfBoundsEntered { position });
                self.queue.schedule_at(
                    now + f64::from(self.config.oob_return_secs),
                    Deferred::ReturnToSafety,
                );
            },
        }
    }

    /// Restore per-round bookkeeping from a snapshot. Always lands in
    /// Idle with a clean store; snapshots are taken between shots.
    pub(crate) fn restore(&mut self, strokes: u32, safe_position: Vec3) {
        self.queue.cancel_all();
        self.boost_window = None;
        self.store.reset();
        self.phase = ShotPhase::Idle;
        self.strokes = strokes;
        self.safe_position = safe_position;
    }

    /// Expected launch speed for a sampled power value, used by tests and
    /// external predictors.
    pub fn launch_speed(&self, params: &ShotParams) -> f32 {
        let type_multiplier = match params.shot_type {
            crate::params::ShotType::Normal => 1.0,
            crate::params::ShotType::Power => 1.15,
            crate::params::ShotType::Curve => 0.9,
        };
        let super_multiplier = if params.is_super_shot {
            self.config.super_multiplier
        } else {
            1.0
        };
        self.power_curve(params.power) * type_multiplier * super_multiplier / self.config.ball_mass
    }

    /// Convenience for charging tests: what the meter reads after `t`
    /// seconds in the phase.
    pub fn meter_at(&self, t: f32) -> f32 {
        triangle_wave(t, self.config.power_wave_period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotifyTopic;
    use rollshot_core::events::Topical;

    struct Rig {
        config: ShotConfig,
        world: PhysicsWorld,
        ball: BallEntity,
        machine: ShotStateMachine,
        bus: Bus,
        now: f64,
    }

    impl Rig {
        fn new() -> Self {
            Self::with_config(ShotConfig::default())
        }

        fn with_config(config: ShotConfig) -> Self {
            let mut world = PhysicsWorld::new(&config);
            let spawn = Vec3::new(0.0, config.ball_radius, 0.0);
            let ball = BallEntity::spawn(&mut world, &config, spawn);
            let machine = ShotStateMachine::new(&config, spawn);
            Self {
                config,
                world,
                ball,
                machine,
                bus: Bus::new(),
                now: 0.0,
            }
        }

        fn advance(&mut self, event: ShotEvent) -> bool {
            self.machine
                .advance(event, self.now, &mut self.world, &mut self.ball, &mut self.bus)
        }

        fn tick(&mut self, dt: f32) {
            self.now += f64::from(dt);
            self.machine
                .tick(dt, self.now, &mut self.world, &mut self.ball, &mut self.bus);
        }

        /// Walk the machine into CHARGING.
        fn to_charging(&mut self) {
            assert!(self.machine.start_shot(&mut self.bus));
            assert!(self.advance(ShotEvent::ConfirmType));
            assert!(self.advance(ShotEvent::ConfirmDirection));
            assert!(self.advance(ShotEvent::ConfirmGuide));
            assert_eq!(self.machine.phase(), ShotPhase::Charging);
        }

    }

    fn observer(rig: &mut Rig) -> rollshot_core::events::SubscriberId {
        rig.bus.subscribe(None)
    }

    fn topics(events: &[ShotNotification]) -> Vec<NotifyTopic> {
        events.iter().map(Topical::topic).collect()
    }

    #[test]
    fn start_shot_only_from_idle() {
        let mut rig = Rig::new();
        assert!(rig.machine.start_shot(&mut rig.bus));
        assert_eq!(rig.machine.phase(), ShotPhase::SelectingType);
        assert!(!rig.machine.start_shot(&mut rig.bus));
        assert_eq!(rig.machine.phase(), ShotPhase::SelectingType);
    }

    #[test]
    fn skip_type_select_enters_aiming() {
        let config = ShotConfig {
            skip_type_select: true,
            ..ShotConfig::default()
        };
        let mut rig = Rig::with_config(config);
        assert!(rig.machine.start_shot(&mut rig.bus));
        assert_eq!(rig.machine.phase(), ShotPhase::Aiming);
    }

    #[test]
    fn undefined_events_change_nothing() {
        let mut rig = Rig::new();
        // Execute from Idle
        assert!(!rig.advance(ShotEvent::Execute));
        assert_eq!(rig.machine.phase(), ShotPhase::Idle);

        rig.machine.start_shot(&mut rig.bus);
        let angle_before = rig.machine.store().draft_angle();
        // ConfirmGuide from SelectingType
        assert!(!rig.advance(ShotEvent::ConfirmGuide));
        assert_eq!(rig.machine.phase(), ShotPhase::SelectingType);
        assert_eq!(rig.machine.store().draft_angle(), angle_before);
    }

    #[test]
    fn cancel_from_every_setup_phase_returns_to_idle() {
        for steps in 0..4 {
            let mut rig = Rig::new();
            rig.machine.start_shot(&mut rig.bus);
            let order = [
                ShotEvent::ConfirmType,
                ShotEvent::ConfirmDirection,
                ShotEvent::ConfirmGuide,
            ];
            for event in order.iter().take(steps) {
                assert!(rig.advance(*event));
            }
            rig.machine.cycle_type(&mut rig.bus);
            assert!(rig.machine.cancel(&mut rig.bus));
            assert_eq!(rig.machine.phase(), ShotPhase::Idle);
            // Params reset to defaults
            assert_eq!(
                rig.machine.store().draft_type(),
                crate::params::ShotType::Normal
            );
            assert!(!rig.machine.store().is_frozen());
        }
    }

    #[test]
    fn cancel_publishes_hide_preview() {
        let mut rig = Rig::new();
        let sub = observer(&mut rig);
        rig.machine.start_shot(&mut rig.bus);
        rig.machine.cancel(&mut rig.bus);
        let events = rig.bus.drain(sub);
        let topics = topics(&events);
        assert!(topics.contains(&NotifyTopic::PreviewHidden));
        assert!(topics.contains(&NotifyTopic::ShotCanceled));
    }

    #[test]
    fn go_back_follows_predecessor_map() {
        let mut rig = Rig::new();
        rig.to_charging();
        assert!(rig.machine.go_back());
        assert_eq!(rig.machine.phase(), ShotPhase::GuideSelect);
        assert!(rig.machine.go_back());
        assert_eq!(rig.machine.phase(), ShotPhase::Aiming);
        assert!(rig.machine.go_back());
        assert_eq!(rig.machine.phase(), ShotPhase::SelectingType);
        assert!(!rig.machine.go_back());
    }

    #[test]
    fn execute_outside_charging_fails_without_velocity_change() {
        let mut rig = Rig::new();
        rig.machine.start_shot(&mut rig.bus);
        assert!(!rig.advance(ShotEvent::Execute));
        assert_eq!(rig.ball.state().linear_velocity, Vec3::ZERO);
        assert_eq!(rig.machine.phase(), ShotPhase::SelectingType);
        assert_eq!(rig.machine.strokes(), 0);
    }

    #[test]
    fn execute_applies_power_curve_velocity() {
        let mut rig = Rig::new();
        rig.to_charging();
        // Bring the meter exactly to its peak
        let half = rig.config.power_wave_period / 2.0;
        rig.machine.charge.tick(half);
        assert!(rig.advance(ShotEvent::Execute));

        let params = rig.machine.executed_params().unwrap().clone();
        assert_eq!(params.power, 1.0);
        let expected = rig.machine.launch_speed(&params);
        let actual = rig.ball.state().linear_velocity.length();
        assert!(
            (actual - expected).abs() < 1e-4,
            "expected launch speed {expected}, got {actual}"
        );
        assert_eq!(rig.machine.strokes(), 1);
    }

    #[test]
    fn peak_power_sample_is_exactly_one() {
        let mut rig = Rig::new();
        rig.to_charging();
        rig.machine.charge.tick(rig.config.power_wave_period / 2.0);
        rig.advance(ShotEvent::Execute);
        assert_eq!(rig.machine.executed_params().unwrap().power, 1.0);
    }

    #[test]
    fn rolling_is_deferred_by_settle_window() {
        let mut rig = Rig::new();
        rig.to_charging();
        rig.machine.charge.tick(0.4);
        assert!(rig.advance(ShotEvent::Execute));
        // Still not observable as Rolling
        assert_eq!(rig.machine.phase(), ShotPhase::Charging);
        assert!(rig.machine.store().is_frozen());

        // Before the settle window elapses: unchanged
        rig.tick(rig.config.settle_secs / 2.0);
        assert_eq!(rig.machine.phase(), ShotPhase::Charging);

        // After: Rolling
        rig.tick(rig.config.settle_secs);
        assert_eq!(rig.machine.phase(), ShotPhase::Rolling);
    }

    #[test]
    fn cancel_rejected_during_settle_window() {
        let mut rig = Rig::new();
        rig.to_charging();
        rig.machine.charge.tick(0.4);
        rig.advance(ShotEvent::Execute);
        assert!(!rig.machine.cancel(&mut rig.bus));
        assert!(rig.machine.store().is_frozen());
    }

    #[test]
    fn execution_failure_stays_in_charging() {
        let mut rig = Rig::new();
        rig.to_charging();
        rig.machine.charge.tick(0.4);
        rig.world.remove_body(rig.ball.handle()).unwrap();
        assert!(!rig.advance(ShotEvent::Execute));
        assert_eq!(rig.machine.phase(), ShotPhase::Charging);
        assert!(!rig.machine.store().is_frozen(), "retry must be possible");
        assert_eq!(rig.machine.strokes(), 0);
    }

    #[test]
    fn super_shot_emits_distinguished_event() {
        let mut rig = Rig::new();
        let sub = observer(&mut rig);
        rig.to_charging();
        rig.machine.charge.tick(rig.config.power_wave_period / 2.0);
        rig.advance(ShotEvent::Execute);
        let events = rig.bus.drain(sub);
        let topics = topics(&events);
        assert!(topics.contains(&NotifyTopic::ShotExecuted));
        assert!(topics.contains(&NotifyTopic::SuperShot));
    }

    #[test]
    fn normal_shot_has_no_super_event() {
        let mut rig = Rig::new();
        let sub = observer(&mut rig);
        rig.to_charging();
        rig.machine.charge.tick(0.3);
        rig.advance(ShotEvent::Execute);
        let events = rig.bus.drain(sub);
        assert!(!topics(&events).contains(&NotifyTopic::SuperShot));
    }

    #[test]
    fn rolling_never_mutates_power_or_spin() {
        let mut rig = Rig::new();
        rig.to_charging();
        rig.machine.charge.tick(0.4);
        rig.advance(ShotEvent::Execute);
        rig.tick(rig.config.settle_secs + 0.05);
        assert_eq!(rig.machine.phase(), ShotPhase::Rolling);

        let frozen = rig.machine.executed_params().unwrap().clone();
        rig.machine.add_spin(1.0, 1.0, &mut rig.bus);
        rig.machine.cycle_type(&mut rig.bus);
        assert_eq!(rig.machine.executed_params().unwrap(), &frozen);
    }

    #[test]
    fn boost_window_opens_and_expires() {
        let mut rig = Rig::new();
        let sub = observer(&mut rig);
        rig.to_charging();
        rig.machine.charge.tick(0.4);
        rig.advance(ShotEvent::Execute);
        rig.tick(rig.config.settle_secs + 0.05);
        assert_eq!(rig.machine.phase(), ShotPhase::Rolling);

        let signal = crate::monitor::CollisionSignal {
            id: uuid::Uuid::new_v4(),
            position: Vec3::new(1.0, 0.3, 0.0),
            normal: Vec3::UP,
            relative_speed: 2.5,
            sim_time: rig.now,
        };
        rig.machine.dispatch(
            MonitorDirective::BoostWindow(signal),
            rig.now,
            &mut rig.world,
            &mut rig.ball,
            &mut rig.bus,
        );
        assert_eq!(rig.machine.phase(), ShotPhase::BoostReady);
        assert!(
            topics(&rig.bus.drain(sub)).contains(&NotifyTopic::BallBounced)
        );

        // Window expires without a trigger: back to Rolling, boost spent.
        rig.tick(rig.config.boost_window_secs + 0.1);
        assert_eq!(rig.machine.phase(), ShotPhase::Rolling);

        // A second window within the same shot is refused.
        let signal = crate::monitor::CollisionSignal {
            id: uuid::Uuid::new_v4(),
            position: Vec3::ZERO,
            normal: Vec3::UP,
            relative_speed: 3.0,
            sim_time: rig.now,
        };
        rig.machine.dispatch(
            MonitorDirective::BoostWindow(signal),
            rig.now,
            &mut rig.world,
            &mut rig.ball,
            &mut rig.bus,
        );
        assert_eq!(rig.machine.phase(), ShotPhase::Rolling);
    }

    #[test]
    fn triggered_boost_multiplies_velocity_once() {
        let mut rig = Rig::new();
        let sub = observer(&mut rig);
        rig.to_charging();
        rig.machine.charge.tick(0.4);
        rig.advance(ShotEvent::Execute);
        rig.tick(rig.config.settle_secs + 0.05);

        let signal = crate::monitor::CollisionSignal {
            id: uuid::Uuid::new_v4(),
            position: Vec3::ZERO,
            normal: Vec3::UP,
            relative_speed: 2.5,
            sim_time: rig.now,
        };
        rig.machine.dispatch(
            MonitorDirective::BoostWindow(signal),
            rig.now,
            &mut rig.world,
            &mut rig.ball,
            &mut rig.bus,
        );
        let before = rig.ball.state().linear_velocity.length();
        assert!(rig.machine.trigger_boost(&mut rig.world, &mut rig.ball, &mut rig.bus));
        assert_eq!(rig.machine.phase(), ShotPhase::Rolling);
        let after = rig.ball.state().linear_velocity.length();
        assert!((after - before * rig.config.boost_multiplier).abs() < 1e-3);
        assert!(topics(&rig.bus.drain(sub)).contains(&NotifyTopic::BoostApplied));

        // Triggering again outside the window is inert.
        assert!(!rig.machine.trigger_boost(&mut rig.world, &mut rig.ball, &mut rig.bus));
    }

    #[test]
    fn ball_stopped_returns_to_idle_and_zeroes_velocity() {
        let mut rig = Rig::new();
        let sub = observer(&mut rig);
        rig.to_charging();
        rig.machine.charge.tick(0.4);
        rig.advance(ShotEvent::Execute);
        rig.tick(rig.config.settle_secs + 0.05);
        assert_eq!(rig.machine.phase(), ShotPhase::Rolling);

        rig.machine.dispatch(
            MonitorDirective::Stopped,
            rig.now,
            &mut rig.world,
            &mut rig.ball,
            &mut rig.bus,
        );
        assert_eq!(rig.machine.phase(), ShotPhase::Idle);
        assert_eq!(rig.ball.state().linear_velocity, Vec3::ZERO);
        assert_eq!(rig.ball.state().angular_velocity, Vec3::ZERO);
        assert!(rig.ball.state().resting);
        assert!(topics(&rig.bus.drain(sub)).contains(&NotifyTopic::BallStopped));
        // Ready for the next shot
        assert!(rig.machine.start_shot(&mut rig.bus));
    }

    #[test]
    fn out_of_bounds_recovery_sequence() {
        let mut rig = Rig::new();
        let sub = observer(&mut rig);
        rig.to_charging();
        rig.machine.charge.tick(0.4);
        rig.advance(ShotEvent::Execute);
        let safe = rig.machine.safe_position();
        rig.tick(rig.config.settle_secs + 0.05);

        rig.machine.dispatch(
            MonitorDirective::LeftBounds {
                position: Vec3::new(-26.0, 0.3, 0.0),
            },
            rig.now,
            &mut rig.world,
            &mut rig.ball,
            &mut rig.bus,
        );
        assert_eq!(rig.machine.phase(), ShotPhase::OutOfBounds);
        assert_eq!(rig.ball.state().linear_velocity, Vec3::ZERO);
        assert!(topics(&rig.bus.drain(sub)).contains(&NotifyTopic::OutOfBounds));

        // After the return delay: teleported to safety, Recovery.
        rig.tick(rig.config.oob_return_secs + 0.05);
        assert_eq!(rig.machine.phase(), ShotPhase::Recovery);
        assert_eq!(rig.ball.state().position, safe);

        // After the recovery delay: aiming again, event published.
        rig.tick(rig.config.recovery_secs + 0.05);
        assert_eq!(rig.machine.phase(), ShotPhase::Aiming);
        assert!(topics(&rig.bus.drain(sub)).contains(&NotifyTopic::Recovered));
    }

    #[test]
    fn complete_course_is_terminal() {
        let mut rig = Rig::new();
        assert!(rig.machine.complete_course(&mut rig.bus));
        assert_eq!(rig.machine.phase(), ShotPhase::CourseComplete);
        assert!(!rig.machine.start_shot(&mut rig.bus));
        assert!(!rig.machine.cancel(&mut rig.bus));
        assert!(!rig.machine.complete_course(&mut rig.bus));
    }

    #[test]
    fn mutators_gated_by_phase() {
        let mut rig = Rig::new();
        // Aim outside Aiming
        rig.machine.nudge_aim(5, &mut rig.bus);
        assert_eq!(rig.machine.store().draft_angle(), 0.0);
        // Guide outside GuideSelect
        rig.machine.cycle_guide(&mut rig.bus);
        assert_eq!(
            rig.machine.store().draft_guide(),
            crate::params::GuideLength::Short
        );
        // Spin outside Charging
        rig.machine.add_spin(1.0, 0.0, &mut rig.bus);
        assert_eq!(rig.machine.store().draft_spin(), Vec3::ZERO);
    }

    #[test]
    fn type_cycle_allowed_through_charging() {
        let mut rig = Rig::new();
        rig.to_charging();
        rig.machine.cycle_type(&mut rig.bus);
        assert_eq!(
            rig.machine.store().draft_type(),
            crate::params::ShotType::Power
        );
    }

    #[test]
    fn go_back_revokes_committed_stage() {
        let mut rig = Rig::new();
        rig.machine.start_shot(&mut rig.bus);
        rig.advance(ShotEvent::ConfirmType);
        rig.machine.nudge_aim(4, &mut rig.bus);
        rig.advance(ShotEvent::ConfirmDirection);
        assert!(rig.machine.store().committed_angle().is_some());
        assert!(rig.machine.go_back());
        assert!(rig.machine.store().committed_angle().is_none());
    }

    #[test]
    fn power_meter_reads_zero_outside_charging() {
        let mut rig = Rig::new();
        assert_eq!(rig.machine.power_meter(), 0.0);
        rig.to_charging();
        rig.tick(0.3);
        assert!(rig.machine.power_meter() > 0.0);
    }

    #[test]
    fn charging_tick_publishes_power() {
        let mut rig = Rig::new();
        let sub = observer(&mut rig);
        rig.to_charging();
        rig.tick(0.1);
        assert!(topics(&rig.bus.drain(sub)).contains(&NotifyTopic::Power));
    }
}
