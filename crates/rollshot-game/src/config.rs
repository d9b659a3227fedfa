use serde::{Deserialize, Serialize};

use rollshot_core::math::Vec3;

/// Data-driven configuration for the shot core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShotConfig {
    /// Fixed physics step (seconds).
    pub physics_step: f32,
    /// Gravity acceleration (units/s^2, downward).
    pub gravity: f32,
    /// Ball radius in world units.
    pub ball_radius: f32,
    /// Ball mass.
    pub ball_mass: f32,
    /// Ground bounce restitution (0..1).
    pub restitution: f32,
    /// Rolling friction multiplier applied per second while grounded.
    pub rolling_friction: f32,
    /// Angular velocity damping multiplier applied per second.
    pub angular_damping: f32,
    /// Magnus coefficient: sideways acceleration = k * (omega x v).
    pub magnus_coefficient: f32,
    /// Minimum ground impact speed that produces a contact event.
    pub contact_min_speed: f32,
    /// Impulse magnitude scalar applied after the power curve.
    pub impulse_scalar: f32,
    /// Exponent of the power curve mapping sampled power to impulse.
    pub power_exponent: f32,
    /// Triangle-wave period for the power meter (seconds, full 0→1→0 cycle).
    pub power_wave_period: f32,
    /// Maximum spin vector magnitude accumulated while charging.
    pub spin_max: f32,
    /// Per-delta spin accumulation step.
    pub spin_step: f32,
    /// Torque impulse scalar applied to the frozen spin vector.
    pub torque_scalar: f32,
    /// Aim angle delta per discrete (keyboard) nudge, radians.
    pub aim_step: f32,
    /// Aim sensitivity for continuous (pointer drag) deltas, radians per unit.
    pub aim_drag_sensitivity: f32,
    /// Combined linear+angular speed at or below which the ball is not moving.
    pub stop_speed: f32,
    /// Height margin above the radius still counting as grounded.
    pub grounded_margin: f32,
    /// Vertical speed epsilon for the grounded check.
    pub grounded_vertical_epsilon: f32,
    /// Speed below which the sleep timer starts accumulating.
    pub sleep_enter_speed: f32,
    /// Time under `sleep_enter_speed` before the ball is marked resting.
    pub sleep_enter_secs: f32,
    /// Speed above which a resting ball wakes. Higher than the enter
    /// threshold so the flag cannot flicker at the boundary.
    pub wake_speed: f32,
    /// Instantaneous speed crossing that opens the boost window.
    pub boost_speed_threshold: f32,
    /// How long the boost window stays open (seconds).
    pub boost_window_secs: f32,
    /// Velocity multiplier applied by a triggered boost.
    pub boost_multiplier: f32,
    /// Sampled power at or above which a shot can be a super shot.
    pub super_power_threshold: f32,
    /// Spin magnitude at or below which a super shot still qualifies.
    pub super_spin_max: f32,
    /// Extra impulse multiplier for super shots.
    pub super_multiplier: f32,
    /// Delay between impulse application and the observable Rolling phase.
    pub settle_secs: f32,
    /// Playable-area AABB minimum corner.
    pub bounds_min: Vec3,
    /// Playable-area AABB maximum corner.
    pub bounds_max: Vec3,
    /// Delay between leaving bounds and the recovery teleport.
    pub oob_return_secs: f32,
    /// Delay between the recovery teleport and re-entering aiming.
    pub recovery_secs: f32,
    /// Skip the type-selection phase and start shots in aiming.
    pub skip_type_select: bool,
}

impl Default for ShotConfig {
    fn default() -> Self {
        Self {
            physics_step: 1.0 / 60.0,
            gravity: -9.81,
            ball_radius: 0.3,
            ball_mass: 1.0,
            restitution: 0.55,
            rolling_friction: 0.65,
            angular_damping: 0.8,
            magnus_coefficient: 0.02,
            contact_min_speed: 0.5,
            impulse_scalar: 12.0,
            power_exponent: 1.6,
            power_wave_period: 1.6,
            spin_max: 1.0,
            spin_step: 0.1,
            torque_scalar: 2.5,
            aim_step: 0.05,
            aim_drag_sensitivity: 0.01,
            stop_speed: 0.08,
            grounded_margin: 0.05,
            grounded_vertical_epsilon: 0.05,
            sleep_enter_speed: 0.12,
            sleep_enter_secs: 0.4,
            wake_speed: 0.25,
            boost_speed_threshold: 2.0,
            boost_window_secs: 1.5,
            boost_multiplier: 1.4,
            super_power_threshold: 0.95,
            super_spin_max: 0.15,
            super_multiplier: 1.5,
            settle_secs: 0.1,
            bounds_min: Vec3::new(-25.0, -5.0, -25.0),
            bounds_max: Vec3::new(25.0, 50.0, 25.0),
            oob_return_secs: 1.0,
            recovery_secs: 0.5,
            skip_type_select: false,
        }
    }
}

impl ShotConfig {
    /// Load config from `ROLLSHOT_CONFIG` or `config/shot.toml`, falling
    /// back to defaults when the file is missing or unparseable.
    pub fn load() -> Self {
        let path = std::env::var("ROLLSHOT_CONFIG").unwrap_or_else(|_| "config/shot.toml".to_string());
        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<ShotConfig>(&content) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!("Failed to parse {path}: {e}, using defaults");
                    ShotConfig::default()
                },
            },
            Err(_) => ShotConfig::default(),
        }
    }
}
