use serde::{Deserialize, Serialize};

use rollshot_core::math::Vec3;

use crate::config::ShotConfig;

/// Handle to a body in the world. Carries a generation so a handle kept
/// across `remove_body` is detected instead of addressing a reused slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyHandle {
    index: usize,
    generation: u32,
}

/// A dynamic rigid body (sphere).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Body {
    pub position: Vec3,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub mass: f32,
    pub radius: f32,
}

/// Best-effort contact report for one ground impact.
///
/// The stream is allowed to be sparse: only impacts above the configured
/// minimum speed are reported, and consumers must tolerate ticks where a
/// real contact produced no event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactEvent {
    pub handle: BodyHandle,
    pub point: Vec3,
    pub normal: Vec3,
    pub impact_speed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsError {
    /// The handle's body was removed (or never existed).
    MissingBody,
}

impl std::fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingBody => write!(f, "physics body is missing or was removed"),
        }
    }
}

impl std::error::Error for PhysicsError {}

struct Slot {
    generation: u32,
    body: Option<Body>,
}

/// Fixed-step rigid-body world: gravity, a ground plane at y=0 with
/// restitution, rolling friction and angular damping while grounded, and a
/// Magnus term so spin curves the flight path.
pub struct PhysicsWorld {
    slots: Vec<Slot>,
    contacts: Vec<ContactEvent>,
    gravity: f32,
    restitution: f32,
    rolling_friction: f32,
    angular_damping: f32,
    magnus_coefficient: f32,
    contact_min_speed: f32,
}

/// Speed below which a grounded body's residual drift is squashed to zero.
const VELOCITY_FLOOR: f32 = 0.02;
/// Rebound speed below which a bounce ends instead of jittering.
const BOUNCE_FLOOR: f32 = 0.2;

impl PhysicsWorld {
    pub fn new(config: &ShotConfig) -> Self {
        Self {
            slots: Vec::new(),
            contacts: Vec::new(),
            gravity: config.gravity,
            restitution: config.restitution.clamp(0.0, 1.0),
            rolling_friction: config.rolling_friction.clamp(0.0, 1.0),
            angular_damping: config.angular_damping.clamp(0.0, 1.0),
            magnus_coefficient: config.magnus_coefficient,
            contact_min_speed: config.contact_min_speed,
        }
    }

    /// Create a dynamic body at `position`.
    pub fn create_body(&mut self, position: Vec3, mass: f32, radius: f32) -> BodyHandle {
        let body = Body {
            position,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: if mass > 0.0 { mass } else { 1.0 },
            radius: if radius > 0.0 { radius } else { 0.1 },
        };
        // Reuse a free slot when one exists
        if let Some(index) = self.slots.iter().position(|s| s.body.is_none()) {
            let slot = &mut self.slots[index];
            slot.generation += 1;
            slot.body = Some(body);
            return BodyHandle {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            body: Some(body),
        });
        BodyHandle {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    /// Remove a body; subsequent use of the handle yields `MissingBody`.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<(), PhysicsError> {
        let slot = self.slot_mut(handle)?;
        slot.body = None;
        Ok(())
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.slots
            .get(handle.index)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.body.as_ref())
    }

    fn slot_mut(&mut self, handle: BodyHandle) -> Result<&mut Slot, PhysicsError> {
        match self.slots.get_mut(handle.index) {
            Some(slot) if slot.generation == handle.generation && slot.body.is_some() => Ok(slot),
            _ => Err(PhysicsError::MissingBody),
        }
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut Body, PhysicsError> {
        let slot = self.slot_mut(handle)?;
        // Checked by slot_mut
        slot.body.as_mut().ok_or(PhysicsError::MissingBody)
    }

    /// Apply an instantaneous linear impulse at the body's center.
    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec3) -> Result<(), PhysicsError> {
        let body = self.body_mut(handle)?;
        if impulse.is_finite() {
            body.velocity += impulse * (1.0 / body.mass);
        }
        Ok(())
    }

    /// Apply an instantaneous torque impulse (solid sphere: I = 2/5 m r^2).
    pub fn apply_torque_impulse(
        &mut self,
        handle: BodyHandle,
        torque: Vec3,
    ) -> Result<(), PhysicsError> {
        let body = self.body_mut(handle)?;
        if torque.is_finite() {
            let inertia = 0.4 * body.mass * body.radius * body.radius;
            body.angular_velocity += torque * (1.0 / inertia);
        }
        Ok(())
    }

    pub fn set_position(&mut self, handle: BodyHandle, position: Vec3) -> Result<(), PhysicsError> {
        self.body_mut(handle)?.position = position;
        Ok(())
    }

    pub fn set_velocity(
        &mut self,
        handle: BodyHandle,
        linear: Vec3,
        angular: Vec3,
    ) -> Result<(), PhysicsError> {
        let body = self.body_mut(handle)?;
        body.velocity = linear;
        body.angular_velocity = angular;
        Ok(())
    }

    /// Advance the simulation by a fixed `dt`.
    pub fn step(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        let friction_factor = self.rolling_friction.powf(dt);
        let damping_factor = self.angular_damping.powf(dt);

        let mut contacts = std::mem::take(&mut self.contacts);
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(body) = slot.body.as_mut() else {
                continue;
            };

            // Gravity plus the Magnus term: spin bends the path sideways.
            let magnus = body.angular_velocity.cross(body.velocity) * self.magnus_coefficient;
            body.velocity += Vec3::new(magnus.x, self.gravity + magnus.y, magnus.z) * dt;
            body.position += body.velocity * dt;

            // Ground plane at y = 0
            if body.position.y < body.radius {
                body.position.y = body.radius;
                if body.velocity.y < 0.0 {
                    let impact = -body.velocity.y;
                    let rebound = impact * self.restitution;
                    body.velocity.y = if rebound > BOUNCE_FLOOR { rebound } else { 0.0 };
                    if impact > self.contact_min_speed {
                        contacts.push(ContactEvent {
                            handle: BodyHandle {
                                index,
                                generation: slot.generation,
                            },
                            point: Vec3::new(body.position.x, 0.0, body.position.z),
                            normal: Vec3::UP,
                            impact_speed: impact,
                        });
                    }
                }

                // Rolling friction only while in ground contact
                body.velocity.x *= friction_factor;
                body.velocity.z *= friction_factor;
                body.angular_velocity = body.angular_velocity * damping_factor;

                // Squash float creep so a slowing ball actually reaches zero
                if body.velocity.length() < VELOCITY_FLOOR {
                    body.velocity = Vec3::ZERO;
                }
                if body.angular_velocity.length() < VELOCITY_FLOOR {
                    body.angular_velocity = Vec3::ZERO;
                }
            }
        }
        self.contacts = contacts;
    }

    /// Take every contact reported since the previous drain.
    pub fn drain_contacts(&mut self) -> Vec<ContactEvent> {
        std::mem::take(&mut self.contacts)
    }
}
