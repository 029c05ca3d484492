//! Assistive forces on the hips
//!
//! The assistant pushes the hips forward while they move backward, brakes
//! forward motion of a standing robot and always pushes against lateral
//! drift. Magnitudes come from the curriculum multiplier, so the assistance
//! fades as lessons advance.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::body::{BodyPartId, BodyState, ForceMode, PhysicsHarness};

/// Forward velocity above which a standing robot is braked (m/s)
pub const BRAKE_VELOCITY: f32 = 0.1;

/// Assistive force magnitudes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistForces {
    /// Forward push while moving backward
    pub propelling: f32,
    /// Push against lateral drift
    pub lateral: f32,
    /// Brake on forward motion while standing
    pub brake: f32,
}

impl AssistForces {
    /// Create a force set
    pub fn new(propelling: f32, lateral: f32, brake: f32) -> Self {
        Self { propelling, lateral, brake }
    }

    /// Scale every force by `multiplier`
    pub fn scaled(self, multiplier: f32) -> Self {
        Self {
            propelling: self.propelling * multiplier,
            lateral: self.lateral * multiplier,
            brake: self.brake * multiplier,
        }
    }

    /// Whether every force is zero
    pub fn is_zero(&self) -> bool {
        self.propelling == 0.0 && self.lateral == 0.0 && self.brake == 0.0
    }
}

/// Virtual assistant acting on the hips
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualAssistant {
    forces: AssistForces,
    standing: bool,
}

impl VirtualAssistant {
    /// Create an assistant with no force
    pub fn new() -> Self {
        Self::default()
    }

    /// Current force magnitudes
    pub fn forces(&self) -> AssistForces {
        self.forces
    }

    /// Replace the force magnitudes
    pub fn set_forces(&mut self, forces: AssistForces) {
        self.forces = forces;
    }

    /// Whether forward motion is braked
    pub fn standing(&self) -> bool {
        self.standing
    }

    /// Enable or disable braking of forward motion
    pub fn set_standing(&mut self, standing: bool) {
        self.standing = standing;
    }

    /// Acceleration to apply to the hips for their current state
    pub fn force_for(&self, hips: &BodyState) -> Vector3<f32> {
        let local = hips.local_velocity();
        let forward = hips.forward();
        let right = hips.right();

        let mut force = Vector3::zeros();
        if local.z <= 0.0 {
            force += forward * self.forces.propelling;
        } else if local.z >= BRAKE_VELOCITY && self.standing {
            force -= forward * self.forces.brake;
        }

        if local.x <= 0.0 {
            force += right * self.forces.lateral;
        } else {
            force -= right * self.forces.lateral;
        }
        force
    }

    /// Apply this tick's assistance through the harness
    ///
    /// Nothing is applied while every force is zero.
    pub fn apply<H: PhysicsHarness + ?Sized>(&self, hips: &BodyState, harness: &mut H) {
        if self.forces.is_zero() {
            return;
        }
        let force = self.force_for(hips);
        harness.apply_force(BodyPartId::Hips, force, ForceMode::Acceleration);
    }
}
