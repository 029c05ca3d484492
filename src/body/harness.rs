//! Physics harness boundary
//!
//! The simulation itself (integration, collisions, joint motors) lives
//! outside this crate. [`PhysicsHarness`] is the narrow interface the
//! environment drives it through: read part states, command joints, push
//! external forces and advance one tick.
//!
//! [`ScriptedHarness`] is an in-memory implementation whose poses are set by
//! the caller (or by a motion closure run on every tick). It records every
//! command it receives, which makes the environment testable without a
//! physics engine.

use std::fmt;

use nalgebra::Vector3;
use rand::Rng;

use super::{BodyPartId, BodyState};

/// Monotonic simulation clock supplied by the harness
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimClock {
    /// Simulated seconds since the harness started
    pub time: f64,
    /// Physics ticks since the harness started
    pub step: u64,
}

/// How an external force is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceMode {
    /// Continuous force, scaled by the body's mass
    Force,
    /// Continuous acceleration, independent of mass
    Acceleration,
}

/// Interface to the external physics engine
pub trait PhysicsHarness {
    /// Current state of a part, or `None` if the scene has no such part
    fn body_state(&self, part: BodyPartId) -> Option<BodyState>;

    /// Set a joint's normalized target rotation, each axis in [-1, 1]
    fn set_joint_target(&mut self, part: BodyPartId, target: [f32; 3]);

    /// Set a joint's actuation strength as a fraction in [0, 1]
    fn set_joint_strength(&mut self, part: BodyPartId, strength: f32);

    /// Apply an external force to a part for the next tick
    fn apply_force(&mut self, part: BodyPartId, force: Vector3<f32>, mode: ForceMode);

    /// Advance the simulation by one fixed tick
    fn advance(&mut self);

    /// Return the robot to its rest pose
    fn reset(&mut self);

    /// Current simulation clock
    fn clock(&self) -> SimClock;

    /// Duration of one tick in seconds
    fn fixed_delta_time(&self) -> f32;
}

/// A force recorded by [`ScriptedHarness`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedForce {
    /// Target part
    pub part: BodyPartId,
    /// Force vector in world space
    pub force: Vector3<f32>,
    /// Application mode
    pub mode: ForceMode,
}

/// Motion script run on every tick: receives the clock after the tick and
/// mutable access to every part state
pub type MotionScript = Box<dyn FnMut(&SimClock, &mut [BodyState; BodyPartId::COUNT]) + Send>;

/// Physics double driven by scripted poses
pub struct ScriptedHarness {
    rest: [BodyState; BodyPartId::COUNT],
    states: [BodyState; BodyPartId::COUNT],
    registered: [bool; BodyPartId::COUNT],
    joint_targets: [[f32; 3]; BodyPartId::COUNT],
    joint_strengths: [f32; BodyPartId::COUNT],
    pending_forces: Vec<AppliedForce>,
    last_forces: Vec<AppliedForce>,
    motion: Option<MotionScript>,
    clock: SimClock,
    dt: f32,
    reset_jitter: f32,
    resets: usize,
}

impl ScriptedHarness {
    /// Upright biped at rest, both feet on the ground, facing +Z
    ///
    /// Part heights (metres): feet 0.05, shins 0.3, thighs 0.7, hips 1.0,
    /// body 1.4. Ticks are 0.02 s.
    pub fn standing() -> Self {
        let mut rest = [BodyState::default(); BodyPartId::COUNT];
        let layout = [
            (BodyPartId::Body, 0.0, 1.4),
            (BodyPartId::Hips, 0.0, 1.0),
            (BodyPartId::ThighL, -0.15, 0.7),
            (BodyPartId::ShinL, -0.15, 0.3),
            (BodyPartId::FootL, -0.15, 0.05),
            (BodyPartId::ThighR, 0.15, 0.7),
            (BodyPartId::ShinR, 0.15, 0.3),
            (BodyPartId::FootR, 0.15, 0.05),
        ];
        for (id, x, y) in layout {
            rest[id.index()] = BodyState::at(Vector3::new(x, y, 0.0));
        }
        rest[BodyPartId::FootL.index()].ground_contact = true;
        rest[BodyPartId::FootR.index()].ground_contact = true;

        Self {
            rest,
            states: rest,
            registered: [true; BodyPartId::COUNT],
            joint_targets: [[0.0; 3]; BodyPartId::COUNT],
            joint_strengths: [0.0; BodyPartId::COUNT],
            pending_forces: Vec::new(),
            last_forces: Vec::new(),
            motion: None,
            clock: SimClock::default(),
            dt: 0.02,
            reset_jitter: 0.0,
            resets: 0,
        }
    }

    /// Set the tick duration
    pub fn with_delta_time(mut self, dt: f32) -> Self {
        self.dt = dt;
        self
    }

    /// Install a motion script run after every tick
    pub fn with_motion<F>(mut self, motion: F) -> Self
    where
        F: FnMut(&SimClock, &mut [BodyState; BodyPartId::COUNT]) + Send + 'static,
    {
        self.motion = Some(Box::new(motion));
        self
    }

    /// Randomly offset the rest pose sideways by up to `amount` on reset
    pub fn with_reset_jitter(mut self, amount: f32) -> Self {
        self.reset_jitter = amount;
        self
    }

    /// Remove a part from the scene
    pub fn without_part(mut self, part: BodyPartId) -> Self {
        self.registered[part.index()] = false;
        self
    }

    /// Mutable access to a part's current state
    pub fn state_mut(&mut self, part: BodyPartId) -> &mut BodyState {
        &mut self.states[part.index()]
    }

    /// Set both foot contact flags
    pub fn set_foot_contacts(&mut self, left: bool, right: bool) {
        self.states[BodyPartId::FootL.index()].ground_contact = left;
        self.states[BodyPartId::FootR.index()].ground_contact = right;
    }

    /// Set the same linear velocity on every part
    pub fn set_velocity(&mut self, velocity: Vector3<f32>) {
        for state in &mut self.states {
            state.linear_velocity = velocity;
        }
    }

    /// Last joint target sent for a part
    pub fn joint_target(&self, part: BodyPartId) -> [f32; 3] {
        self.joint_targets[part.index()]
    }

    /// Last joint strength sent for a part
    pub fn joint_strength(&self, part: BodyPartId) -> f32 {
        self.joint_strengths[part.index()]
    }

    /// Forces queued for the upcoming tick
    pub fn pending_forces(&self) -> &[AppliedForce] {
        &self.pending_forces
    }

    /// Forces that were active during the last completed tick
    pub fn last_forces(&self) -> &[AppliedForce] {
        &self.last_forces
    }

    /// Number of times the harness was reset
    pub fn resets(&self) -> usize {
        self.resets
    }
}

impl Default for ScriptedHarness {
    fn default() -> Self {
        Self::standing()
    }
}

impl fmt::Debug for ScriptedHarness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedHarness")
            .field("clock", &self.clock)
            .field("dt", &self.dt)
            .field("registered", &self.registered)
            .field("has_motion", &self.motion.is_some())
            .finish_non_exhaustive()
    }
}

impl PhysicsHarness for ScriptedHarness {
    fn body_state(&self, part: BodyPartId) -> Option<BodyState> {
        self.registered[part.index()].then(|| self.states[part.index()])
    }

    fn set_joint_target(&mut self, part: BodyPartId, target: [f32; 3]) {
        self.joint_targets[part.index()] = target;
    }

    fn set_joint_strength(&mut self, part: BodyPartId, strength: f32) {
        self.joint_strengths[part.index()] = strength;
    }

    fn apply_force(&mut self, part: BodyPartId, force: Vector3<f32>, mode: ForceMode) {
        self.pending_forces.push(AppliedForce { part, force, mode });
    }

    fn advance(&mut self) {
        self.clock.step += 1;
        self.clock.time += f64::from(self.dt);
        self.last_forces = std::mem::take(&mut self.pending_forces);
        if let Some(motion) = self.motion.as_mut() {
            motion(&self.clock, &mut self.states);
        }
    }

    fn reset(&mut self) {
        self.states = self.rest;
        if self.reset_jitter > 0.0 {
            let offset = rand::thread_rng().gen_range(-self.reset_jitter..=self.reset_jitter);
            for state in &mut self.states {
                state.position.x += offset;
            }
        }
        self.joint_targets = [[0.0; 3]; BodyPartId::COUNT];
        self.joint_strengths = [0.0; BodyPartId::COUNT];
        self.pending_forces.clear();
        self.resets += 1;
    }

    fn clock(&self) -> SimClock {
        self.clock
    }

    fn fixed_delta_time(&self) -> f32 {
        self.dt
    }
}
