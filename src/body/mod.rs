//! Biped body model
//!
//! The robot is tracked as a fixed set of rigid body parts. Each part keeps
//! the latest physics state read from the harness, the joint command derived
//! from the last action, and a focal rotation captured once at setup. The
//! focal rotation is the reference frame every directional bonus is measured
//! in.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{BipedError, Result};

pub mod action;
pub mod harness;

pub use action::{ActionSlot, ACTION_LAYOUT, ACTION_SIZE, ACTUATED_PARTS};
pub use harness::{AppliedForce, ForceMode, PhysicsHarness, ScriptedHarness, SimClock};

/// Tracked body parts, in setup order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BodyPartId {
    /// Upper body (torso)
    Body,
    /// Pelvis; root of the kinematic chain and target of assistive forces
    Hips,
    /// Left thigh
    ThighL,
    /// Left shin
    ShinL,
    /// Left foot
    FootL,
    /// Right thigh
    ThighR,
    /// Right shin
    ShinR,
    /// Right foot
    FootR,
}

impl BodyPartId {
    /// Number of tracked parts
    pub const COUNT: usize = 8;

    /// All parts in setup order (matches discriminant order)
    pub const ALL: [BodyPartId; BodyPartId::COUNT] = [
        BodyPartId::Body,
        BodyPartId::Hips,
        BodyPartId::ThighL,
        BodyPartId::ShinL,
        BodyPartId::FootL,
        BodyPartId::ThighR,
        BodyPartId::ShinR,
        BodyPartId::FootR,
    ];

    /// Array index of this part
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical name used by the physics scene
    pub fn name(self) -> &'static str {
        match self {
            BodyPartId::Body => "Body",
            BodyPartId::Hips => "Hips",
            BodyPartId::ThighL => "Thigh_L",
            BodyPartId::ShinL => "Shin_L",
            BodyPartId::FootL => "Foot_L",
            BodyPartId::ThighR => "Thigh_R",
            BodyPartId::ShinR => "Shin_R",
            BodyPartId::FootR => "Foot_R",
        }
    }

    /// Resolve a part from its scene name
    ///
    /// Matching ignores case and underscores, so `"Thigh_L"`, `"thighL"` and
    /// `"THIGHL"` all resolve to [`BodyPartId::ThighL`].
    pub fn from_name(name: &str) -> Result<Self> {
        let key: String =
            name.chars().filter(|c| *c != '_').map(|c| c.to_ascii_lowercase()).collect();
        BodyPartId::ALL
            .into_iter()
            .find(|id| {
                let canonical: String = id
                    .name()
                    .chars()
                    .filter(|c| *c != '_')
                    .map(|c| c.to_ascii_lowercase())
                    .collect();
                canonical == key
            })
            .ok_or_else(|| BipedError::MissingBodyPart(name.to_string()))
    }

    /// Whether this part is a foot
    pub fn is_foot(self) -> bool {
        matches!(self, BodyPartId::FootL | BodyPartId::FootR)
    }

    /// Whether the joint state of this part is part of the observation
    ///
    /// Hips carry no joint, and the feet are observed through contact only.
    pub fn has_observed_joint(self) -> bool {
        !matches!(self, BodyPartId::Hips | BodyPartId::FootL | BodyPartId::FootR)
    }
}

/// Raw rigid-body state supplied by the physics harness each tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    /// World position
    pub position: Vector3<f32>,
    /// World linear velocity
    pub linear_velocity: Vector3<f32>,
    /// World angular velocity
    pub angular_velocity: Vector3<f32>,
    /// World orientation
    pub orientation: UnitQuaternion<f32>,
    /// Whether the part touches the ground
    pub ground_contact: bool,
}

impl BodyState {
    /// State at rest at the given position, facing world +Z
    pub fn at(position: Vector3<f32>) -> Self {
        Self { position, ..Self::default() }
    }

    /// Local forward axis (+Z) in world space
    pub fn forward(&self) -> Vector3<f32> {
        self.orientation * Vector3::z()
    }

    /// Local up axis (+Y) in world space
    pub fn up(&self) -> Vector3<f32> {
        self.orientation * Vector3::y()
    }

    /// Local right axis (+X) in world space
    pub fn right(&self) -> Vector3<f32> {
        self.orientation * Vector3::x()
    }

    /// Linear velocity expressed in the part's local frame
    pub fn local_velocity(&self) -> Vector3<f32> {
        self.orientation.inverse_transform_vector(&self.linear_velocity)
    }

    /// Whether every component is finite
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.linear_velocity.iter().all(|v| v.is_finite())
            && self.angular_velocity.iter().all(|v| v.is_finite())
            && self.orientation.coords.iter().all(|v| v.is_finite())
    }
}

impl Default for BodyState {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            ground_contact: false,
        }
    }
}

/// One tracked body part
#[derive(Debug, Clone, PartialEq)]
pub struct BodyPart {
    /// Which part this is
    pub id: BodyPartId,
    focal_rotation: UnitQuaternion<f32>,
    /// Latest physics state
    pub state: BodyState,
    /// Normalized joint target rotation, each axis in [-1, 1]
    pub joint_target: [f32; 3],
    /// Joint strength as a fraction of the actuation limit, in [0, 1]
    pub strength: f32,
}

impl BodyPart {
    /// Create a part and capture its focal rotation from the rest state
    pub fn new(id: BodyPartId, rest: BodyState) -> Self {
        Self {
            id,
            focal_rotation: focal_rotation_for(&rest),
            state: rest,
            joint_target: [0.0; 3],
            strength: 0.0,
        }
    }

    /// Rotation that aligned the rest forward axis with world +Z
    pub fn focal_rotation(&self) -> &UnitQuaternion<f32> {
        &self.focal_rotation
    }

    /// Store a joint target, clamping every axis to [-1, 1]
    pub fn set_joint_target(&mut self, x: f32, y: f32, z: f32) {
        self.joint_target = [x.clamp(-1.0, 1.0), y.clamp(-1.0, 1.0), z.clamp(-1.0, 1.0)];
    }

    /// Store a joint strength from a raw action value in [-1, 1]
    pub fn set_strength(&mut self, action: f32) {
        self.strength = (action.clamp(-1.0, 1.0) + 1.0) * 0.5;
    }
}

/// Rotation taking the rest forward axis onto world +Z
fn focal_rotation_for(rest: &BodyState) -> UnitQuaternion<f32> {
    UnitQuaternion::rotation_between(&rest.forward(), &Vector3::z()).unwrap_or_else(|| {
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f32::consts::PI)
    })
}

/// All tracked parts of one robot, indexed by [`BodyPartId`]
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    parts: [BodyPart; BodyPartId::COUNT],
}

impl Skeleton {
    /// Build the skeleton from the harness rest pose
    ///
    /// Fails with [`BipedError::MissingBodyPart`] if the harness does not
    /// supply every tracked part.
    pub fn setup<H: PhysicsHarness + ?Sized>(harness: &H) -> Result<Self> {
        let states = read_states(harness)?;
        Ok(Self::from_rest_states(states))
    }

    /// Build the skeleton from explicit rest states, indexed by part
    pub fn from_rest_states(states: [BodyState; BodyPartId::COUNT]) -> Self {
        Self { parts: std::array::from_fn(|i| BodyPart::new(BodyPartId::ALL[i], states[i])) }
    }

    /// Re-read every part's physics state; focal rotations are untouched
    pub fn refresh<H: PhysicsHarness + ?Sized>(&mut self, harness: &H) -> Result<()> {
        let states = read_states(harness)?;
        for (part, state) in self.parts.iter_mut().zip(states) {
            part.state = state;
        }
        Ok(())
    }

    /// Access a part
    pub fn part(&self, id: BodyPartId) -> &BodyPart {
        &self.parts[id.index()]
    }

    /// Mutable access to a part
    pub fn part_mut(&mut self, id: BodyPartId) -> &mut BodyPart {
        &mut self.parts[id.index()]
    }

    /// Look up a part by scene name
    pub fn part_by_name(&self, name: &str) -> Result<&BodyPart> {
        BodyPartId::from_name(name).map(|id| self.part(id))
    }

    /// Focal rotation of a part by scene name
    pub fn focal_rotation(&self, name: &str) -> Result<&UnitQuaternion<f32>> {
        self.part_by_name(name).map(BodyPart::focal_rotation)
    }

    /// Iterate parts in setup order
    pub fn parts(&self) -> impl Iterator<Item = &BodyPart> {
        self.parts.iter()
    }

    /// Latest state of a part
    pub fn state(&self, id: BodyPartId) -> &BodyState {
        &self.parts[id.index()].state
    }

    /// Height of the upper body above the lowest foot
    pub fn height_over_lowest_foot(&self) -> f32 {
        let lowest_foot = self
            .parts
            .iter()
            .filter(|p| p.id.is_foot())
            .map(|p| p.state.position.y)
            .fold(f32::INFINITY, f32::min);
        self.state(BodyPartId::Body).position.y - lowest_foot
    }

    /// Clear joint targets and strengths
    pub fn reset_joints(&mut self) {
        for part in &mut self.parts {
            part.joint_target = [0.0; 3];
            part.strength = 0.0;
        }
    }
}

fn read_states<H: PhysicsHarness + ?Sized>(
    harness: &H,
) -> Result<[BodyState; BodyPartId::COUNT]> {
    let mut states = [BodyState::default(); BodyPartId::COUNT];
    for id in BodyPartId::ALL {
        let state = harness
            .body_state(id)
            .ok_or_else(|| BipedError::MissingBodyPart(id.name().to_string()))?;
        if !state.is_finite() {
            return Err(BipedError::NonFinite(format!("physics state of {}", id.name())));
        }
        states[id.index()] = state;
    }
    Ok(states)
}
