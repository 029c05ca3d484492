//! Locomotion skills
//!
//! Exactly one skill is active per agent. The skill selects the reward
//! function, the termination thresholds and the policy the trainer should
//! route decisions to.

use serde::{Deserialize, Serialize};

use crate::error::{BipedError, Result};

/// Skill an agent is practising
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Skill {
    /// Balance in place
    #[default]
    Stand,
    /// Walk forward at a target velocity
    Walk,
}

impl Skill {
    /// Number of skills
    pub const COUNT: usize = 2;

    /// All skills by index
    pub const ALL: [Skill; Skill::COUNT] = [Skill::Stand, Skill::Walk];

    /// Skill for a trainer-side index (0 = stand, 1 = walk)
    pub fn from_index(index: usize) -> Result<Self> {
        Skill::ALL.get(index).copied().ok_or(BipedError::UnknownSkill(index))
    }

    /// Trainer-side index of this skill
    pub fn index(self) -> usize {
        self as usize
    }

    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Skill::Stand => "stand",
            Skill::Walk => "walk",
        }
    }
}

/// Per-skill targets and thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillProfile {
    /// Skill this profile belongs to
    pub skill: Skill,
    /// Forward velocity to track (m/s)
    pub target_velocity: f32,
    /// Minimum body height over the lowest foot before the rollout ends
    pub termination_height: f32,
    /// Minimum hips forward bonus before the rollout ends
    pub termination_tilt: f32,
    /// Identifier of the policy that drives this skill
    pub policy: String,
}

impl SkillProfile {
    /// Default standing profile
    ///
    /// Standing tolerates less sinking than walking: the rollout ends once
    /// the body drops below 1.1 over the lowest foot.
    pub fn stand() -> Self {
        Self {
            skill: Skill::Stand,
            target_velocity: 0.0,
            termination_height: 1.1,
            termination_tilt: 0.25,
            policy: "stand".to_string(),
        }
    }

    /// Default walking profile
    pub fn walk() -> Self {
        Self {
            skill: Skill::Walk,
            target_velocity: 0.55,
            termination_height: 1.0,
            termination_tilt: 0.25,
            policy: "walk".to_string(),
        }
    }

    /// Default profile for a skill
    pub fn for_skill(skill: Skill) -> Self {
        match skill {
            Skill::Stand => Self::stand(),
            Skill::Walk => Self::walk(),
        }
    }

    /// Validate thresholds
    pub fn validate(&self) -> Result<()> {
        if !self.target_velocity.is_finite() {
            return Err(BipedError::InvalidConfig(format!(
                "{} target_velocity must be finite",
                self.skill.name()
            )));
        }
        if !(self.termination_height >= 0.0) {
            return Err(BipedError::InvalidConfig(format!(
                "{} termination_height must be non-negative",
                self.skill.name()
            )));
        }
        if !(-0.5..=0.5).contains(&self.termination_tilt) {
            return Err(BipedError::InvalidConfig(format!(
                "{} termination_tilt must lie in [-0.5, 0.5]",
                self.skill.name()
            )));
        }
        Ok(())
    }
}
