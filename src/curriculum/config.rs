//! Curriculum configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BipedError, Result};
use crate::skill::Skill;

/// Curriculum parameters and persisted progress of one skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCurriculum {
    /// Skill this curriculum trains
    pub skill: Skill,

    /// Time alive (seconds) between two milestones
    pub milestone_secs: f32,

    /// Fraction of the initial forces removed per lesson or milestone
    pub reduction_percentage: f32,

    /// Promote once a reward reaches this fraction of the expert reward
    pub update_on_percentage: f32,

    /// Forward propelling force at lesson 0
    pub init_propelling_force: f32,

    /// Lateral balance force at lesson 0
    pub init_lateral_force: f32,

    /// Braking force at lesson 0
    pub init_brake_force: f32,

    /// Best cumulative reward reported so far
    pub expert_reward: f32,

    /// Current lesson
    pub lesson: u32,

    /// Simulation steps that must pass after a lesson change before the
    /// next promotion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_steps_to_reach: Option<u64>,
}

impl SkillCurriculum {
    /// Default curriculum for a skill
    pub fn new(skill: Skill) -> Self {
        Self {
            skill,
            milestone_secs: 0.5,
            reduction_percentage: 0.1,
            update_on_percentage: 0.7,
            init_propelling_force: 25.0,
            init_lateral_force: 20.0,
            init_brake_force: 20.0,
            expert_reward: 0.0,
            lesson: 0,
            minimum_steps_to_reach: None,
        }
    }

    /// Set the per-lesson reduction
    pub fn with_reduction_percentage(mut self, reduction: f32) -> Self {
        self.reduction_percentage = reduction;
        self
    }

    /// Set the milestone duration
    pub fn with_milestone_secs(mut self, secs: f32) -> Self {
        self.milestone_secs = secs;
        self
    }

    /// Set the promotion threshold fraction
    pub fn with_update_on_percentage(mut self, percentage: f32) -> Self {
        self.update_on_percentage = percentage;
        self
    }

    /// Set the initial expert reward
    pub fn with_expert_reward(mut self, reward: f32) -> Self {
        self.expert_reward = reward;
        self
    }

    /// Set the initial assistive forces
    pub fn with_initial_forces(mut self, propelling: f32, lateral: f32, brake: f32) -> Self {
        self.init_propelling_force = propelling;
        self.init_lateral_force = lateral;
        self.init_brake_force = brake;
        self
    }

    /// Require a minimum number of steps between promotions
    pub fn with_minimum_steps_to_reach(mut self, steps: u64) -> Self {
        self.minimum_steps_to_reach = Some(steps);
        self
    }

    /// Assistance multiplier for a lesson plus in-rollout milestones
    ///
    /// `clamp(1 - reduction * (lesson + milestones), 0, 1)`
    pub fn multiplier(&self, lesson: u32, milestones: u32) -> f32 {
        let reduction = self.reduction_percentage * (lesson as f32 + milestones as f32);
        (1.0 - reduction).clamp(0.0, 1.0)
    }

    /// Whether `lesson` removes all assistance
    pub fn is_complete_at(&self, lesson: u32) -> bool {
        lesson as f32 * self.reduction_percentage >= 1.0 - 1e-6
    }

    /// Validate the parameters
    pub fn validate(&self) -> Result<()> {
        let name = self.skill.name();
        if !(self.milestone_secs > 0.0) {
            return Err(BipedError::InvalidConfig(format!(
                "{} milestone_secs must be positive",
                name
            )));
        }
        if !(self.reduction_percentage > 0.0 && self.reduction_percentage <= 1.0) {
            return Err(BipedError::InvalidConfig(format!(
                "{} reduction_percentage must lie in (0, 1]",
                name
            )));
        }
        if !(self.update_on_percentage >= 0.0) || !self.update_on_percentage.is_finite() {
            return Err(BipedError::InvalidConfig(format!(
                "{} update_on_percentage must be finite and non-negative",
                name
            )));
        }
        let forces = [self.init_propelling_force, self.init_lateral_force, self.init_brake_force];
        if forces.iter().any(|f| !(*f >= 0.0) || !f.is_finite()) {
            return Err(BipedError::InvalidConfig(format!(
                "{} initial forces must be finite and non-negative",
                name
            )));
        }
        if !self.expert_reward.is_finite() {
            return Err(BipedError::InvalidConfig(format!("{} expert_reward must be finite", name)));
        }
        Ok(())
    }
}

/// Curriculum settings shared by every agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumConfig {
    /// Whether curriculum learning runs at all
    pub enabled: bool,

    /// Cooldown after a promotion during which further promotions are dropped
    pub lock_duration_secs: f64,

    /// One curriculum per skill, indexed by [`Skill::index`]
    pub skills: Vec<SkillCurriculum>,
}

impl Default for CurriculumConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lock_duration_secs: 2.0,
            skills: Skill::ALL.iter().map(|s| SkillCurriculum::new(*s)).collect(),
        }
    }
}

impl CurriculumConfig {
    /// Enable or disable curriculum learning
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the promotion cooldown
    pub fn with_lock_duration(mut self, secs: f64) -> Self {
        self.lock_duration_secs = secs;
        self
    }

    /// Replace the curriculum of one skill
    pub fn with_skill(mut self, curriculum: SkillCurriculum) -> Self {
        let index = curriculum.skill.index();
        if let Some(slot) = self.skills.get_mut(index) {
            *slot = curriculum;
        }
        self
    }

    /// Curriculum of a skill
    pub fn skill(&self, skill: Skill) -> Result<&SkillCurriculum> {
        self.skills.get(skill.index()).ok_or(BipedError::UnknownSkill(skill.index()))
    }

    /// Validate every skill curriculum and the table layout
    pub fn validate(&self) -> Result<()> {
        if !(self.lock_duration_secs >= 0.0) || !self.lock_duration_secs.is_finite() {
            return Err(BipedError::InvalidConfig(
                "lock_duration_secs must be finite and non-negative".to_string(),
            ));
        }
        if self.skills.len() != Skill::COUNT {
            return Err(BipedError::InvalidConfig(format!(
                "expected {} skill curricula, got {}",
                Skill::COUNT,
                self.skills.len()
            )));
        }
        for (index, curriculum) in self.skills.iter().enumerate() {
            if curriculum.skill.index() != index {
                return Err(BipedError::InvalidConfig(format!(
                    "curriculum at index {} belongs to {}",
                    index,
                    curriculum.skill.name()
                )));
            }
            curriculum.validate()?;
        }
        Ok(())
    }

    /// Save to a JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from a JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Parse and validate from a JSON string
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
