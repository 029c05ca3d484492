//! Biped environment configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BipedError, Result};
use crate::reward::{RewardWeights, DEFAULT_TERMINAL_REWARD};
use crate::skill::{Skill, SkillProfile};

use super::scheduler::SkillSchedule;

/// Configuration of one biped environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Ticks between two decisions; actions reach the joints only on
    /// decision ticks
    pub decision_period: usize,

    /// Ticks after which an episode is truncated (0 disables truncation)
    pub max_episode_steps: usize,

    /// Reward of the terminating step
    pub terminal_reward: f32,

    /// Samples in the forward-velocity smoothing window
    pub velocity_window: usize,

    /// Never terminate on collapse or tilt
    pub terminate_never: bool,

    /// Skill active after construction
    pub initial_skill: Skill,

    /// How the active skill changes over training
    pub schedule: SkillSchedule,

    /// One profile per skill, indexed by [`Skill::index`]
    pub profiles: Vec<SkillProfile>,

    /// Reward constants
    pub reward: RewardWeights,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            decision_period: 1,
            max_episode_steps: 5000,
            terminal_reward: DEFAULT_TERMINAL_REWARD,
            velocity_window: 10,
            terminate_never: false,
            initial_skill: Skill::Walk,
            schedule: SkillSchedule::Fixed,
            profiles: Skill::ALL.iter().map(|s| SkillProfile::for_skill(*s)).collect(),
            reward: RewardWeights::default(),
        }
    }
}

impl EnvConfig {
    /// Set the decision period
    pub fn with_decision_period(mut self, period: usize) -> Self {
        self.decision_period = period;
        self
    }

    /// Set the truncation limit
    pub fn with_max_episode_steps(mut self, steps: usize) -> Self {
        self.max_episode_steps = steps;
        self
    }

    /// Set the terminal reward
    pub fn with_terminal_reward(mut self, reward: f32) -> Self {
        self.terminal_reward = reward;
        self
    }

    /// Set the velocity smoothing window
    pub fn with_velocity_window(mut self, samples: usize) -> Self {
        self.velocity_window = samples;
        self
    }

    /// Disable termination
    pub fn with_terminate_never(mut self, never: bool) -> Self {
        self.terminate_never = never;
        self
    }

    /// Set the initial skill
    pub fn with_initial_skill(mut self, skill: Skill) -> Self {
        self.initial_skill = skill;
        self
    }

    /// Set the skill schedule
    pub fn with_schedule(mut self, schedule: SkillSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Replace the profile of one skill
    pub fn with_profile(mut self, profile: SkillProfile) -> Self {
        let index = profile.skill.index();
        if let Some(slot) = self.profiles.get_mut(index) {
            *slot = profile;
        }
        self
    }

    /// Replace the reward constants
    pub fn with_reward(mut self, reward: RewardWeights) -> Self {
        self.reward = reward;
        self
    }

    /// Profile of a skill
    pub fn profile(&self, skill: Skill) -> Result<&SkillProfile> {
        self.profiles.get(skill.index()).ok_or(BipedError::UnknownSkill(skill.index()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.decision_period == 0 {
            return Err(BipedError::InvalidConfig("decision_period must be > 0".to_string()));
        }
        if self.velocity_window == 0 {
            return Err(BipedError::InvalidConfig("velocity_window must be > 0".to_string()));
        }
        if !self.terminal_reward.is_finite() {
            return Err(BipedError::InvalidConfig("terminal_reward must be finite".to_string()));
        }
        if self.profiles.len() != Skill::COUNT {
            return Err(BipedError::InvalidConfig(format!(
                "expected {} skill profiles, got {}",
                Skill::COUNT,
                self.profiles.len()
            )));
        }
        for (index, profile) in self.profiles.iter().enumerate() {
            if profile.skill.index() != index {
                return Err(BipedError::InvalidConfig(format!(
                    "profile at index {} belongs to {}",
                    index,
                    profile.skill.name()
                )));
            }
            profile.validate()?;
        }
        self.schedule.validate()?;
        self.reward.validate()
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
