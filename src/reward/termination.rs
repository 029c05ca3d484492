//! Rollout termination
//!
//! A rollout ends when the upper body sinks below the skill's height
//! threshold over the lowest foot, or when the hips turn too far away from
//! world forward.

use serde::{Deserialize, Serialize};

use super::aggregator::height_penalty;
use super::direction::forward_bonus;
use crate::body::{BodyPartId, Skeleton};
use crate::skill::SkillProfile;

/// Reward assigned to the step that terminates a rollout
pub const DEFAULT_TERMINAL_REWARD: f32 = -1.0;

/// Why a rollout ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationCause {
    /// Body sank below the height threshold
    Collapsed,
    /// Hips forward bonus fell below the tilt threshold
    Tilted,
}

/// Skill-dependent termination check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerminationPolicy {
    /// Minimum body height over the lowest foot
    pub height_threshold: f32,
    /// Minimum hips forward bonus
    pub tilt_threshold: f32,
    /// Reward replacing the aggregated reward on the terminating step
    pub terminal_reward: f32,
    /// Disable termination entirely
    pub never: bool,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self::for_profile(&SkillProfile::stand())
    }
}

impl TerminationPolicy {
    /// Policy using a skill profile's thresholds
    pub fn for_profile(profile: &SkillProfile) -> Self {
        Self {
            height_threshold: profile.termination_height,
            tilt_threshold: profile.termination_tilt,
            terminal_reward: DEFAULT_TERMINAL_REWARD,
            never: false,
        }
    }

    /// Override the terminal reward
    pub fn with_terminal_reward(mut self, reward: f32) -> Self {
        self.terminal_reward = reward;
        self
    }

    /// Disable or enable termination
    pub fn with_never(mut self, never: bool) -> Self {
        self.never = never;
        self
    }

    /// Check whether the rollout must end this step
    pub fn should_terminate(&self, skeleton: &Skeleton) -> Option<TerminationCause> {
        if self.never {
            return None;
        }
        if height_penalty(skeleton, self.height_threshold) > 0.0 {
            return Some(TerminationCause::Collapsed);
        }
        if forward_bonus(skeleton, BodyPartId::Hips) < self.tilt_threshold {
            return Some(TerminationCause::Tilted);
        }
        None
    }
}
