//! Environment traits and implementations
//!
//! This module defines the environment interface a trainer drives and the
//! biped locomotion environment built on it.

use anyhow::Result;

use crate::reward::{RewardBreakdown, TerminationCause};
use crate::skill::Skill;

/// Core trait for RL environments
pub trait Environment {
    /// Observation type
    type Observation;

    /// Action type
    type Action;

    /// Reset the environment and return initial observation
    fn reset(&mut self) -> Result<Self::Observation>;

    /// Step the environment with an action
    fn step(&mut self, action: Self::Action) -> Result<StepResult<Self::Observation>>;

    /// Get the observation space dimensions
    fn observation_space(&self) -> SpaceInfo;

    /// Get the action space dimensions
    fn action_space(&self) -> SpaceInfo;
}

/// Result of an environment step
#[derive(Debug, Clone)]
pub struct StepResult<O> {
    /// Next observation
    pub observation: O,

    /// Reward received
    pub reward: f32,

    /// Whether the episode terminated
    pub terminated: bool,

    /// Whether the episode was truncated
    pub truncated: bool,

    /// Additional info
    pub info: StepInfo,
}

/// Space information for observations and actions
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceInfo {
    /// Shape of the space
    pub shape: Vec<usize>,

    /// Data type
    pub dtype: SpaceType,
}

/// Space data types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpaceType {
    /// Discrete space with n options
    Discrete(usize),

    /// Continuous space bounded per element
    Continuous {
        /// Lower bound
        low: f32,
        /// Upper bound
        high: f32,
    },

    /// Continuous space without bounds
    Unbounded,
}

/// Additional step information
#[derive(Debug, Clone, Default)]
pub struct StepInfo {
    /// Episodes started since creation
    pub episode: usize,

    /// Ticks in the current episode
    pub steps: usize,

    /// Active skill
    pub skill: Skill,

    /// Lesson of the active skill
    pub lesson: u32,

    /// Fraction of the initial assistive forces applied after this step
    pub assist_multiplier: f32,

    /// Cumulative reward of the episode
    pub cumulative_reward: f32,

    /// Farthest forward hips position this episode
    pub max_distance: f32,

    /// Why the episode ended, if it did
    pub termination: Option<TerminationCause>,

    /// Per-term reward contributions
    pub terms: RewardBreakdown,
}

pub mod biped;
pub mod pool;

pub use biped::{BipedEnv, EnvConfig};
pub use pool::{EnvPool, PoolStepResult};
