//! # Stride
//!
//! Reward shaping and curriculum control for biped locomotion RL
//!
//! Stride sits between a physics engine and a trainer. Each agent reads its
//! body state through a [`body::PhysicsHarness`], turns it into an
//! observation, applies joint commands, and scores the step with a
//! skill-specific shaped reward. While a skill is still being learned, a
//! virtual assistant pushes the hips along, and a curriculum shared by all
//! agents withdraws that help lesson by lesson as rollouts improve.
//!
//! ## Quick Start
//!
//! ```rust
//! use stride_rl::prelude::*;
//!
//! let hub = CurriculumHub::new(CurriculumConfig::default())?;
//! let mut env = BipedEnv::new(ScriptedHarness::standing(), EnvConfig::default(), &hub)?;
//!
//! let obs = env.reset()?;
//! assert_eq!(obs.len(), OBSERVATION_SIZE);
//!
//! let result = env.step(vec![0.0; ACTION_SIZE])?;
//! assert!(result.reward.is_finite());
//! # Ok::<(), anyhow::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Body parts, joint commands and the physics boundary
pub mod body;

/// Shared lesson table, per-agent curriculum and assistive forces
pub mod curriculum;

/// Environment traits and implementations
pub mod env;

/// Error types
pub mod error;

/// Directional bonuses, gait phase, reward aggregation and termination
pub mod reward;

/// Skills and their profiles
pub mod skill;

/// Utility functions and helpers
pub mod utils;

/// Prelude module for convenient imports
///
/// This module re-exports commonly used types and traits for convenience.
pub mod prelude {
    pub use crate::body::{
        BodyPartId, PhysicsHarness, ScriptedHarness, Skeleton, ACTION_SIZE,
    };
    pub use crate::curriculum::{CurriculumConfig, CurriculumHub, SkillCurriculum};
    pub use crate::env::biped::OBSERVATION_SIZE;
    pub use crate::env::{BipedEnv, EnvConfig, EnvPool, Environment, StepResult};
    pub use crate::error::BipedError;
    pub use crate::reward::{RewardAggregator, RewardWeights, TerminationPolicy};
    pub use crate::skill::{Skill, SkillProfile};
}

/// Current version of stride-rl
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
