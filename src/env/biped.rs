//! Biped locomotion environment
//!
//! A [`BipedEnv`] drives one robot through a
//! [`PhysicsHarness`](crate::body::PhysicsHarness): it encodes observations,
//! applies joint commands, shapes the reward of the active skill and feeds
//! rollouts into the shared curriculum.

mod config;
mod environment;
mod observation;
mod rollout;
mod scheduler;

pub use config::EnvConfig;
pub use environment::BipedEnv;
pub use observation::{
    GlobalTerms, ObservationEncoder, GLOBAL_OBSERVATION_SIZE, JOINT_OBSERVATION_SIZE,
    OBSERVATION_SIZE, PART_OBSERVATION_SIZE,
};
pub use rollout::{DecisionTimer, RolloutState};
pub use scheduler::{
    HeuristicSkillSelector, SkillRequest, SkillSchedule, SkillScheduler, HOLD_JITTER_STEPS,
    MIN_HOLD_STEPS, REPEAT_PROBABILITY, WALK_PROBABILITY,
};
