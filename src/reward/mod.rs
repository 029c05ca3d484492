//! Reward shaping
//!
//! - [`direction`]: alignment bonus between body axes and world directions
//! - [`gait`]: alternating-stance phase bonus
//! - [`aggregator`]: per-skill reward sums and penalties
//! - [`termination`]: collapse and tilt checks

pub mod aggregator;
pub mod direction;
pub mod gait;
pub mod termination;

pub use aggregator::{
    height_penalty, reward_for, PartWeight, RewardAggregator, RewardBreakdown, RewardContext,
    RewardWeights,
};
pub use direction::{direction_bonus, part_bonus, Heading, DEFAULT_MAX_BONUS};
pub use gait::{calc_phase_bonus, FootContact, GaitPhase, GaitPhaseTracker, SwingRange};
pub use termination::{TerminationCause, TerminationPolicy, DEFAULT_TERMINAL_REWARD};
