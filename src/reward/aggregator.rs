//! Per-step reward aggregation
//!
//! Combines directional bonuses, the gait phase bonus, velocity tracking and
//! a set of penalties into one scalar per skill.
//!
//! Standing rewards holding still:
//!
//! ```text
//! upright(all parts) + forward(all parts) - k_v * |v| - phase - effort - height
//! ```
//!
//! Walking rewards tracking the target velocity with an alternating gait:
//!
//! ```text
//! (1 - 1.3 * |v_target - v|) + upright(hips, body) + forward(hips, body)
//!   + phase + time_alive - limb - effort(no shins) - joints_at_limit - height
//! ```
//!
//! Every [`RewardBreakdown`] field holds the signed contribution of its term,
//! so the total is their plain sum.

use serde::{Deserialize, Serialize};

use super::direction::{backward_bonus, forward_bonus, upright_bonus};
use crate::body::{BodyPartId, Skeleton, ACTION_LAYOUT};
use crate::error::{BipedError, Result};
use crate::skill::Skill;

/// Weight of one part in the upright/forward sums
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartWeight {
    /// Weighted part
    pub part: BodyPartId,
    /// The part's bonus is divided by this value
    pub denominator: f32,
}

impl PartWeight {
    /// Create a part weight
    pub fn new(part: BodyPartId, denominator: f32) -> Self {
        Self { part, denominator }
    }
}

/// Tunable reward constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardWeights {
    /// Parts contributing upright/forward bonus while standing
    pub standing_parts: Vec<PartWeight>,
    /// Parts contributing upright/forward bonus while walking
    pub walking_parts: Vec<PartWeight>,
    /// Penalty per m/s of forward velocity while standing
    pub standing_velocity_penalty: f32,
    /// Slope of the walking velocity-tracking term
    pub velocity_tracking_slope: f32,
    /// Scale of the squared-action effort penalty
    pub effort_scale: f32,
    /// Parts excluded from the standing effort penalty
    pub standing_effort_excluded: Vec<BodyPartId>,
    /// Parts excluded from the walking effort penalty
    pub walking_effort_excluded: Vec<BodyPartId>,
    /// Penalty per action element at its limit (walking)
    pub joint_limit_penalty: f32,
    /// Cap of the synchronous-limb penalty (walking)
    pub limb_penalty_cap: f32,
    /// Time-alive bonus gained per tick
    pub time_alive_increment: f32,
    /// Body height over the lowest foot below which the height penalty grows
    pub height_reference: f32,
    /// Scale of the height penalty while standing
    pub standing_height_scale: f32,
    /// Scale of the height penalty while walking
    pub walking_height_scale: f32,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            standing_parts: vec![
                PartWeight::new(BodyPartId::Hips, 4.0),
                PartWeight::new(BodyPartId::Body, 4.0),
                PartWeight::new(BodyPartId::ThighL, 8.0),
                PartWeight::new(BodyPartId::ThighR, 8.0),
                PartWeight::new(BodyPartId::ShinL, 8.0),
                PartWeight::new(BodyPartId::ShinR, 8.0),
                PartWeight::new(BodyPartId::FootL, 6.0),
                PartWeight::new(BodyPartId::FootR, 6.0),
            ],
            walking_parts: vec![
                PartWeight::new(BodyPartId::Hips, 4.0),
                PartWeight::new(BodyPartId::Body, 4.0),
            ],
            standing_velocity_penalty: 1.5,
            velocity_tracking_slope: 1.3,
            effort_scale: 1e-2,
            standing_effort_excluded: Vec::new(),
            walking_effort_excluded: vec![BodyPartId::ShinL, BodyPartId::ShinR],
            joint_limit_penalty: 0.2,
            limb_penalty_cap: 0.5,
            time_alive_increment: 1e-4,
            height_reference: 1.3,
            standing_height_scale: 0.5,
            walking_height_scale: 1.0,
        }
    }
}

impl RewardWeights {
    /// Validate every constant
    pub fn validate(&self) -> Result<()> {
        let parts = self.standing_parts.iter().chain(&self.walking_parts);
        for weight in parts {
            if !(weight.denominator > 0.0) || !weight.denominator.is_finite() {
                return Err(BipedError::InvalidConfig(format!(
                    "denominator for {} must be positive",
                    weight.part.name()
                )));
            }
        }
        let scalars = [
            ("standing_velocity_penalty", self.standing_velocity_penalty),
            ("velocity_tracking_slope", self.velocity_tracking_slope),
            ("effort_scale", self.effort_scale),
            ("joint_limit_penalty", self.joint_limit_penalty),
            ("limb_penalty_cap", self.limb_penalty_cap),
            ("time_alive_increment", self.time_alive_increment),
            ("height_reference", self.height_reference),
            ("standing_height_scale", self.standing_height_scale),
            ("walking_height_scale", self.walking_height_scale),
        ];
        for (name, value) in scalars {
            if !(value >= 0.0) || !value.is_finite() {
                return Err(BipedError::InvalidConfig(format!(
                    "{} must be finite and non-negative",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Inputs of one reward evaluation
#[derive(Debug, Clone, Copy)]
pub struct RewardContext<'a> {
    /// Current body state
    pub skeleton: &'a Skeleton,
    /// Last applied action vector
    pub actions: &'a [f32],
    /// Smoothed forward velocity of the hips (m/s)
    pub velocity: f32,
    /// Target forward velocity of the active skill (m/s)
    pub target_velocity: f32,
    /// Gait phase bonus of this tick
    pub phase_bonus: f32,
    /// Accumulated time-alive bonus
    pub time_alive_bonus: f32,
}

/// Signed contribution of every reward term
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    /// Velocity tracking reward (walk) or movement penalty (stand)
    pub velocity: f32,
    /// Weighted upright bonus
    pub upright: f32,
    /// Weighted forward-alignment bonus
    pub forward: f32,
    /// Gait phase bonus (walk) or penalty (stand)
    pub phase: f32,
    /// Time-alive bonus
    pub time_alive: f32,
    /// Synchronous-limb penalty
    pub limb: f32,
    /// Actuation effort penalty
    pub effort: f32,
    /// Joints-at-limit penalty
    pub joints_at_limit: f32,
    /// Height penalty
    pub height: f32,
    /// Sum of all terms, or the terminal reward on termination
    pub total: f32,
}

impl RewardBreakdown {
    fn summed(mut self) -> Self {
        self.total = self.velocity
            + self.upright
            + self.forward
            + self.phase
            + self.time_alive
            + self.limb
            + self.effort
            + self.joints_at_limit
            + self.height;
        self
    }

    /// Breakdown of a terminated step: only the terminal reward counts
    pub fn terminal(reward: f32) -> Self {
        Self { total: reward, ..Self::default() }
    }
}

/// Penalty for the body sinking below `max_height` over the lowest foot
///
/// Zero while the body is at least `max_height` above the lowest foot,
/// growing linearly as it sinks and capped at `max_height`.
pub fn height_penalty(skeleton: &Skeleton, max_height: f32) -> f32 {
    if !(max_height > 0.0) {
        return 0.0;
    }
    (max_height - skeleton.height_over_lowest_foot()).clamp(0.0, max_height)
}

/// Sum of squared actions, skipping slots owned by `excluded` parts
pub fn effort(actions: &[f32], excluded: &[BodyPartId]) -> f32 {
    ACTION_LAYOUT
        .iter()
        .zip(actions)
        .filter(|(slot, _)| !excluded.contains(&slot.part()))
        .map(|(_, a)| a * a)
        .sum()
}

/// Number of action elements at or beyond their limit
pub fn joints_at_limit(actions: &[f32]) -> usize {
    actions.iter().filter(|a| a.abs() >= 1.0).count()
}

fn weighted_bonus(
    skeleton: &Skeleton,
    parts: &[PartWeight],
    bonus: fn(&Skeleton, BodyPartId) -> f32,
) -> f32 {
    parts.iter().map(|w| bonus(skeleton, w.part) / w.denominator).sum()
}

/// Standing reward terms
pub fn standing_reward(ctx: &RewardContext<'_>, weights: &RewardWeights) -> RewardBreakdown {
    RewardBreakdown {
        velocity: -weights.standing_velocity_penalty * ctx.velocity.abs(),
        upright: weighted_bonus(ctx.skeleton, &weights.standing_parts, upright_bonus),
        forward: weighted_bonus(ctx.skeleton, &weights.standing_parts, forward_bonus),
        phase: -ctx.phase_bonus,
        effort: -weights.effort_scale * effort(ctx.actions, &weights.standing_effort_excluded),
        height: -weights.standing_height_scale
            * height_penalty(ctx.skeleton, weights.height_reference),
        ..RewardBreakdown::default()
    }
    .summed()
}

/// Walking reward terms
pub fn walking_reward(ctx: &RewardContext<'_>, weights: &RewardWeights) -> RewardBreakdown {
    let synchronous = forward_bonus(ctx.skeleton, BodyPartId::ThighL).abs()
        + backward_bonus(ctx.skeleton, BodyPartId::ThighR).abs();

    RewardBreakdown {
        velocity: 1.0
            - weights.velocity_tracking_slope * (ctx.target_velocity - ctx.velocity).abs(),
        upright: weighted_bonus(ctx.skeleton, &weights.walking_parts, upright_bonus),
        forward: weighted_bonus(ctx.skeleton, &weights.walking_parts, forward_bonus),
        phase: ctx.phase_bonus,
        time_alive: ctx.time_alive_bonus,
        limb: -synchronous.min(weights.limb_penalty_cap),
        effort: -weights.effort_scale * effort(ctx.actions, &weights.walking_effort_excluded),
        joints_at_limit: -weights.joint_limit_penalty * joints_at_limit(ctx.actions) as f32,
        height: -weights.walking_height_scale
            * height_penalty(ctx.skeleton, weights.height_reference),
        ..RewardBreakdown::default()
    }
    .summed()
}

/// Reward of one step for the given skill
pub fn reward_for(
    skill: Skill,
    ctx: &RewardContext<'_>,
    weights: &RewardWeights,
) -> RewardBreakdown {
    match skill {
        Skill::Stand => standing_reward(ctx, weights),
        Skill::Walk => walking_reward(ctx, weights),
    }
}

/// Skill-aware reward calculator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewardAggregator {
    weights: RewardWeights,
}

impl RewardAggregator {
    /// Create an aggregator with the given weights
    pub fn new(weights: RewardWeights) -> Self {
        Self { weights }
    }

    /// Reward constants in use
    pub fn weights(&self) -> &RewardWeights {
        &self.weights
    }

    /// Evaluate the reward of one step
    ///
    /// A non-finite total means a term was fed corrupted input; it is
    /// reported as [`BipedError::NonFinite`] instead of entering the return.
    pub fn compute(&self, skill: Skill, ctx: &RewardContext<'_>) -> Result<RewardBreakdown> {
        let breakdown = reward_for(skill, ctx, &self.weights);
        if !breakdown.total.is_finite() {
            return Err(BipedError::NonFinite(format!("{} reward", skill.name())));
        }
        Ok(breakdown)
    }
}
