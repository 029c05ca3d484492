//! Biped locomotion environment
//!
//! Per tick: apply the action on decision ticks, push assistive forces,
//! advance physics, re-read the skeleton, check termination, compute the
//! skill reward, then let the curriculum update the forces for the next tick.

use anyhow::Result as AnyResult;
use tracing::{debug, info, warn};

use super::config::EnvConfig;
use super::observation::{GlobalTerms, ObservationEncoder, OBSERVATION_SIZE};
use super::rollout::RolloutState;
use super::scheduler::{HeuristicSkillSelector, SkillScheduler};
use crate::body::action::{apply_action, validate_action};
use crate::body::{BodyPartId, PhysicsHarness, Skeleton, ACTION_SIZE, ACTUATED_PARTS};
use crate::curriculum::{CurriculumHub, LocalCurriculum, TickOutcome, VirtualAssistant};
use crate::env::{Environment, SpaceInfo, SpaceType, StepInfo, StepResult};
use crate::error::Result;
use crate::reward::{
    GaitPhaseTracker, RewardAggregator, RewardBreakdown, RewardContext, TerminationCause,
    TerminationPolicy,
};
use crate::skill::{Skill, SkillProfile};

/// Biped agent driven through a [`PhysicsHarness`]
#[derive(Debug)]
pub struct BipedEnv<H: PhysicsHarness> {
    harness: H,
    config: EnvConfig,
    skeleton: Skeleton,
    skill: Skill,
    termination: TerminationPolicy,
    rewards: RewardAggregator,
    gait: GaitPhaseTracker,
    rollout: RolloutState,
    curriculum: LocalCurriculum,
    assistant: VirtualAssistant,
    scheduler: SkillScheduler,
    episode: usize,
    total_steps: u64,
}

impl<H: PhysicsHarness> BipedEnv<H> {
    /// Create an agent sharing the lesson table of `hub`
    ///
    /// Fails if the configuration is invalid or the harness lacks a body part.
    pub fn new(harness: H, config: EnvConfig, hub: &CurriculumHub) -> Result<Self> {
        config.validate()?;
        let skeleton = Skeleton::setup(&harness)?;
        let skill = config.initial_skill;
        let termination = termination_for(config.profile(skill)?, &config);
        let curriculum = LocalCurriculum::new(hub, skill)?;

        let mut assistant = VirtualAssistant::new();
        assistant.set_standing(skill == Skill::Stand);
        assistant.set_forces(curriculum.forces());

        Ok(Self {
            rewards: RewardAggregator::new(config.reward.clone()),
            rollout: RolloutState::new(config.velocity_window, config.decision_period),
            scheduler: SkillScheduler::new(config.schedule),
            harness,
            config,
            skeleton,
            skill,
            termination,
            gait: GaitPhaseTracker::new(),
            curriculum,
            assistant,
            episode: 0,
            total_steps: 0,
        })
    }

    /// Replace the heuristic skill selector, e.g. with a seeded one
    pub fn with_skill_selector(mut self, selector: HeuristicSkillSelector) -> Self {
        self.scheduler = SkillScheduler::with_selector(self.config.schedule, selector);
        self
    }

    /// Active skill
    pub fn skill(&self) -> Skill {
        self.skill
    }

    /// Profile of the active skill
    pub fn profile(&self) -> Result<&SkillProfile> {
        self.config.profile(self.skill)
    }

    /// Policy that should drive the active skill
    pub fn policy(&self) -> Result<&str> {
        self.profile().map(|p| p.policy.as_str())
    }

    /// Configuration
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Tracked body state
    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// Physics harness
    pub fn harness(&self) -> &H {
        &self.harness
    }

    /// Mutable physics harness
    pub fn harness_mut(&mut self) -> &mut H {
        &mut self.harness
    }

    /// Curriculum view of this agent
    pub fn curriculum(&self) -> &LocalCurriculum {
        &self.curriculum
    }

    /// Assistive force generator
    pub fn assistant(&self) -> &VirtualAssistant {
        &self.assistant
    }

    /// Gait phase tracker
    pub fn gait(&self) -> &GaitPhaseTracker {
        &self.gait
    }

    /// Current rollout state
    pub fn rollout(&self) -> &RolloutState {
        &self.rollout
    }

    /// Episodes started since creation
    pub fn episode(&self) -> usize {
        self.episode
    }

    /// Ticks simulated since creation
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Current observation
    pub fn observe(&self) -> Result<Vec<f32>> {
        let globals = GlobalTerms {
            time_alive_bonus: self.rollout.time_alive_bonus,
            target_velocity: self.profile()?.target_velocity,
            velocity: self.rollout.smoothed_velocity(),
        };
        ObservationEncoder::encode(&self.skeleton, &globals)
    }

    /// Switch skill by trainer-side index
    ///
    /// See [`BipedEnv::set_active_skill`].
    pub fn set_skill(&mut self, index: usize, reset_curriculum: bool) -> Result<()> {
        self.set_active_skill(Skill::from_index(index)?, reset_curriculum)
    }

    /// Switch the active skill
    ///
    /// Switching to the active skill does nothing. Otherwise the velocity
    /// window and time-alive bonus are cleared, termination thresholds follow
    /// the new profile and the curriculum rollout restarts on the new skill's
    /// lesson, optionally after resetting that lesson to 0.
    pub fn set_active_skill(&mut self, skill: Skill, reset_curriculum: bool) -> Result<()> {
        if skill == self.skill {
            return Ok(());
        }
        let profile = self.config.profile(skill)?;
        self.termination = termination_for(profile, &self.config);
        self.skill = skill;

        if reset_curriculum {
            self.curriculum.hub().reset_curriculum_learning(skill)?;
        }
        self.rollout.on_skill_change();
        self.assistant.set_standing(skill == Skill::Stand);
        self.curriculum.sync()?;
        self.curriculum.set_active_curriculum(skill)?;
        self.assistant.set_forces(self.curriculum.forces());

        info!(skill = skill.name(), reset_curriculum, "skill switched");
        Ok(())
    }

    /// Start a new rollout and return its first observation
    pub fn reset_rollout(&mut self) -> Result<Vec<f32>> {
        self.scheduler.on_reset(self.skill);
        self.harness.reset();
        self.skeleton.refresh(&self.harness)?;
        self.skeleton.reset_joints();
        self.gait.reset();
        self.rollout = RolloutState::new(self.config.velocity_window, self.config.decision_period);
        self.episode += 1;

        self.curriculum.sync()?;
        self.curriculum.reset_rollout()?;
        self.assistant.set_forces(self.curriculum.forces());

        debug!(episode = self.episode, skill = self.skill.name(), "rollout reset");
        self.observe()
    }

    /// Advance one tick with the given action
    ///
    /// Once the rollout is done, actions are ignored and a zero reward is
    /// returned until the next reset.
    pub fn step_slice(&mut self, action: &[f32]) -> Result<StepResult<Vec<f32>>> {
        validate_action(action)?;
        if self.rollout.done {
            return Ok(StepResult {
                observation: self.observe()?,
                reward: 0.0,
                terminated: true,
                truncated: false,
                info: self.info(None, RewardBreakdown::default()),
            });
        }

        if let Some(request) = self.scheduler.next(self.total_steps, self.skill) {
            self.set_active_skill(request.skill, request.reset_curriculum)?;
        }

        if self.rollout.timer.is_decision_tick() {
            apply_action(&mut self.skeleton, action)?;
            self.rollout.last_action.clear();
            self.rollout.last_action.extend_from_slice(action);
            for part in ACTUATED_PARTS {
                let joint = self.skeleton.part(part);
                self.harness.set_joint_target(part, joint.joint_target);
                self.harness.set_joint_strength(part, joint.strength);
            }
        }
        self.rollout.timer.advance();

        let hips = *self.skeleton.state(BodyPartId::Hips);
        self.assistant.apply(&hips, &mut self.harness);
        self.harness.advance();
        if let Err(err) = self.skeleton.refresh(&self.harness) {
            warn!(episode = self.episode, error = %err, "physics state rejected");
            return Err(err);
        }
        self.rollout.steps += 1;
        self.total_steps += 1;

        let hips = *self.skeleton.state(BodyPartId::Hips);
        self.rollout.record_distance(hips.position.z);
        let velocity = self.rollout.smooth_velocity(hips.linear_velocity.z);
        let phase_bonus = self.gait.update_from_skeleton(&self.skeleton);
        self.rollout.time_alive_bonus += self.config.reward.time_alive_increment;

        let cause = self.termination.should_terminate(&self.skeleton);
        let terms = match cause {
            Some(_) => RewardBreakdown::terminal(self.termination.terminal_reward),
            None => {
                let ctx = RewardContext {
                    skeleton: &self.skeleton,
                    actions: &self.rollout.last_action,
                    velocity,
                    target_velocity: self.profile()?.target_velocity,
                    phase_bonus,
                    time_alive_bonus: self.rollout.time_alive_bonus,
                };
                self.rewards.compute(self.skill, &ctx)?
            }
        };
        self.rollout.cumulative_reward += terms.total;

        if cause.is_none() {
            let clock = self.harness.clock();
            let dt = self.harness.fixed_delta_time();
            let outcome = self.curriculum.tick(dt, self.rollout.cumulative_reward, clock)?;
            if outcome != TickOutcome::Idle {
                self.assistant.set_forces(self.curriculum.forces());
            }
        }

        let terminated = cause.is_some();
        let truncated = !terminated
            && self.config.max_episode_steps > 0
            && self.rollout.steps >= self.config.max_episode_steps;
        if let Some(cause) = cause {
            debug!(episode = self.episode, steps = self.rollout.steps, ?cause, "rollout terminated");
        }
        self.rollout.done = terminated || truncated;

        Ok(StepResult {
            observation: self.observe()?,
            reward: terms.total,
            terminated,
            truncated,
            info: self.info(cause, terms),
        })
    }

    fn info(&self, termination: Option<TerminationCause>, terms: RewardBreakdown) -> StepInfo {
        StepInfo {
            episode: self.episode,
            steps: self.rollout.steps,
            skill: self.skill,
            lesson: self.curriculum.lesson(),
            assist_multiplier: self.curriculum.applied_multiplier(),
            cumulative_reward: self.rollout.cumulative_reward,
            max_distance: self.rollout.max_distance,
            termination,
            terms,
        }
    }
}

fn termination_for(profile: &SkillProfile, config: &EnvConfig) -> TerminationPolicy {
    TerminationPolicy::for_profile(profile)
        .with_terminal_reward(config.terminal_reward)
        .with_never(config.terminate_never)
}

impl<H: PhysicsHarness> Environment for BipedEnv<H> {
    type Observation = Vec<f32>;
    type Action = Vec<f32>;

    fn reset(&mut self) -> AnyResult<Self::Observation> {
        Ok(self.reset_rollout()?)
    }

    fn step(&mut self, action: Self::Action) -> AnyResult<StepResult<Self::Observation>> {
        Ok(self.step_slice(&action)?)
    }

    fn observation_space(&self) -> SpaceInfo {
        SpaceInfo { shape: vec![OBSERVATION_SIZE], dtype: SpaceType::Unbounded }
    }

    fn action_space(&self) -> SpaceInfo {
        SpaceInfo { shape: vec![ACTION_SIZE], dtype: SpaceType::Continuous { low: -1.0, high: 1.0 } }
    }
}
