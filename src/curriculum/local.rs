//! Per-agent curriculum controller
//!
//! Each agent mirrors the global lesson table through its broadcast
//! subscription and owns the in-rollout state: time alive since the last
//! milestone, the milestone counter and the resulting assistance multiplier.
//!
//! ```text
//! multiplier = clamp(1 - reduction * (lesson + milestones), 0, 1)
//! forces     = initial forces * multiplier
//! ```

use crossbeam_channel::Receiver;
use tracing::{debug, info};

use super::assistant::AssistForces;
use super::config::SkillCurriculum;
use super::global::{CurriculumHub, LessonChange, LessonUpdate};
use crate::body::SimClock;
use crate::error::{BipedError, Result};
use crate::skill::Skill;

/// What a curriculum tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No milestone this tick, or curriculum learning is off
    Idle,
    /// Milestone reached without promotion; forces were reduced
    Milestone,
    /// Milestone report promoted the active skill
    Promoted,
}

/// Curriculum view of one agent
#[derive(Debug)]
pub struct LocalCurriculum {
    hub: CurriculumHub,
    updates: Receiver<LessonUpdate>,
    skills: Vec<SkillCurriculum>,
    active: Skill,
    enabled: bool,
    learning: bool,
    milestone_counter: u32,
    time_alive: f32,
    multiplier: f32,
    forces: AssistForces,
}

impl LocalCurriculum {
    /// Subscribe to the hub and start on `skill`
    pub fn new(hub: &CurriculumHub, skill: Skill) -> Result<Self> {
        let updates = hub.subscribe()?;
        let config = hub.config()?;
        let mut local = Self {
            hub: hub.clone(),
            updates,
            skills: config.skills,
            active: skill,
            enabled: config.enabled,
            learning: false,
            milestone_counter: 0,
            time_alive: 0.0,
            multiplier: 1.0,
            forces: AssistForces::default(),
        };
        local.set_active_curriculum(skill)?;
        Ok(local)
    }

    fn curriculum(&self, skill: Skill) -> Result<&SkillCurriculum> {
        self.skills.get(skill.index()).ok_or(BipedError::UnknownSkill(skill.index()))
    }

    fn active_curriculum(&self) -> Result<&SkillCurriculum> {
        self.curriculum(self.active)
    }

    /// Shared lesson table
    pub fn hub(&self) -> &CurriculumHub {
        &self.hub
    }

    /// Skill whose curriculum is active
    pub fn active_skill(&self) -> Skill {
        self.active
    }

    /// Mirrored lesson of the active skill
    pub fn lesson(&self) -> u32 {
        self.active_curriculum().map(|c| c.lesson).unwrap_or(0)
    }

    /// Mirrored expert reward of the active skill
    pub fn expert_reward(&self) -> f32 {
        self.active_curriculum().map(|c| c.expert_reward).unwrap_or(0.0)
    }

    /// Current assistance multiplier in [0, 1]
    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    /// Fraction of the initial forces actually applied; 0 when disabled
    pub fn applied_multiplier(&self) -> f32 {
        if self.enabled {
            self.multiplier
        } else {
            0.0
        }
    }

    /// Milestones reached in this rollout without a promotion
    pub fn milestone_counter(&self) -> u32 {
        self.milestone_counter
    }

    /// Time alive since the last milestone (seconds)
    pub fn time_alive(&self) -> f32 {
        self.time_alive
    }

    /// Whether this agent still runs curriculum learning
    pub fn is_learning(&self) -> bool {
        self.learning
    }

    /// Current assistive force magnitudes
    pub fn forces(&self) -> AssistForces {
        self.forces
    }

    /// Apply every pending lesson broadcast
    ///
    /// Returns the number of updates applied.
    pub fn sync(&mut self) -> Result<usize> {
        let pending: Vec<LessonUpdate> = self.updates.try_iter().collect();
        for update in &pending {
            self.apply_update(update)?;
        }
        Ok(pending.len())
    }

    fn apply_update(&mut self, update: &LessonUpdate) -> Result<()> {
        if update.skill != self.active {
            let curriculum = self
                .skills
                .get_mut(update.skill.index())
                .ok_or(BipedError::UnknownSkill(update.skill.index()))?;
            curriculum.lesson = update.lesson;
            curriculum.expert_reward = update.expert_reward;
            return Ok(());
        }
        match update.change {
            LessonChange::Promoted | LessonChange::Restored => {
                self.update_lesson(update.lesson, update.expert_reward)
            }
            LessonChange::Reset => {
                self.update_lesson(update.lesson, update.expert_reward)?;
                self.learning = self.enabled;
                Ok(())
            }
        }
    }

    /// Adopt a new lesson for the active skill and restart the rollout
    ///
    /// Curriculum learning ends once the lesson withdraws all assistance.
    pub fn update_lesson(&mut self, lesson: u32, expert_reward: f32) -> Result<()> {
        let skill = self.active;
        let curriculum = self
            .skills
            .get_mut(skill.index())
            .ok_or(BipedError::UnknownSkill(skill.index()))?;
        curriculum.lesson = lesson;
        curriculum.expert_reward = expert_reward;
        let complete = curriculum.is_complete_at(lesson);

        if complete && self.learning {
            info!(skill = skill.name(), lesson, "curriculum learning finished");
        }
        self.learning = self.enabled && !complete;
        self.reset_rollout()
    }

    /// Switch to another skill's curriculum and restart the rollout
    pub fn set_active_curriculum(&mut self, skill: Skill) -> Result<()> {
        let curriculum = self.curriculum(skill)?;
        let complete = curriculum.is_complete_at(curriculum.lesson);
        self.active = skill;
        self.learning = self.enabled && !complete;
        self.reset_rollout()
    }

    /// Undo in-rollout reductions
    ///
    /// The multiplier is recomputed from the persisted lesson alone.
    pub fn reset_rollout(&mut self) -> Result<()> {
        self.milestone_counter = 0;
        self.time_alive = 0.0;
        self.rescale()?;
        debug!(
            skill = self.active.name(),
            lesson = self.lesson(),
            multiplier = self.multiplier,
            "curriculum rollout reset"
        );
        Ok(())
    }

    fn rescale(&mut self) -> Result<()> {
        let curriculum = self.active_curriculum()?;
        let multiplier = curriculum.multiplier(curriculum.lesson, self.milestone_counter);
        let initial = AssistForces::new(
            curriculum.init_propelling_force,
            curriculum.init_lateral_force,
            curriculum.init_brake_force,
        );
        self.multiplier = multiplier;
        self.forces = if self.enabled { initial.scaled(multiplier) } else { AssistForces::default() };
        Ok(())
    }

    /// Advance time alive by `dt` and handle a milestone
    ///
    /// At every milestone the cumulative rollout reward is reported to the
    /// hub. Without a promotion the in-rollout counter grows and forces are
    /// reduced at once; a promotion restarts the rollout at the new lesson.
    pub fn tick(&mut self, dt: f32, cumulative_reward: f32, clock: SimClock) -> Result<TickOutcome> {
        self.sync()?;
        if !self.learning {
            return Ok(TickOutcome::Idle);
        }

        self.time_alive += dt;
        if self.time_alive < self.active_curriculum()?.milestone_secs {
            return Ok(TickOutcome::Idle);
        }
        self.time_alive = 0.0;

        debug!(
            skill = self.active.name(),
            reward = cumulative_reward,
            counter = self.milestone_counter,
            "curriculum milestone reached"
        );
        if self.hub.report_reward(self.active, cumulative_reward, clock)? {
            self.sync()?;
            return Ok(TickOutcome::Promoted);
        }

        self.milestone_counter += 1;
        self.rescale()?;
        Ok(TickOutcome::Milestone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::config::CurriculumConfig;

    fn clock(time: f64) -> SimClock {
        SimClock { time, step: 0 }
    }

    fn hub(reduction: f32, expert: f32) -> CurriculumHub {
        let skill = |s| {
            SkillCurriculum::new(s)
                .with_reduction_percentage(reduction)
                .with_expert_reward(expert)
        };
        let config = CurriculumConfig::default()
            .with_skill(skill(Skill::Stand))
            .with_skill(skill(Skill::Walk));
        CurriculumHub::new(config).unwrap()
    }

    #[test]
    fn test_starts_with_full_assistance() {
        let hub = hub(0.1, 0.0);
        let local = LocalCurriculum::new(&hub, Skill::Walk).unwrap();
        assert_eq!(local.multiplier(), 1.0);
        assert_eq!(local.forces(), AssistForces::new(25.0, 20.0, 20.0));
        assert!(local.is_learning());
    }

    #[test]
    fn test_disabled_curriculum_has_no_forces() {
        let hub = CurriculumHub::new(CurriculumConfig::default().with_enabled(false)).unwrap();
        let mut local = LocalCurriculum::new(&hub, Skill::Stand).unwrap();
        assert!(local.forces().is_zero());
        assert!(!local.is_learning());
        assert_eq!(local.multiplier(), 1.0);
        assert_eq!(local.applied_multiplier(), 0.0);
        assert_eq!(local.tick(10.0, 5.0, clock(0.0)).unwrap(), TickOutcome::Idle);
    }

    #[test]
    fn test_milestone_without_promotion_reduces_forces() {
        let hub = hub(0.25, 100.0);
        let mut local = LocalCurriculum::new(&hub, Skill::Stand).unwrap();

        assert_eq!(local.tick(0.3, 1.0, clock(0.3)).unwrap(), TickOutcome::Idle);
        assert_eq!(local.tick(0.3, 1.0, clock(0.6)).unwrap(), TickOutcome::Milestone);
        assert_eq!(local.milestone_counter(), 1);
        assert!((local.multiplier() - 0.75).abs() < 1e-6);
        assert!((local.forces().propelling - 18.75).abs() < 1e-4);
        assert_eq!(local.time_alive(), 0.0);

        local.reset_rollout().unwrap();
        assert_eq!(local.milestone_counter(), 0);
        assert_eq!(local.multiplier(), 1.0);
    }

    #[test]
    fn test_promotion_updates_every_agent() {
        let hub = hub(0.25, 4.0);
        let mut first = LocalCurriculum::new(&hub, Skill::Stand).unwrap();
        let mut second = LocalCurriculum::new(&hub, Skill::Stand).unwrap();

        assert_eq!(first.tick(0.5, 3.0, clock(0.5)).unwrap(), TickOutcome::Promoted);
        assert_eq!(first.lesson(), 1);
        assert!((first.multiplier() - 0.75).abs() < 1e-6);
        assert_eq!(first.milestone_counter(), 0);

        assert_eq!(second.sync().unwrap(), 1);
        assert_eq!(second.lesson(), 1);
        assert!((second.multiplier() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_learning_ends_at_last_lesson() {
        let hub = hub(0.25, 0.0);
        let mut local = LocalCurriculum::new(&hub, Skill::Stand).unwrap();
        local.update_lesson(3, 1.0).unwrap();
        assert!(local.is_learning());
        local.update_lesson(4, 1.0).unwrap();
        assert!(!local.is_learning());
        assert_eq!(local.multiplier(), 0.0);
        assert!(local.forces().is_zero());
    }

    #[test]
    fn test_reset_broadcast_reenables_learning() {
        let hub = hub(0.5, 0.0);
        let mut local = LocalCurriculum::new(&hub, Skill::Walk).unwrap();
        local.update_lesson(2, 0.0).unwrap();
        assert!(!local.is_learning());

        hub.reset_curriculum_learning(Skill::Walk).unwrap();
        local.sync().unwrap();
        assert!(local.is_learning());
        assert_eq!(local.lesson(), 0);
        assert_eq!(local.multiplier(), 1.0);
    }

    #[test]
    fn test_switching_skill_uses_its_lesson() {
        let hub = hub(0.25, 0.0);
        let mut local = LocalCurriculum::new(&hub, Skill::Stand).unwrap();
        hub.report_reward(Skill::Walk, 1.0, clock(0.0)).unwrap();
        local.sync().unwrap();
        assert_eq!(local.lesson(), 0);

        local.set_active_curriculum(Skill::Walk).unwrap();
        assert_eq!(local.lesson(), 1);
        assert!((local.multiplier() - 0.75).abs() < 1e-6);
    }
}
