//! Global lesson table shared by every agent
//!
//! Agents report their cumulative rollout reward at each milestone. A report
//! promotes the skill to the next lesson when it reaches
//! `expert_reward * update_on_percentage`, no promotion happened within the
//! cooldown window, and (optionally) enough simulation steps have passed
//! since the last lesson change. Promotions are broadcast to every
//! subscribed agent.
//!
//! The cooldown is a deadline compared against the harness clock. Reports
//! arriving while it is pending are dropped.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{info, trace};

use super::config::{CurriculumConfig, SkillCurriculum};
use crate::body::SimClock;
use crate::error::{BipedError, Result};
use crate::skill::Skill;

/// Why a lesson changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LessonChange {
    /// A report met the promotion rule
    Promoted,
    /// The skill's curriculum was restarted from lesson 0
    Reset,
    /// Progress was restored from a snapshot
    Restored,
}

/// Lesson broadcast sent to every subscribed agent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LessonUpdate {
    /// Skill whose lesson changed
    pub skill: Skill,
    /// New lesson
    pub lesson: u32,
    /// Expert reward after the change
    pub expert_reward: f32,
    /// Cause of the change
    pub change: LessonChange,
}

/// Serializable curriculum progress of one skill
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurriculumSnapshot {
    /// Skill
    pub skill: Skill,
    /// Current lesson
    pub lesson: u32,
    /// Multiplier of a fresh rollout at this lesson
    pub multiplier: f32,
    /// Expert reward
    pub expert_reward: f32,
}

/// Lesson table state behind the hub's lock
#[derive(Debug)]
struct GlobalCurriculum {
    config: CurriculumConfig,
    locked_until: Option<f64>,
    last_change_step: Vec<u64>,
    subscribers: Vec<Sender<LessonUpdate>>,
}

impl GlobalCurriculum {
    fn skill_mut(&mut self, skill: Skill) -> Result<&mut SkillCurriculum> {
        self.config.skills.get_mut(skill.index()).ok_or(BipedError::UnknownSkill(skill.index()))
    }

    fn release_expired(&mut self, now: f64) -> bool {
        match self.locked_until {
            Some(deadline) if deadline <= now => {
                self.locked_until = None;
                true
            }
            _ => false,
        }
    }

    fn broadcast(&mut self, update: LessonUpdate) {
        // Agents that went away have dropped their receiver
        self.subscribers.retain(|tx| tx.send(update).is_ok());
    }
}

/// Shared handle to the global lesson table
///
/// Cloning the hub clones the handle, not the table.
#[derive(Debug, Clone)]
pub struct CurriculumHub {
    inner: Arc<RwLock<GlobalCurriculum>>,
}

impl CurriculumHub {
    /// Create a lesson table from a validated configuration
    pub fn new(config: CurriculumConfig) -> Result<Self> {
        config.validate()?;
        let skills = config.skills.len();
        Ok(Self {
            inner: Arc::new(RwLock::new(GlobalCurriculum {
                config,
                locked_until: None,
                last_change_step: vec![0; skills],
                subscribers: Vec::new(),
            })),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, GlobalCurriculum>> {
        self.inner.read().map_err(|_| BipedError::CurriculumPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, GlobalCurriculum>> {
        self.inner.write().map_err(|_| BipedError::CurriculumPoisoned)
    }

    /// Register an agent for lesson broadcasts
    pub fn subscribe(&self) -> Result<Receiver<LessonUpdate>> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.write()?.subscribers.push(tx);
        Ok(rx)
    }

    /// Copy of the current configuration and progress
    pub fn config(&self) -> Result<CurriculumConfig> {
        Ok(self.read()?.config.clone())
    }

    /// Whether curriculum learning is enabled
    pub fn enabled(&self) -> Result<bool> {
        Ok(self.read()?.config.enabled)
    }

    /// Current lesson of a skill
    pub fn lesson(&self, skill: Skill) -> Result<u32> {
        Ok(self.read()?.config.skill(skill)?.lesson)
    }

    /// Current expert reward of a skill
    pub fn expert_reward(&self, skill: Skill) -> Result<f32> {
        Ok(self.read()?.config.skill(skill)?.expert_reward)
    }

    /// Whether promotions are currently dropped
    pub fn is_locked(&self, now: f64) -> Result<bool> {
        Ok(self.read()?.locked_until.is_some_and(|deadline| deadline > now))
    }

    /// Release the cooldown lock if its deadline has passed
    ///
    /// Returns `true` only for the call that actually released it.
    pub fn release_expired(&self, now: f64) -> Result<bool> {
        Ok(self.write()?.release_expired(now))
    }

    /// Report a cumulative rollout reward for a skill
    ///
    /// Returns whether the report promoted the skill to the next lesson.
    pub fn report_reward(&self, skill: Skill, reward: f32, clock: SimClock) -> Result<bool> {
        if !reward.is_finite() {
            return Err(BipedError::NonFinite(format!("{} curriculum reward", skill.name())));
        }

        let mut table = self.write()?;
        table.release_expired(clock.time);
        if !table.config.enabled {
            return Ok(false);
        }
        if table.locked_until.is_some() {
            trace!(skill = skill.name(), reward, "promotion dropped while locked");
            return Ok(false);
        }

        let lock_duration = table.config.lock_duration_secs;
        let last_change = table.last_change_step.get(skill.index()).copied().unwrap_or(0);
        let curriculum = table.skill_mut(skill)?;
        if reward < curriculum.expert_reward * curriculum.update_on_percentage {
            return Ok(false);
        }
        if let Some(min_steps) = curriculum.minimum_steps_to_reach {
            if clock.step.saturating_sub(last_change) < min_steps {
                trace!(skill = skill.name(), step = clock.step, "promotion below minimum steps");
                return Ok(false);
            }
        }

        curriculum.lesson += 1;
        curriculum.expert_reward = curriculum.expert_reward.max(reward);
        let update = LessonUpdate {
            skill,
            lesson: curriculum.lesson,
            expert_reward: curriculum.expert_reward,
            change: LessonChange::Promoted,
        };
        let complete = curriculum.is_complete_at(curriculum.lesson);

        table.locked_until = Some(clock.time + lock_duration);
        if let Some(step) = table.last_change_step.get_mut(skill.index()) {
            *step = clock.step;
        }
        table.broadcast(update);

        info!(
            skill = skill.name(),
            lesson = update.lesson,
            expert_reward = update.expert_reward,
            "curriculum lesson promoted"
        );
        if complete {
            info!(skill = skill.name(), "curriculum complete, assistance withdrawn");
        }
        Ok(true)
    }

    /// Restart a skill's curriculum from lesson 0
    pub fn reset_curriculum_learning(&self, skill: Skill) -> Result<()> {
        let mut table = self.write()?;
        let curriculum = table.skill_mut(skill)?;
        curriculum.lesson = 0;
        let update = LessonUpdate {
            skill,
            lesson: 0,
            expert_reward: curriculum.expert_reward,
            change: LessonChange::Reset,
        };
        if let Some(step) = table.last_change_step.get_mut(skill.index()) {
            *step = 0;
        }
        table.broadcast(update);
        info!(skill = skill.name(), "curriculum reset to lesson 0");
        Ok(())
    }

    /// Progress of a skill as a serializable snapshot
    pub fn snapshot(&self, skill: Skill) -> Result<CurriculumSnapshot> {
        let table = self.read()?;
        let curriculum = table.config.skill(skill)?;
        Ok(CurriculumSnapshot {
            skill,
            lesson: curriculum.lesson,
            multiplier: curriculum.multiplier(curriculum.lesson, 0),
            expert_reward: curriculum.expert_reward,
        })
    }

    /// Restore progress from a snapshot
    ///
    /// The multiplier is recomputed from the lesson.
    pub fn restore(&self, snapshot: &CurriculumSnapshot) -> Result<()> {
        if !snapshot.expert_reward.is_finite() {
            return Err(BipedError::NonFinite("snapshot expert reward".to_string()));
        }
        let mut table = self.write()?;
        let curriculum = table.skill_mut(snapshot.skill)?;
        curriculum.lesson = snapshot.lesson;
        curriculum.expert_reward = snapshot.expert_reward;
        table.broadcast(LessonUpdate {
            skill: snapshot.skill,
            lesson: snapshot.lesson,
            expert_reward: snapshot.expert_reward,
            change: LessonChange::Restored,
        });
        info!(skill = snapshot.skill.name(), lesson = snapshot.lesson, "curriculum restored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(time: f64, step: u64) -> SimClock {
        SimClock { time, step }
    }

    fn hub_with_expert(expert: f32) -> CurriculumHub {
        let config = CurriculumConfig::default()
            .with_skill(SkillCurriculum::new(Skill::Walk).with_expert_reward(expert));
        CurriculumHub::new(config).unwrap()
    }

    #[test]
    fn test_promotion_threshold() {
        let hub = hub_with_expert(10.0);
        assert!(!hub.report_reward(Skill::Walk, 6.9, clock(0.0, 0)).unwrap());
        assert_eq!(hub.lesson(Skill::Walk).unwrap(), 0);

        assert!(hub.report_reward(Skill::Walk, 7.5, clock(0.0, 0)).unwrap());
        assert_eq!(hub.lesson(Skill::Walk).unwrap(), 1);
        // Expert reward keeps the maximum
        assert_eq!(hub.expert_reward(Skill::Walk).unwrap(), 10.0);
    }

    #[test]
    fn test_expert_reward_raised_by_better_report() {
        let hub = hub_with_expert(10.0);
        assert!(hub.report_reward(Skill::Walk, 12.0, clock(0.0, 0)).unwrap());
        assert_eq!(hub.expert_reward(Skill::Walk).unwrap(), 12.0);
    }

    #[test]
    fn test_lock_drops_promotions_within_cooldown() {
        let hub = hub_with_expert(1.0);
        assert!(hub.report_reward(Skill::Walk, 5.0, clock(1.0, 50)).unwrap());
        assert!(!hub.report_reward(Skill::Walk, 5.0, clock(2.0, 100)).unwrap());
        assert!(!hub.report_reward(Skill::Stand, 5.0, clock(2.9, 145)).unwrap());
        assert_eq!(hub.lesson(Skill::Walk).unwrap(), 1);
        assert_eq!(hub.lesson(Skill::Stand).unwrap(), 0);

        assert!(hub.report_reward(Skill::Walk, 5.0, clock(3.0, 150)).unwrap());
        assert_eq!(hub.lesson(Skill::Walk).unwrap(), 2);
    }

    #[test]
    fn test_release_is_idempotent() {
        let hub = hub_with_expert(1.0);
        assert!(!hub.release_expired(0.0).unwrap());
        hub.report_reward(Skill::Walk, 5.0, clock(0.0, 0)).unwrap();
        assert!(hub.is_locked(1.0).unwrap());
        assert!(!hub.release_expired(1.9).unwrap());
        assert!(hub.release_expired(2.0).unwrap());
        assert!(!hub.release_expired(2.0).unwrap());
        assert!(!hub.release_expired(2.5).unwrap());
        assert!(!hub.is_locked(2.0).unwrap());
    }

    #[test]
    fn test_minimum_steps_between_promotions() {
        let config = CurriculumConfig::default().with_lock_duration(0.0).with_skill(
            SkillCurriculum::new(Skill::Stand).with_minimum_steps_to_reach(100),
        );
        let hub = CurriculumHub::new(config).unwrap();
        assert!(!hub.report_reward(Skill::Stand, 1.0, clock(0.5, 99)).unwrap());
        assert!(hub.report_reward(Skill::Stand, 1.0, clock(0.5, 100)).unwrap());
        assert!(!hub.report_reward(Skill::Stand, 1.0, clock(1.0, 150)).unwrap());
        assert!(hub.report_reward(Skill::Stand, 1.0, clock(1.0, 200)).unwrap());
        assert_eq!(hub.lesson(Skill::Stand).unwrap(), 2);
    }

    #[test]
    fn test_disabled_curriculum_never_promotes() {
        let hub = CurriculumHub::new(CurriculumConfig::default().with_enabled(false)).unwrap();
        assert!(!hub.report_reward(Skill::Walk, 100.0, clock(0.0, 0)).unwrap());
        assert_eq!(hub.lesson(Skill::Walk).unwrap(), 0);
    }

    #[test]
    fn test_non_finite_reward_rejected() {
        let hub = hub_with_expert(1.0);
        let err = hub.report_reward(Skill::Walk, f32::NAN, clock(0.0, 0)).unwrap_err();
        assert!(matches!(err, BipedError::NonFinite(_)));
    }

    #[test]
    fn test_broadcast_reaches_every_subscriber() {
        let hub = hub_with_expert(1.0);
        let first = hub.subscribe().unwrap();
        let second = hub.subscribe().unwrap();
        hub.report_reward(Skill::Walk, 2.0, clock(0.0, 0)).unwrap();

        for rx in [&first, &second] {
            let update = rx.try_recv().unwrap();
            assert_eq!(update.skill, Skill::Walk);
            assert_eq!(update.lesson, 1);
            assert_eq!(update.expert_reward, 2.0);
            assert_eq!(update.change, LessonChange::Promoted);
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let hub = hub_with_expert(1.0);
        let kept = hub.subscribe().unwrap();
        drop(hub.subscribe().unwrap());
        hub.report_reward(Skill::Walk, 2.0, clock(0.0, 0)).unwrap();
        assert_eq!(hub.read().unwrap().subscribers.len(), 1);
        assert!(kept.try_recv().is_ok());
    }

    #[test]
    fn test_reset_curriculum_learning() {
        let hub = hub_with_expert(1.0);
        let rx = hub.subscribe().unwrap();
        hub.report_reward(Skill::Walk, 2.0, clock(0.0, 0)).unwrap();
        hub.reset_curriculum_learning(Skill::Walk).unwrap();
        assert_eq!(hub.lesson(Skill::Walk).unwrap(), 0);

        let updates: Vec<_> = rx.try_iter().collect();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].change, LessonChange::Reset);
        assert_eq!(updates[1].lesson, 0);
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let config = CurriculumConfig::default().with_skill(
            SkillCurriculum::new(Skill::Stand).with_reduction_percentage(0.25).with_expert_reward(3.0),
        );
        let hub = CurriculumHub::new(config.clone()).unwrap();
        hub.report_reward(Skill::Stand, 4.0, clock(0.0, 0)).unwrap();
        let snapshot = hub.snapshot(Skill::Stand).unwrap();
        assert_eq!(snapshot.lesson, 1);
        assert!((snapshot.multiplier - 0.75).abs() < 1e-6);

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: CurriculumSnapshot = serde_json::from_str(&json).unwrap();

        let fresh = CurriculumHub::new(config).unwrap();
        fresh.restore(&parsed).unwrap();
        assert_eq!(fresh.snapshot(Skill::Stand).unwrap(), snapshot);
    }

    #[test]
    fn test_shared_between_threads() {
        let hub = hub_with_expert(1.0);
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let hub = hub.clone();
                std::thread::spawn(move || hub.report_reward(Skill::Walk, 2.0, clock(0.1, i)))
            })
            .collect();
        let promotions = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .filter(|promoted| *promoted)
            .count();
        assert_eq!(promotions, 1);
        assert_eq!(hub.lesson(Skill::Walk).unwrap(), 1);
    }
}
