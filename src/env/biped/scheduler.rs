//! Skill scheduling
//!
//! Decides which skill an agent practises. A [`SkillSchedule::Staged`]
//! schedule trains walking, then standing, then hands over to the random
//! [`HeuristicSkillSelector`] and asks once for a curriculum restart.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{BipedError, Result};
use crate::skill::Skill;

/// Shortest hold of a heuristically chosen skill (ticks)
pub const MIN_HOLD_STEPS: u32 = 40;

/// Range of the random extra hold (ticks)
pub const HOLD_JITTER_STEPS: u32 = 200;

/// Probability of picking Walk on a fresh choice
pub const WALK_PROBABILITY: f32 = 0.7;

/// Probability of keeping a non-stand skill when its hold expires
pub const REPEAT_PROBABILITY: f32 = 0.4;

/// How the active skill evolves over training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SkillSchedule {
    /// Keep the skill set by the caller
    #[default]
    Fixed,
    /// Walk, then stand, then switch skills heuristically
    Staged {
        /// Ticks spent training Walk
        walk_steps: u64,
        /// Ticks spent training Stand afterwards
        stand_steps: u64,
    },
    /// Switch skills heuristically from the start
    Heuristic,
}

impl SkillSchedule {
    /// Validate the schedule
    pub fn validate(&self) -> Result<()> {
        match self {
            SkillSchedule::Staged { walk_steps, stand_steps }
                if walk_steps.checked_add(*stand_steps).is_none() =>
            {
                Err(BipedError::InvalidConfig("staged schedule overflows".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// Skill change requested by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillRequest {
    /// Skill to switch to
    pub skill: Skill,
    /// Restart the new skill's curriculum from lesson 0
    pub reset_curriculum: bool,
}

/// Random skill selector holding each choice for 40 to 239 ticks
///
/// A failed stand rollout ends the hold early.
#[derive(Debug, Clone)]
pub struct HeuristicSkillSelector {
    current: Skill,
    hold_remaining: i64,
    rng: StdRng,
}

impl HeuristicSkillSelector {
    /// Selector seeded from system entropy
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic selector
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self { current: Skill::Stand, hold_remaining: 0, rng }
    }

    /// Skill chosen last
    pub fn current(&self) -> Skill {
        self.current
    }

    /// Ticks left before the next choice
    pub fn hold_remaining(&self) -> i64 {
        self.hold_remaining
    }

    /// Advance one tick and return the skill to practise
    pub fn decide(&mut self, stand_failed: bool) -> Skill {
        self.hold_remaining -= 1;
        if stand_failed {
            self.hold_remaining = 0;
        }
        if self.hold_remaining <= 0 {
            let repeat = self.current != Skill::Stand
                && self.rng.gen::<f32>() < REPEAT_PROBABILITY;
            if !repeat {
                self.current = if self.rng.gen::<f32>() < WALK_PROBABILITY {
                    Skill::Walk
                } else {
                    Skill::Stand
                };
            }
            self.hold_remaining =
                i64::from(MIN_HOLD_STEPS + self.rng.gen_range(0..HOLD_JITTER_STEPS));
        }
        self.current
    }
}

impl Default for HeuristicSkillSelector {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies a [`SkillSchedule`] tick by tick
#[derive(Debug, Clone)]
pub struct SkillScheduler {
    schedule: SkillSchedule,
    selector: HeuristicSkillSelector,
    multi_skill: bool,
    pending_reset: bool,
    stand_failed: bool,
}

impl SkillScheduler {
    /// Scheduler with an entropy-seeded selector
    pub fn new(schedule: SkillSchedule) -> Self {
        Self::with_selector(schedule, HeuristicSkillSelector::new())
    }

    /// Scheduler with an explicit selector
    pub fn with_selector(schedule: SkillSchedule, selector: HeuristicSkillSelector) -> Self {
        Self {
            schedule,
            selector,
            multi_skill: matches!(schedule, SkillSchedule::Heuristic),
            pending_reset: false,
            stand_failed: false,
        }
    }

    /// Schedule in use
    pub fn schedule(&self) -> SkillSchedule {
        self.schedule
    }

    /// Whether skills are chosen heuristically
    pub fn is_multi_skill(&self) -> bool {
        self.multi_skill
    }

    /// Note an episode reset while `skill` was active
    ///
    /// A reset during Stand counts as a failed stand and triggers a new
    /// heuristic choice.
    pub fn on_reset(&mut self, skill: Skill) {
        self.stand_failed = skill == Skill::Stand;
    }

    /// Skill change for the tick at `total_steps`, if any
    pub fn next(&mut self, total_steps: u64, current: Skill) -> Option<SkillRequest> {
        if !self.multi_skill {
            match self.schedule {
                SkillSchedule::Fixed | SkillSchedule::Heuristic => return None,
                SkillSchedule::Staged { walk_steps, stand_steps } => {
                    if total_steps <= walk_steps {
                        return request(Skill::Walk, current, false);
                    }
                    if total_steps <= walk_steps.saturating_add(stand_steps) {
                        return request(Skill::Stand, current, false);
                    }
                    self.multi_skill = true;
                    self.pending_reset = true;
                }
            }
        }

        let stand_failed = std::mem::take(&mut self.stand_failed);
        let skill = self.selector.decide(stand_failed);
        let change = request(skill, current, self.pending_reset);
        if change.is_some() {
            self.pending_reset = false;
        }
        change
    }
}

fn request(skill: Skill, current: Skill, reset_curriculum: bool) -> Option<SkillRequest> {
    (skill != current).then_some(SkillRequest { skill, reset_curriculum })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_schedule_never_requests() {
        let mut scheduler = SkillScheduler::new(SkillSchedule::Fixed);
        for step in 0..100 {
            assert_eq!(scheduler.next(step, Skill::Walk), None);
        }
    }

    #[test]
    fn test_staged_schedule_phases() {
        let schedule = SkillSchedule::Staged { walk_steps: 10, stand_steps: 5 };
        let mut scheduler = SkillScheduler::with_selector(schedule, HeuristicSkillSelector::seeded(7));

        assert_eq!(
            scheduler.next(0, Skill::Stand),
            Some(SkillRequest { skill: Skill::Walk, reset_curriculum: false })
        );
        assert_eq!(scheduler.next(10, Skill::Walk), None);
        assert_eq!(
            scheduler.next(11, Skill::Walk),
            Some(SkillRequest { skill: Skill::Stand, reset_curriculum: false })
        );
        assert_eq!(scheduler.next(15, Skill::Stand), None);
        assert!(!scheduler.is_multi_skill());

        scheduler.next(16, Skill::Stand);
        assert!(scheduler.is_multi_skill());
    }

    #[test]
    fn test_staged_reset_requested_once() {
        let schedule = SkillSchedule::Staged { walk_steps: 0, stand_steps: 0 };
        let mut scheduler = SkillScheduler::with_selector(schedule, HeuristicSkillSelector::seeded(3));

        let mut current = Skill::Stand;
        let mut resets = 0;
        let mut changes = 0;
        for step in 1..5000 {
            if let Some(request) = scheduler.next(step, current) {
                current = request.skill;
                changes += 1;
                resets += usize::from(request.reset_curriculum);
                if changes == 1 {
                    assert!(request.reset_curriculum);
                }
            }
        }
        assert!(changes > 1);
        assert_eq!(resets, 1);
    }

    #[test]
    fn test_selector_holds_choice() {
        let mut selector = HeuristicSkillSelector::seeded(11);
        let first = selector.decide(false);
        let hold = selector.hold_remaining();
        assert!((i64::from(MIN_HOLD_STEPS)..i64::from(MIN_HOLD_STEPS + HOLD_JITTER_STEPS))
            .contains(&hold));
        for _ in 1..hold {
            assert_eq!(selector.decide(false), first);
        }
    }

    #[test]
    fn test_failed_stand_forces_new_choice() {
        let mut selector = HeuristicSkillSelector::seeded(5);
        // Every failure draws a fresh hold instead of counting down
        for _ in 0..300 {
            selector.decide(true);
            assert!(selector.hold_remaining() >= i64::from(MIN_HOLD_STEPS));
        }
    }

    #[test]
    fn test_selector_prefers_walk() {
        let mut selector = HeuristicSkillSelector::seeded(42);
        let mut walks = 0;
        let choices = 2000;
        for _ in 0..choices {
            if selector.decide(true) == Skill::Walk {
                walks += 1;
            }
        }
        let ratio = walks as f32 / choices as f32;
        assert!(ratio > 0.6 && ratio < 0.95, "walk ratio {}", ratio);
    }

    #[test]
    fn test_schedule_validation() {
        assert!(SkillSchedule::Staged { walk_steps: u64::MAX, stand_steps: 1 }.validate().is_err());
        assert!(SkillSchedule::Heuristic.validate().is_ok());
    }
}
