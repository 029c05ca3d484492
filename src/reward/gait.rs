//! Gait phase tracking
//!
//! Rewards strict left/right alternation of foot strikes together with a wide
//! thigh swing between strikes. Each tick the tracker receives the two foot
//! contact flags and a swing-alignment sample per thigh:
//!
//! - both feet down: phase becomes [`GaitPhase::Neutral`], the bonus drops to
//!   0 and both swing ranges restart from this tick's samples
//! - otherwise both swing samples are folded into their leg's running range
//! - contacts unchanged since the last tick: the stored bonus decays by
//!   [`PHASE_DECAY`] and the decayed value is returned
//! - a new foot strike on the leg that is already in stance earns nothing
//! - a strike on the other leg earns [`calc_phase_bonus`] over that leg's
//!   range plus [`PHASE_BOOTSTRAP_BONUS`], switches phase and restarts that
//!   leg's range from the current sample

use std::f32::consts::PI;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::body::{BodyPartId, Skeleton};

/// Per-tick decay of the stored phase bonus while no foot strike happens
pub const PHASE_DECAY: f32 = 0.9;

/// Fixed bonus added on every alternating foot strike
pub const PHASE_BOOTSTRAP_BONUS: f32 = 0.1;

/// Which foot is in stance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GaitPhase {
    /// Both feet down, or no stance established yet
    #[default]
    Neutral,
    /// Left foot carries the body
    LeftStance,
    /// Right foot carries the body
    RightStance,
}

/// Ground contact of both feet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FootContact {
    /// Left foot touches the ground
    pub left: bool,
    /// Right foot touches the ground
    pub right: bool,
}

impl FootContact {
    /// Create a contact sample
    pub fn new(left: bool, right: bool) -> Self {
        Self { left, right }
    }

    /// Read both foot contact flags from the skeleton
    pub fn from_skeleton(skeleton: &Skeleton) -> Self {
        Self {
            left: skeleton.state(BodyPartId::FootL).ground_contact,
            right: skeleton.state(BodyPartId::FootR).ground_contact,
        }
    }
}

/// Running min/max of a leg's swing-alignment samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingRange {
    /// Smallest sample since the last reset
    pub min: f32,
    /// Largest sample since the last reset
    pub max: f32,
}

impl SwingRange {
    /// Range with no samples
    pub fn empty() -> Self {
        Self { min: f32::INFINITY, max: f32::NEG_INFINITY }
    }

    /// Range holding a single sample
    pub fn seeded(sample: f32) -> Self {
        Self { min: sample, max: sample }
    }

    /// Fold in one sample
    pub fn observe(&mut self, sample: f32) {
        self.min = self.min.min(sample);
        self.max = self.max.max(sample);
    }

    /// Whether no sample was observed yet
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }
}

impl Default for SwingRange {
    fn default() -> Self {
        Self::empty()
    }
}

/// Bonus for the swing excursion of one stance cycle
///
/// - both bounds negative: the range is mirrored to positive values
/// - only `min` negative: `|min|` is credited and `min` clamps to 0
/// - result is the credit plus `max - min`
///
/// An empty range (no samples) earns nothing.
pub fn calc_phase_bonus(min: f32, max: f32) -> f32 {
    if !min.is_finite() || !max.is_finite() || min > max {
        return 0.0;
    }
    let (mut bonus, low, high) = if max < 0.0 {
        (0.0, max.abs(), min.abs())
    } else if min < 0.0 {
        (min.abs(), 0.0, max)
    } else {
        (0.0, min, max)
    };
    bonus += high - low;
    bonus
}

/// Swing-alignment sample of a thigh, in [-1, 1]
///
/// The thigh's local backward axis is rotated by its focal rotation and
/// compared against world up: 1 when it points straight down, -1 straight
/// up, 0 when horizontal.
pub fn swing_alignment(skeleton: &Skeleton, thigh: BodyPartId) -> f32 {
    let part = skeleton.part(thigh);
    let backward = part.focal_rotation() * -part.state.forward();
    let from_up = backward.angle(&Vector3::y());
    let q = ((PI - from_up) / PI).clamp(0.0, 1.0);
    1.0 - 2.0 * q
}

/// State machine producing the anti-phase gait bonus
#[derive(Debug, Clone, PartialEq)]
pub struct GaitPhaseTracker {
    phase: GaitPhase,
    left: SwingRange,
    right: SwingRange,
    last_contact: FootContact,
    phase_bonus: f32,
    phase_changed: bool,
}

impl GaitPhaseTracker {
    /// Tracker in the neutral phase with no contact history
    pub fn new() -> Self {
        Self {
            phase: GaitPhase::Neutral,
            left: SwingRange::empty(),
            right: SwingRange::empty(),
            last_contact: FootContact::default(),
            phase_bonus: 0.0,
            phase_changed: false,
        }
    }

    /// Forget all history; called on every rollout reset
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Advance one tick and return the phase bonus for it
    ///
    /// # Arguments
    /// * `contact` - Current foot contacts
    /// * `swing_left` - Swing-alignment sample of the left thigh
    /// * `swing_right` - Swing-alignment sample of the right thigh
    pub fn update(&mut self, contact: FootContact, swing_left: f32, swing_right: f32) -> f32 {
        self.phase_changed = contact != self.last_contact;
        self.last_contact = contact;

        if contact.left && contact.right {
            self.phase = GaitPhase::Neutral;
            self.phase_bonus = 0.0;
            self.left = SwingRange::seeded(swing_left);
            self.right = SwingRange::seeded(swing_right);
            return self.phase_bonus;
        }

        self.left.observe(swing_left);
        self.right.observe(swing_right);

        if !self.phase_changed {
            self.phase_bonus *= PHASE_DECAY;
            return self.phase_bonus;
        }

        self.phase_bonus = 0.0;
        if contact.left {
            if self.phase != GaitPhase::LeftStance {
                self.phase_bonus =
                    calc_phase_bonus(self.left.min, self.left.max) + PHASE_BOOTSTRAP_BONUS;
            }
            self.phase = GaitPhase::LeftStance;
            self.left = SwingRange::seeded(swing_left);
        } else if contact.right {
            if self.phase != GaitPhase::RightStance {
                self.phase_bonus =
                    calc_phase_bonus(self.right.min, self.right.max) + PHASE_BOOTSTRAP_BONUS;
            }
            self.phase = GaitPhase::RightStance;
            self.right = SwingRange::seeded(swing_right);
        }
        self.phase_bonus
    }

    /// Read contacts and thigh swing from the skeleton and advance one tick
    pub fn update_from_skeleton(&mut self, skeleton: &Skeleton) -> f32 {
        self.update(
            FootContact::from_skeleton(skeleton),
            swing_alignment(skeleton, BodyPartId::ThighL),
            swing_alignment(skeleton, BodyPartId::ThighR),
        )
    }

    /// Current stance phase
    pub fn phase(&self) -> GaitPhase {
        self.phase
    }

    /// Stored (already decayed) phase bonus
    pub fn phase_bonus(&self) -> f32 {
        self.phase_bonus
    }

    /// Whether the contacts changed on the last update
    pub fn phase_changed(&self) -> bool {
        self.phase_changed
    }

    /// Swing range of the left leg for the current cycle
    pub fn left_range(&self) -> SwingRange {
        self.left
    }

    /// Swing range of the right leg for the current cycle
    pub fn right_range(&self) -> SwingRange {
        self.right
    }
}

impl Default for GaitPhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyState;
    use nalgebra::UnitQuaternion;

    const DOWN: bool = true;
    const UP: bool = false;

    #[test]
    fn test_calc_phase_bonus_cases() {
        assert!((calc_phase_bonus(-0.3, 0.6) - 0.9).abs() < 1e-6);
        assert!((calc_phase_bonus(0.2, 0.5) - 0.3).abs() < 1e-6);
        assert!((calc_phase_bonus(-0.5, -0.2) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_calc_phase_bonus_is_never_negative() {
        let samples = [-1.0, -0.6, -0.1, 0.0, 0.3, 0.8, 1.0];
        for &min in &samples {
            for &max in &samples {
                if min <= max {
                    assert!(calc_phase_bonus(min, max) >= 0.0, "min {} max {}", min, max);
                }
            }
        }
    }

    #[test]
    fn test_calc_phase_bonus_empty_range() {
        let range = SwingRange::empty();
        assert!(range.is_empty());
        assert_eq!(calc_phase_bonus(range.min, range.max), 0.0);
    }

    #[test]
    fn test_alternating_sequence() {
        let mut tracker = GaitPhaseTracker::new();

        // Both feet down: no bonus, ranges restart from the current pose
        assert_eq!(tracker.update(FootContact::new(DOWN, DOWN), 0.9, 0.9), 0.0);
        assert_eq!(tracker.phase(), GaitPhase::Neutral);
        assert_eq!(tracker.left_range(), SwingRange::seeded(0.9));
        assert_eq!(tracker.right_range(), SwingRange::seeded(0.9));

        // Left strike over [0.2, 0.9]
        let bonus = tracker.update(FootContact::new(DOWN, UP), 0.2, -0.3);
        assert!((bonus - (0.7 + PHASE_BOOTSTRAP_BONUS)).abs() < 1e-6);
        assert_eq!(tracker.phase(), GaitPhase::LeftStance);
        assert_eq!(tracker.left_range(), SwingRange::seeded(0.2));

        // Right strike over [-0.3, 0.9]: 0.3 credit plus 0.9 excursion
        let bonus = tracker.update(FootContact::new(UP, DOWN), 0.5, 0.6);
        assert!((bonus - (1.2 + PHASE_BOOTSTRAP_BONUS)).abs() < 1e-6);
        assert_eq!(tracker.phase(), GaitPhase::RightStance);
        assert_eq!(tracker.right_range(), SwingRange::seeded(0.6));
        assert_eq!(tracker.left_range(), SwingRange { min: 0.2, max: 0.5 });

        // Double support resets the bonus to exactly zero
        assert_eq!(tracker.update(FootContact::new(DOWN, DOWN), 0.0, 0.0), 0.0);
        assert_eq!(tracker.phase(), GaitPhase::Neutral);
        assert_eq!(tracker.phase_bonus(), 0.0);
    }

    #[test]
    fn test_strike_after_double_support_counts_stance_pose() {
        let mut tracker = GaitPhaseTracker::new();
        tracker.update(FootContact::new(DOWN, DOWN), 0.8, 0.8);

        // Right range spans the double-support pose and this tick: [0.2, 0.8]
        let bonus = tracker.update(FootContact::new(UP, DOWN), 0.0, 0.2);
        assert!((bonus - (0.6 + PHASE_BOOTSTRAP_BONUS)).abs() < 1e-6);
        assert_eq!(tracker.left_range(), SwingRange { min: 0.0, max: 0.8 });
    }

    #[test]
    fn test_bonus_decays_in_place_without_strike() {
        let mut tracker = GaitPhaseTracker::new();
        tracker.update(FootContact::new(UP, DOWN), -0.4, 0.4);
        let first = tracker.phase_bonus();
        assert!(first > 0.0);

        let second = tracker.update(FootContact::new(UP, DOWN), 0.0, 0.0);
        assert!((second - first * PHASE_DECAY).abs() < 1e-6);
        assert!((tracker.phase_bonus() - second).abs() < 1e-9, "stored value decays too");

        let third = tracker.update(FootContact::new(UP, DOWN), 0.0, 0.0);
        assert!((third - first * PHASE_DECAY * PHASE_DECAY).abs() < 1e-6);
    }

    #[test]
    fn test_stalled_ticks_return_stored_value() {
        let mut tracker = GaitPhaseTracker::new();
        tracker.update(FootContact::new(DOWN, DOWN), -0.5, -0.5);
        let first = tracker.update(FootContact::new(DOWN, UP), 0.5, 0.0);
        assert!((first - (1.0 + PHASE_BOOTSTRAP_BONUS)).abs() < 1e-6);

        let mut expected = first;
        for tick in 1..=6 {
            expected *= PHASE_DECAY;
            let returned = tracker.update(FootContact::new(DOWN, UP), 0.0, 0.0);
            assert!((returned - expected).abs() < 1e-6, "tick {}", tick);
            assert_eq!(returned, tracker.phase_bonus(), "tick {}", tick);
            assert!(!tracker.phase_changed());
        }
        assert!((expected - first * PHASE_DECAY.powi(6)).abs() < 1e-6);
    }

    #[test]
    fn test_same_leg_strike_earns_nothing() {
        let mut tracker = GaitPhaseTracker::new();
        tracker.update(FootContact::new(DOWN, UP), 0.1, 0.1);
        assert_eq!(tracker.phase(), GaitPhase::LeftStance);

        // Hop: left foot lifts and lands again
        assert_eq!(tracker.update(FootContact::new(UP, UP), -0.5, 0.0), 0.0);
        assert_eq!(tracker.phase(), GaitPhase::LeftStance);
        assert_eq!(tracker.update(FootContact::new(DOWN, UP), 0.5, 0.0), 0.0);
        assert_eq!(tracker.phase(), GaitPhase::LeftStance);

        // Nothing left to decay while the stance holds
        for _ in 0..3 {
            assert_eq!(tracker.update(FootContact::new(DOWN, UP), 0.9, 0.9), 0.0);
            assert_eq!(tracker.phase_bonus(), 0.0);
        }
    }

    #[test]
    fn test_zero_after_double_support_until_next_strike() {
        let mut tracker = GaitPhaseTracker::new();
        tracker.update(FootContact::new(UP, DOWN), -0.4, 0.4);
        assert!(tracker.phase_bonus() > 0.0);

        for _ in 0..3 {
            assert_eq!(tracker.update(FootContact::new(DOWN, DOWN), 0.3, 0.3), 0.0);
            assert_eq!(tracker.phase_bonus(), 0.0);
        }

        // Both feet lift: contacts change but no foot strikes
        assert_eq!(tracker.update(FootContact::new(UP, UP), 0.3, 0.3), 0.0);
        assert_eq!(tracker.update(FootContact::new(UP, UP), 0.3, 0.3), 0.0);
        assert_eq!(tracker.phase(), GaitPhase::Neutral);

        // Left range [-0.2, 0.3]: 0.2 credit plus 0.3 excursion
        let strike = tracker.update(FootContact::new(DOWN, UP), -0.2, 0.3);
        assert!((strike - (0.5 + PHASE_BOOTSTRAP_BONUS)).abs() < 1e-6);
        let stalled = tracker.update(FootContact::new(DOWN, UP), 0.0, 0.0);
        assert!((stalled - strike * PHASE_DECAY).abs() < 1e-6);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut tracker = GaitPhaseTracker::new();
        tracker.update(FootContact::new(DOWN, UP), 0.1, 0.1);
        tracker.reset();
        assert_eq!(tracker, GaitPhaseTracker::new());
    }

    #[test]
    fn test_swing_alignment_range() {
        let mut skeleton = Skeleton::from_rest_states([BodyState::default(); BodyPartId::COUNT]);
        // Facing forward: backward axis is horizontal
        assert!(swing_alignment(&skeleton, BodyPartId::ThighL).abs() < 1e-6);

        // Pitch the thigh so its forward axis points up: backward points down
        skeleton.part_mut(BodyPartId::ThighL).state.orientation =
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -std::f32::consts::FRAC_PI_2);
        assert!((swing_alignment(&skeleton, BodyPartId::ThighL) - 1.0).abs() < 1e-4);

        skeleton.part_mut(BodyPartId::ThighL).state.orientation =
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f32::consts::FRAC_PI_2);
        assert!((swing_alignment(&skeleton, BodyPartId::ThighL) + 1.0).abs() < 1e-4);
    }
}
