//! Action vector layout
//!
//! The policy emits 21 continuous values: normalized joint target rotations
//! for every actuated joint, followed by one strength value per joint.
//!
//! | index | slot |
//! |-------|------|
//! | 0-1   | Body target x, y |
//! | 2-3   | ThighL target x, y |
//! | 4-5   | ThighR target x, y |
//! | 6     | ShinL target x |
//! | 7     | ShinR target x |
//! | 8-10  | FootR target x, y, z |
//! | 11-13 | FootL target x, y, z |
//! | 14-20 | strength of Body, ThighL, ShinL, FootL, ThighR, ShinR, FootR |

use super::{BodyPartId, Skeleton};
use crate::error::{BipedError, Result};

/// Length of the action vector
pub const ACTION_SIZE: usize = 21;

/// What one element of the action vector drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionSlot {
    /// One axis of a joint target rotation
    Target {
        /// Driven part
        part: BodyPartId,
        /// Axis index (0 = x, 1 = y, 2 = z)
        axis: usize,
    },
    /// Joint strength
    Strength {
        /// Driven part
        part: BodyPartId,
    },
}

impl ActionSlot {
    /// Part whose joint this slot drives
    pub fn part(self) -> BodyPartId {
        match self {
            ActionSlot::Target { part, .. } | ActionSlot::Strength { part } => part,
        }
    }
}

const fn target(part: BodyPartId, axis: usize) -> ActionSlot {
    ActionSlot::Target { part, axis }
}

const fn strength(part: BodyPartId) -> ActionSlot {
    ActionSlot::Strength { part }
}

/// Slot driven by each action index
pub const ACTION_LAYOUT: [ActionSlot; ACTION_SIZE] = [
    target(BodyPartId::Body, 0),
    target(BodyPartId::Body, 1),
    target(BodyPartId::ThighL, 0),
    target(BodyPartId::ThighL, 1),
    target(BodyPartId::ThighR, 0),
    target(BodyPartId::ThighR, 1),
    target(BodyPartId::ShinL, 0),
    target(BodyPartId::ShinR, 0),
    target(BodyPartId::FootR, 0),
    target(BodyPartId::FootR, 1),
    target(BodyPartId::FootR, 2),
    target(BodyPartId::FootL, 0),
    target(BodyPartId::FootL, 1),
    target(BodyPartId::FootL, 2),
    strength(BodyPartId::Body),
    strength(BodyPartId::ThighL),
    strength(BodyPartId::ShinL),
    strength(BodyPartId::FootL),
    strength(BodyPartId::ThighR),
    strength(BodyPartId::ShinR),
    strength(BodyPartId::FootR),
];

/// Parts with an actuated joint
pub const ACTUATED_PARTS: [BodyPartId; 7] = [
    BodyPartId::Body,
    BodyPartId::ThighL,
    BodyPartId::ShinL,
    BodyPartId::FootL,
    BodyPartId::ThighR,
    BodyPartId::ShinR,
    BodyPartId::FootR,
];

/// Reject action vectors of the wrong length or with non-finite values
pub fn validate_action(action: &[f32]) -> Result<()> {
    if action.len() != ACTION_SIZE {
        return Err(BipedError::InvalidAction { expected: ACTION_SIZE, got: action.len() });
    }
    if let Some((index, &value)) = action.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(BipedError::NonFiniteAction { index, value });
    }
    Ok(())
}

/// Write a validated action vector into the skeleton's joint commands
///
/// Target axes a joint does not expose are set to 0. All values are clamped
/// to [-1, 1].
pub fn apply_action(skeleton: &mut Skeleton, action: &[f32]) -> Result<()> {
    validate_action(action)?;

    let mut targets = [[0.0_f32; 3]; BodyPartId::COUNT];
    for (slot, &value) in ACTION_LAYOUT.iter().zip(action) {
        match *slot {
            ActionSlot::Target { part, axis } => targets[part.index()][axis] = value,
            ActionSlot::Strength { part } => skeleton.part_mut(part).set_strength(value),
        }
    }
    for part in ACTUATED_PARTS {
        let [x, y, z] = targets[part.index()];
        skeleton.part_mut(part).set_joint_target(x, y, z);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyState;

    fn skeleton() -> Skeleton {
        Skeleton::from_rest_states([BodyState::default(); BodyPartId::COUNT])
    }

    #[test]
    fn test_layout_covers_every_actuated_part() {
        for part in ACTUATED_PARTS {
            assert!(ACTION_LAYOUT.iter().any(|s| *s == ActionSlot::Strength { part }));
            assert!(ACTION_LAYOUT
                .iter()
                .any(|s| matches!(s, ActionSlot::Target { part: p, .. } if *p == part)));
        }
        assert!(ACTION_LAYOUT.iter().all(|s| s.part() != BodyPartId::Hips));
    }

    #[test]
    fn test_validate_rejects_wrong_length() {
        let err = validate_action(&[0.0; 5]).unwrap_err();
        assert_eq!(err, BipedError::InvalidAction { expected: ACTION_SIZE, got: 5 });

        let err = validate_action(&[0.0; ACTION_SIZE + 1]).unwrap_err();
        assert_eq!(err, BipedError::InvalidAction { expected: ACTION_SIZE, got: 22 });
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut action = vec![0.0; ACTION_SIZE];
        action[7] = f32::NAN;
        match validate_action(&action).unwrap_err() {
            BipedError::NonFiniteAction { index, .. } => assert_eq!(index, 7),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_apply_action_routes_slots() {
        let mut skeleton = skeleton();
        let mut action = vec![0.0; ACTION_SIZE];
        action[0] = 0.5; // Body x
        action[1] = -0.25; // Body y
        action[6] = 2.0; // ShinL x, clamped
        action[11] = 0.1; // FootL x
        action[13] = 0.3; // FootL z
        action[14] = 1.0; // Body strength
        action[16] = -1.0; // ShinL strength

        apply_action(&mut skeleton, &action).unwrap();

        assert_eq!(skeleton.part(BodyPartId::Body).joint_target, [0.5, -0.25, 0.0]);
        assert_eq!(skeleton.part(BodyPartId::ShinL).joint_target, [1.0, 0.0, 0.0]);
        assert_eq!(skeleton.part(BodyPartId::FootL).joint_target, [0.1, 0.0, 0.3]);
        assert_eq!(skeleton.part(BodyPartId::Body).strength, 1.0);
        assert_eq!(skeleton.part(BodyPartId::ShinL).strength, 0.0);
        assert!((skeleton.part(BodyPartId::FootR).strength - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_apply_action_leaves_skeleton_untouched_on_error() {
        let mut skeleton = skeleton();
        let before = skeleton.clone();
        assert!(apply_action(&mut skeleton, &[1.0; 3]).is_err());
        assert_eq!(skeleton, before);
    }
}
