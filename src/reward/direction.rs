//! Directional alignment bonus
//!
//! A body axis is first rotated by the part's focal rotation, then compared
//! with a world direction. The undirected angle between the two, normalized
//! to `q` in [0, 1], maps linearly onto `[max_bonus, -max_bonus]`:
//!
//! ```text
//! bonus = max_bonus * (1 - 2q),   q = angle / 180°
//! ```
//!
//! Parallel axes give `+max_bonus`, perpendicular give 0 and antiparallel
//! give `-max_bonus`.

use std::f32::consts::PI;

use nalgebra::{Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::body::{BodyPartId, Skeleton};

/// Bonus scale used by every shaped term unless stated otherwise
pub const DEFAULT_MAX_BONUS: f32 = 0.5;

/// World directions the reward measures alignment against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Heading {
    /// World +Z
    Forward,
    /// World -Z
    Backward,
    /// World -X
    Left,
    /// World +X
    Right,
    /// World +Y
    Up,
}

impl Heading {
    /// Unit vector of this heading
    pub fn vector(self) -> Unit<Vector3<f32>> {
        match self {
            Heading::Forward => Vector3::z_axis(),
            Heading::Backward => Unit::new_unchecked(-Vector3::z()),
            Heading::Left => Unit::new_unchecked(-Vector3::x()),
            Heading::Right => Vector3::x_axis(),
            Heading::Up => Vector3::y_axis(),
        }
    }
}

/// Alignment bonus between a focal-rotated body axis and a world direction
///
/// # Arguments
/// * `focal` - Focal rotation of the part
/// * `body_axis` - Part axis in world space (e.g. its current forward)
/// * `direction` - World direction to align with
/// * `max_bonus` - Bonus at perfect alignment
///
/// # Returns
/// A value in `[-max_bonus, max_bonus]`
pub fn direction_bonus(
    focal: &UnitQuaternion<f32>,
    body_axis: &Vector3<f32>,
    direction: &Unit<Vector3<f32>>,
    max_bonus: f32,
) -> f32 {
    let reference = focal * body_axis;
    let q = (reference.angle(&direction.into_inner()) / PI).clamp(0.0, 1.0);
    max_bonus * (1.0 - 2.0 * q)
}

/// Bonus for a part's axis pointing along `heading`
///
/// The part's local up axis is used for [`Heading::Up`]; every other heading
/// is measured with the local forward axis.
pub fn part_bonus(skeleton: &Skeleton, part: BodyPartId, heading: Heading, max_bonus: f32) -> f32 {
    let part = skeleton.part(part);
    let axis = match heading {
        Heading::Up => part.state.up(),
        _ => part.state.forward(),
    };
    direction_bonus(part.focal_rotation(), &axis, &heading.vector(), max_bonus)
}

/// Bonus for keeping a part upright, in [-0.5, 0.5]
pub fn upright_bonus(skeleton: &Skeleton, part: BodyPartId) -> f32 {
    part_bonus(skeleton, part, Heading::Up, DEFAULT_MAX_BONUS)
}

/// Bonus for a part facing world forward, in [-0.5, 0.5]
pub fn forward_bonus(skeleton: &Skeleton, part: BodyPartId) -> f32 {
    part_bonus(skeleton, part, Heading::Forward, DEFAULT_MAX_BONUS)
}

/// Bonus for a part facing world backward, in [-0.5, 0.5]
pub fn backward_bonus(skeleton: &Skeleton, part: BodyPartId) -> f32 {
    part_bonus(skeleton, part, Heading::Backward, DEFAULT_MAX_BONUS)
}

/// Bonus for a part facing world left, in [-0.5, 0.5]
pub fn left_bonus(skeleton: &Skeleton, part: BodyPartId) -> f32 {
    part_bonus(skeleton, part, Heading::Left, DEFAULT_MAX_BONUS)
}

/// Bonus for a part facing world right, in [-0.5, 0.5]
pub fn right_bonus(skeleton: &Skeleton, part: BodyPartId) -> f32 {
    part_bonus(skeleton, part, Heading::Right, DEFAULT_MAX_BONUS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyState;

    fn sample_rotations() -> Vec<UnitQuaternion<f32>> {
        vec![
            UnitQuaternion::identity(),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.4),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 2.1),
            UnitQuaternion::from_euler_angles(0.3, -1.2, 2.5),
            UnitQuaternion::from_euler_angles(-2.0, 0.7, -0.1),
        ]
    }

    fn sample_axes() -> Vec<Vector3<f32>> {
        vec![
            Vector3::x(),
            Vector3::y(),
            -Vector3::z(),
            Vector3::new(0.3, -0.4, 0.866),
            Vector3::new(-1.0, 2.0, 0.5),
        ]
    }

    #[test]
    fn test_bonus_bounded() {
        for focal in sample_rotations() {
            for axis in sample_axes() {
                for heading in
                    [Heading::Forward, Heading::Backward, Heading::Left, Heading::Right, Heading::Up]
                {
                    let bonus = direction_bonus(&focal, &axis, &heading.vector(), 0.5);
                    assert!((-0.5..=0.5).contains(&bonus), "bonus {} out of range", bonus);
                }
            }
        }
    }

    #[test]
    fn test_bonus_extremes() {
        for focal in sample_rotations() {
            for axis in sample_axes() {
                let reference = Unit::new_normalize(focal * axis);
                let parallel = direction_bonus(&focal, &axis, &reference, 0.5);
                let opposite = Unit::new_unchecked(-reference.into_inner());
                let antiparallel = direction_bonus(&focal, &axis, &opposite, 0.5);
                assert!((parallel - 0.5).abs() < 1e-3, "parallel bonus {}", parallel);
                assert!((antiparallel + 0.5).abs() < 1e-3, "antiparallel bonus {}", antiparallel);
            }
        }
    }

    #[test]
    fn test_bonus_zero_at_right_angle() {
        let bonus =
            direction_bonus(&UnitQuaternion::identity(), &Vector3::x(), &Vector3::z_axis(), 0.5);
        assert!(bonus.abs() < 1e-6);
    }

    #[test]
    fn test_bonus_scales_with_max_bonus() {
        let bonus =
            direction_bonus(&UnitQuaternion::identity(), &Vector3::z(), &Vector3::z_axis(), 2.0);
        assert!((bonus - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_part_bonuses_for_upright_skeleton() {
        let skeleton = Skeleton::from_rest_states([BodyState::default(); BodyPartId::COUNT]);
        assert!((upright_bonus(&skeleton, BodyPartId::Hips) - 0.5).abs() < 1e-6);
        assert!((forward_bonus(&skeleton, BodyPartId::Hips) - 0.5).abs() < 1e-6);
        assert!((backward_bonus(&skeleton, BodyPartId::Hips) + 0.5).abs() < 1e-6);
        assert!(left_bonus(&skeleton, BodyPartId::Hips).abs() < 1e-6);
        assert!(right_bonus(&skeleton, BodyPartId::Hips).abs() < 1e-6);
    }

    #[test]
    fn test_tilted_part_loses_upright_bonus() {
        let mut skeleton = Skeleton::from_rest_states([BodyState::default(); BodyPartId::COUNT]);
        skeleton.part_mut(BodyPartId::Body).state.orientation =
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f32::consts::FRAC_PI_2);
        assert!(upright_bonus(&skeleton, BodyPartId::Body).abs() < 1e-5);
        assert!((upright_bonus(&skeleton, BodyPartId::Hips) - 0.5).abs() < 1e-6);
    }
}
