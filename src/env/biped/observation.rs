//! Observation encoding
//!
//! The observation is a flat vector of 92 floats:
//!
//! | offset | size | content |
//! |--------|------|---------|
//! | 0  | 1 | time-alive bonus |
//! | 1  | 1 | hips position z (distance travelled) |
//! | 2  | 1 | target forward velocity |
//! | 3  | 1 | smoothed forward velocity |
//! | 4  | 3 | hips forward |
//! | 7  | 3 | hips up |
//! | 10 | 3 | body forward |
//! | 13 | 3 | body up |
//! | 16 | .. | per part in setup order: contact, linear velocity, angular velocity, then joint target and strength for parts with an observed joint |

use nalgebra::Vector3;

use crate::body::{BodyPart, BodyPartId, Skeleton};
use crate::error::{BipedError, Result};

/// Floats in the global block
pub const GLOBAL_OBSERVATION_SIZE: usize = 16;

/// Floats every part contributes
pub const PART_OBSERVATION_SIZE: usize = 7;

/// Extra floats of a part with an observed joint
pub const JOINT_OBSERVATION_SIZE: usize = 4;

/// Length of the full observation
pub const OBSERVATION_SIZE: usize = GLOBAL_OBSERVATION_SIZE
    + PART_OBSERVATION_SIZE * BodyPartId::COUNT
    + JOINT_OBSERVATION_SIZE * JOINTED_PARTS;

const JOINTED_PARTS: usize = 5;

/// Scalar terms preceding the per-part block
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GlobalTerms {
    /// Accumulated time-alive bonus
    pub time_alive_bonus: f32,
    /// Target forward velocity of the active skill
    pub target_velocity: f32,
    /// Smoothed forward velocity of the hips
    pub velocity: f32,
}

/// Builds observation vectors from the skeleton
#[derive(Debug, Clone, Copy, Default)]
pub struct ObservationEncoder;

impl ObservationEncoder {
    /// Append one part's observation to `out`
    pub fn encode_part(part: &BodyPart, out: &mut Vec<f32>) {
        out.push(if part.state.ground_contact { 1.0 } else { 0.0 });
        push_vector(out, &part.state.linear_velocity);
        push_vector(out, &part.state.angular_velocity);
        if part.id.has_observed_joint() {
            out.extend_from_slice(&part.joint_target);
            out.push(part.strength);
        }
    }

    /// Encode the full observation
    ///
    /// Fails with [`BipedError::NonFinite`] if any element is not finite.
    pub fn encode(skeleton: &Skeleton, globals: &GlobalTerms) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(OBSERVATION_SIZE);
        let hips = skeleton.state(BodyPartId::Hips);
        let body = skeleton.state(BodyPartId::Body);

        out.push(globals.time_alive_bonus);
        out.push(hips.position.z);
        out.push(globals.target_velocity);
        out.push(globals.velocity);
        push_vector(&mut out, &hips.forward());
        push_vector(&mut out, &hips.up());
        push_vector(&mut out, &body.forward());
        push_vector(&mut out, &body.up());

        for part in skeleton.parts() {
            Self::encode_part(part, &mut out);
        }

        if let Some(index) = out.iter().position(|v| !v.is_finite()) {
            return Err(BipedError::NonFinite(format!("observation element {}", index)));
        }
        Ok(out)
    }
}

fn push_vector(out: &mut Vec<f32>, v: &Vector3<f32>) {
    out.extend_from_slice(&[v.x, v.y, v.z]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyState;

    fn skeleton() -> Skeleton {
        Skeleton::from_rest_states([BodyState::default(); BodyPartId::COUNT])
    }

    #[test]
    fn test_observation_size() {
        let jointed = BodyPartId::ALL.iter().filter(|p| p.has_observed_joint()).count();
        assert_eq!(jointed, JOINTED_PARTS);
        assert_eq!(OBSERVATION_SIZE, 92);

        let obs = ObservationEncoder::encode(&skeleton(), &GlobalTerms::default()).unwrap();
        assert_eq!(obs.len(), OBSERVATION_SIZE);
    }

    #[test]
    fn test_global_block() {
        let mut skeleton = skeleton();
        skeleton.part_mut(BodyPartId::Hips).state.position.z = 3.5;
        let globals = GlobalTerms { time_alive_bonus: 0.01, target_velocity: 0.55, velocity: 0.4 };
        let obs = ObservationEncoder::encode(&skeleton, &globals).unwrap();

        assert_eq!(&obs[..4], &[0.01, 3.5, 0.55, 0.4]);
        assert_eq!(&obs[4..7], &[0.0, 0.0, 1.0]); // hips forward
        assert_eq!(&obs[7..10], &[0.0, 1.0, 0.0]); // hips up
    }

    #[test]
    fn test_part_block_layout() {
        let mut skeleton = skeleton();
        let body = skeleton.part_mut(BodyPartId::Body);
        body.state.ground_contact = true;
        body.state.linear_velocity = Vector3::new(1.0, 2.0, 3.0);
        body.set_joint_target(0.5, -0.5, 0.0);
        body.set_strength(1.0);

        let obs = ObservationEncoder::encode(&skeleton, &GlobalTerms::default()).unwrap();
        let start = GLOBAL_OBSERVATION_SIZE;
        assert_eq!(obs[start], 1.0);
        assert_eq!(&obs[start + 1..start + 4], &[1.0, 2.0, 3.0]);
        assert_eq!(&obs[start + 7..start + 11], &[0.5, -0.5, 0.0, 1.0]);

        // Hips follow the body and carry no joint block
        let hips = start + PART_OBSERVATION_SIZE + JOINT_OBSERVATION_SIZE;
        let thigh = hips + PART_OBSERVATION_SIZE;
        let mut part = Vec::new();
        ObservationEncoder::encode_part(skeleton.part(BodyPartId::ThighL), &mut part);
        assert_eq!(&obs[thigh..thigh + part.len()], part.as_slice());
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut skeleton = skeleton();
        skeleton.part_mut(BodyPartId::ShinR).state.angular_velocity.x = f32::NAN;
        let err = ObservationEncoder::encode(&skeleton, &GlobalTerms::default()).unwrap_err();
        assert!(matches!(err, BipedError::NonFinite(_)));
    }
}
