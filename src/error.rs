//! Error types for the biped environment and curriculum
//!
//! Reward terms and phase tracking are total over finite inputs, so errors
//! only arise at the boundaries: malformed action vectors, body parts the
//! harness never registered, non-finite physics data and bad configuration.

use thiserror::Error;

/// Errors surfaced by the environment, reward and curriculum layers
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BipedError {
    /// Action vector has the wrong number of elements
    #[error("invalid action vector: expected {expected} values, got {got}")]
    InvalidAction {
        /// Expected action length
        expected: usize,
        /// Received action length
        got: usize,
    },

    /// Action vector contains NaN or infinity
    #[error("invalid action vector: value at index {index} is not finite ({value})")]
    NonFiniteAction {
        /// Offending index
        index: usize,
        /// Offending value
        value: f32,
    },

    /// Body part was never registered with the skeleton
    #[error("missing body part: {0}")]
    MissingBodyPart(String),

    /// A physics input or reward term became NaN or infinite
    #[error("non-finite value in {0}")]
    NonFinite(String),

    /// Skill index does not name a known skill
    #[error("unknown skill index {0}")]
    UnknownSkill(usize),

    /// Configuration failed validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The shared lesson table lock was poisoned by a panicking writer
    #[error("curriculum lesson table lock poisoned")]
    CurriculumPoisoned,
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, BipedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = BipedError::InvalidAction { expected: 21, got: 3 };
        assert_eq!(err.to_string(), "invalid action vector: expected 21 values, got 3");

        let err = BipedError::MissingBodyPart("Tail".to_string());
        assert_eq!(err.to_string(), "missing body part: Tail");
    }

    #[test]
    fn test_error_converts_into_anyhow() {
        let err: anyhow::Error = BipedError::UnknownSkill(7).into();
        assert_eq!(err.downcast_ref::<BipedError>(), Some(&BipedError::UnknownSkill(7)));
    }
}
