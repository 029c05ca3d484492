//! Assistive-force curriculum
//!
//! A shared [`CurriculumHub`] holds one lesson per skill. Every agent owns a
//! [`LocalCurriculum`] that turns the lesson and its in-rollout milestones
//! into force magnitudes for its [`VirtualAssistant`].

pub mod assistant;
pub mod config;
pub mod global;
pub mod local;

pub use assistant::{AssistForces, VirtualAssistant};
pub use config::{CurriculumConfig, SkillCurriculum};
pub use global::{CurriculumHub, CurriculumSnapshot, LessonChange, LessonUpdate};
pub use local::{LocalCurriculum, TickOutcome};
