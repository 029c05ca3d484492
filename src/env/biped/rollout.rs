//! Per-rollout bookkeeping

use crate::body::ACTION_SIZE;
use crate::utils::RecentWindow;

/// Counts ticks between decisions
///
/// The first tick of a rollout is always a decision tick; after that every
/// `period`-th tick is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionTimer {
    period: usize,
    tick: usize,
}

impl DecisionTimer {
    /// Timer deciding every `period` ticks (at least 1)
    pub fn new(period: usize) -> Self {
        Self { period: period.max(1), tick: 0 }
    }

    /// Whether the current tick is a decision tick
    pub fn is_decision_tick(&self) -> bool {
        self.tick == 0
    }

    /// Move to the next tick
    pub fn advance(&mut self) {
        self.tick = (self.tick + 1) % self.period;
    }

    /// Restart so the next tick decides
    pub fn reset(&mut self) {
        self.tick = 0;
    }
}

/// State of one rollout, rebuilt on every reset
#[derive(Debug, Clone, PartialEq)]
pub struct RolloutState {
    /// Sum of rewards since reset
    pub cumulative_reward: f32,
    /// Time-alive bonus accumulated since reset or skill switch
    pub time_alive_bonus: f32,
    /// Recent forward velocities of the hips
    pub velocities: RecentWindow,
    /// Whether the rollout has ended
    pub done: bool,
    /// Last action applied to the joints
    pub last_action: Vec<f32>,
    /// Ticks since reset
    pub steps: usize,
    /// Farthest hips position along world forward
    pub max_distance: f32,
    /// Decision cadence
    pub timer: DecisionTimer,
}

impl RolloutState {
    /// Fresh rollout
    pub fn new(velocity_window: usize, decision_period: usize) -> Self {
        Self {
            cumulative_reward: 0.0,
            time_alive_bonus: 0.0,
            velocities: RecentWindow::new(velocity_window),
            done: false,
            last_action: vec![0.0; ACTION_SIZE],
            steps: 0,
            max_distance: f32::NEG_INFINITY,
            timer: DecisionTimer::new(decision_period),
        }
    }

    /// Push a raw forward velocity and return the smoothed value
    pub fn smooth_velocity(&mut self, velocity: f32) -> f32 {
        self.velocities.push_and_mean(velocity)
    }

    /// Smoothed forward velocity, 0 before the first sample
    pub fn smoothed_velocity(&self) -> f32 {
        self.velocities.mean()
    }

    /// Track the farthest hips position
    pub fn record_distance(&mut self, z: f32) {
        self.max_distance = self.max_distance.max(z);
    }

    /// Clear per-skill signals on a skill switch
    pub fn on_skill_change(&mut self) {
        self.velocities.clear();
        self.time_alive_bonus = 0.0;
    }
}
