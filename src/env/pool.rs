//! Vectorized environment pool for parallel execution
//!
//! Runs many environment instances side by side on Rayon's thread pool. Every
//! agent of a biped pool can share one curriculum hub, so promotions earned by
//! one agent reach all the others.
//!
//! # Example
//!
//! ```rust
//! use stride_rl::body::{ScriptedHarness, ACTION_SIZE};
//! use stride_rl::curriculum::{CurriculumConfig, CurriculumHub};
//! use stride_rl::env::{BipedEnv, EnvConfig, EnvPool};
//!
//! let hub = CurriculumHub::new(CurriculumConfig::default()).unwrap();
//! let mut pool = EnvPool::try_new(
//!     || BipedEnv::new(ScriptedHarness::standing(), EnvConfig::default(), &hub),
//!     4,
//! )
//! .unwrap();
//!
//! let observations = pool.reset().unwrap();
//! assert_eq!(observations.len(), 4);
//!
//! let actions = vec![vec![0.0; ACTION_SIZE]; 4];
//! let results = pool.step(&actions).unwrap();
//! assert_eq!(results.len(), 4);
//! ```

use anyhow::{ensure, Context, Result};
use rayon::prelude::*;

use crate::env::{Environment, SpaceInfo, StepResult};

/// A pool of environments for parallel execution
pub struct EnvPool<E: Environment> {
    /// Vector of environment instances
    envs: Vec<E>,

    /// Number of environments
    num_envs: usize,
}

impl<E> EnvPool<E>
where
    E: Environment + Send,
    E::Observation: Send,
    E::Action: Clone + Sync,
{
    /// Create a new environment pool
    ///
    /// # Arguments
    ///
    /// * `env_fn` - Factory function to create environment instances
    /// * `num_envs` - Number of parallel environments
    pub fn new<F>(env_fn: F, num_envs: usize) -> Self
    where
        F: Fn() -> E,
    {
        let envs = (0..num_envs).map(|_| env_fn()).collect();
        Self { envs, num_envs }
    }

    /// Create a pool from a fallible factory
    pub fn try_new<F, Err>(env_fn: F, num_envs: usize) -> Result<Self>
    where
        F: Fn() -> std::result::Result<E, Err>,
        Err: Into<anyhow::Error>,
    {
        let envs = (0..num_envs)
            .map(|i| {
                env_fn()
                    .map_err(Into::<anyhow::Error>::into)
                    .with_context(|| format!("creating env {}", i))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { envs, num_envs })
    }

    /// Reset all environments in parallel
    ///
    /// Returns one initial observation per environment.
    pub fn reset(&mut self) -> Result<Vec<E::Observation>> {
        self.envs.par_iter_mut().map(|env| env.reset()).collect()
    }

    /// Step all environments in parallel with given actions
    ///
    /// Fails if the number of actions doesn't match the number of
    /// environments, or if any environment fails.
    pub fn step(&mut self, actions: &[E::Action]) -> Result<Vec<StepResult<E::Observation>>> {
        ensure!(
            actions.len() == self.num_envs,
            "Number of actions ({}) must match number of environments ({})",
            actions.len(),
            self.num_envs
        );

        self.envs
            .par_iter_mut()
            .zip(actions.par_iter())
            .map(|(env, action)| env.step(action.clone()))
            .collect()
    }

    /// Get the number of environments in the pool
    pub fn num_envs(&self) -> usize {
        self.num_envs
    }

    /// Get observation space information from first environment
    pub fn observation_space(&self) -> Option<SpaceInfo> {
        self.envs.first().map(Environment::observation_space)
    }

    /// Get action space information from first environment
    pub fn action_space(&self) -> Option<SpaceInfo> {
        self.envs.first().map(Environment::action_space)
    }

    /// Reset a specific environment by index
    pub fn reset_env(&mut self, env_id: usize) -> Result<E::Observation> {
        let env = self
            .envs
            .get_mut(env_id)
            .with_context(|| format!("no environment at index {}", env_id))?;
        env.reset()
    }

    /// Access one environment
    pub fn env(&self, env_id: usize) -> Option<&E> {
        self.envs.get(env_id)
    }

    /// Mutable access to one environment
    pub fn env_mut(&mut self, env_id: usize) -> Option<&mut E> {
        self.envs.get_mut(env_id)
    }
}

/// Result of stepping an environment pool
///
/// Contains observations, rewards, and done flags for all environments.
#[derive(Debug, Clone)]
pub struct PoolStepResult<O> {
    /// Observations for each environment
    pub observations: Vec<O>,

    /// Rewards for each environment
    pub rewards: Vec<f32>,

    /// Termination flags for each environment
    pub terminated: Vec<bool>,

    /// Truncation flags for each environment
    pub truncated: Vec<bool>,
}

impl<E> EnvPool<E>
where
    E: Environment + Send,
    E::Observation: Send,
    E::Action: Clone + Sync,
{
    /// Step all environments and return structured result
    ///
    /// Unpacks individual StepResults into parallel vectors.
    pub fn step_structured(
        &mut self,
        actions: &[E::Action],
    ) -> Result<PoolStepResult<E::Observation>> {
        let results = self.step(actions)?;

        let mut observations = Vec::with_capacity(self.num_envs);
        let mut rewards = Vec::with_capacity(self.num_envs);
        let mut terminated = Vec::with_capacity(self.num_envs);
        let mut truncated = Vec::with_capacity(self.num_envs);

        for result in results {
            observations.push(result.observation);
            rewards.push(result.reward);
            terminated.push(result.terminated);
            truncated.push(result.truncated);
        }

        Ok(PoolStepResult { observations, rewards, terminated, truncated })
    }
}
