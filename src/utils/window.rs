//! Bounded window of recent samples
//!
//! Used to smooth noisy per-tick signals such as forward velocity before they
//! enter the reward.

use std::collections::VecDeque;

/// Fixed-capacity FIFO of recent `f32` samples
///
/// Pushing into a full window evicts the oldest sample. The mean of an empty
/// window is defined as 0.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentWindow {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl RecentWindow {
    /// Create an empty window
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of samples kept (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { samples: VecDeque::with_capacity(capacity), capacity }
    }

    /// Add a sample, evicting the oldest one if the window is full
    pub fn push(&mut self, sample: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Push a sample and return the updated mean
    pub fn push_and_mean(&mut self, sample: f32) -> f32 {
        self.push(sample);
        self.mean()
    }

    /// Mean of the stored samples, or 0 when empty
    pub fn mean(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f32>() / self.samples.len() as f32
    }

    /// Drop every sample
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Number of stored samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the window holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window_mean_is_zero() {
        let window = RecentWindow::new(10);
        assert_eq!(window.mean(), 0.0);
        assert!(window.is_empty());
    }

    #[test]
    fn test_mean_over_partial_window() {
        let mut window = RecentWindow::new(10);
        window.push(1.0);
        window.push(2.0);
        assert!((window.push_and_mean(3.0) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_oldest_sample_evicted() {
        let mut window = RecentWindow::new(3);
        for v in [10.0, 1.0, 1.0, 1.0] {
            window.push(v);
        }
        assert_eq!(window.len(), 3);
        assert!((window.mean() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_capacity_is_promoted_to_one() {
        let mut window = RecentWindow::new(0);
        window.push(4.0);
        window.push(6.0);
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.mean(), 6.0);
    }

    #[test]
    fn test_clear() {
        let mut window = RecentWindow::new(4);
        window.push(1.0);
        window.clear();
        assert_eq!(window.mean(), 0.0);
    }
}
