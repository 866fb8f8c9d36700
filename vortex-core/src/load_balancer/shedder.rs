//! Load shedding / admission control.

use crate::config::LoadShedStrategy;

/// Admission-control policy paired with its tuning, operating on a
/// caller-owned `in_flight` counter.
///
/// `should_shed` is evaluated with the registry mutex held so that
/// `in_flight` is observed consistently.
#[derive(Debug, Clone, Copy)]
pub struct LoadShedder {
    strategy: LoadShedStrategy,
    threshold: u64,
    k: f64,
}

impl LoadShedder {
    /// Build a shedder from configuration.
    pub fn new(strategy: LoadShedStrategy, threshold: u64, k: f64) -> Self {
        Self { strategy, threshold, k }
    }

    /// Decide whether to shed a new connection given the current
    /// `in_flight` count.
    pub fn should_shed(&self, in_flight: u64) -> bool {
        match self.strategy {
            LoadShedStrategy::Threshold => in_flight >= self.threshold,
            LoadShedStrategy::Exponential => {
                if in_flight < self.threshold {
                    false
                } else {
                    let p = 1.0 - (-self.k * (in_flight - self.threshold) as f64).exp();
                    rand::random::<f64>() < p
                }
            }
        }
    }
}
