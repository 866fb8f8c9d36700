//! Weighted round-robin over a precomputed weight expansion.

use crate::domain::backend::{Backend, BackendId};

/// A backend list expanded so that each backend appears `weight` times, in
/// declaration order (weights `[3,2,1]` for `[A,B,C]` become
/// `[A,A,A,B,B,C]`). The expansion is built once at construction; callers
/// must rebuild it if the backend set or weights change.
#[derive(Debug)]
pub struct WeightedRoundRobin {
    sequence: Vec<BackendId>,
    cursor: usize,
}

impl WeightedRoundRobin {
    /// Expand `backends` into the flat weighted sequence.
    pub fn new(backends: &[Backend]) -> Self {
        let mut sequence = Vec::new();
        for b in backends {
            for _ in 0..b.weight() {
                sequence.push(b.id);
            }
        }
        Self { sequence, cursor: 0 }
    }

    /// Advance the cursor through the expansion, skipping entries whose
    /// backend is currently unhealthy. Scans at most one full cycle of the
    /// expanded sequence.
    pub fn pick(&mut self, backends: &[Backend]) -> Option<BackendId> {
        let n = self.sequence.len();
        if n == 0 {
            return None;
        }

        let start = self.cursor % n;
        for offset in 0..n {
            let i = (start + offset) % n;
            let id = self.sequence[i];
            if backends.iter().any(|b| b.id == id && b.healthy) {
                self.cursor = (i + 1) % n;
                return Some(id);
            }
        }
        self.cursor = (start + 1) % n;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn weighted_backends() -> Vec<Backend> {
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        vec![
            Backend::new(BackendId(0), "a", ip, 8000, 3),
            Backend::new(BackendId(1), "b", ip, 8001, 2),
            Backend::new(BackendId(2), "c", ip, 8002, 1),
        ]
    }

    #[test]
    fn six_picks_match_weight_expansion() {
        let backends = weighted_backends();
        let mut wrr = WeightedRoundRobin::new(&backends);
        let picks: Vec<usize> = (0..6).map(|_| wrr.pick(&backends).unwrap().0).collect();
        assert_eq!(picks, vec![0, 0, 0, 1, 1, 2]);
    }

    #[test]
    fn twelve_picks_repeat_the_cycle() {
        let backends = weighted_backends();
        let mut wrr = WeightedRoundRobin::new(&backends);
        let picks: Vec<usize> = (0..12).map(|_| wrr.pick(&backends).unwrap().0).collect();
        assert_eq!(picks, vec![0, 0, 0, 1, 1, 2, 0, 0, 0, 1, 1, 2]);
    }

    #[test]
    fn skips_unhealthy_entries_within_one_cycle() {
        let mut backends = weighted_backends();
        backends[0].healthy = false;
        let mut wrr = WeightedRoundRobin::new(&backends);
        let picks: Vec<usize> = (0..3).map(|_| wrr.pick(&backends).unwrap().0).collect();
        assert_eq!(picks, vec![1, 1, 2]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::collection::vec as pvec;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::net::IpAddr;

    fn backends_with_weights(weights: &[u32]) -> Vec<Backend> {
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        weights
            .iter()
            .enumerate()
            .map(|(i, &w)| Backend::new(BackendId(i), format!("b{i}"), ip, 8000 + i as u16, w))
            .collect()
    }

    proptest! {
        #[test]
        fn one_full_cycle_visits_every_backend_exactly_its_weight(
            weights in pvec(1u32..=5, 1..=8)
        ) {
            let backends = backends_with_weights(&weights);
            let total: u32 = weights.iter().sum();
            let mut wrr = WeightedRoundRobin::new(&backends);

            let mut counts: HashMap<usize, u32> = HashMap::new();
            for _ in 0..total {
                let id = wrr.pick(&backends).expect("all backends healthy");
                *counts.entry(id.0).or_insert(0) += 1;
            }

            for (i, &w) in weights.iter().enumerate() {
                prop_assert_eq!(counts.get(&i).copied().unwrap_or(0), w);
            }
        }
    }
}
