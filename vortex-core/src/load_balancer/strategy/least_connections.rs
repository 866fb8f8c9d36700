//! Least-connections selection.

use crate::domain::backend::{Backend, BackendId};

/// Return the healthy backend minimizing `active_connections / weight`,
/// breaking ties by declaration order.
pub fn pick(backends: &[Backend]) -> Option<BackendId> {
    backends
        .iter()
        .filter(|b| b.healthy)
        .min_by(|a, b| {
            let score_a = a.active_connections as f64 / a.weight() as f64;
            let score_b = b.active_connections as f64 / b.weight() as f64;
            score_a.partial_cmp(&score_b).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|b| b.id)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::collection::vec as pvec;
    use proptest::prelude::*;
    use std::net::IpAddr;

    fn backend(id: usize, active: u64, weight: u32) -> Backend {
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        let mut b = Backend::new(BackendId(id), format!("b{id}"), ip, 8000 + id as u16, weight);
        b.active_connections = active;
        b
    }

    proptest! {
        #[test]
        fn never_picks_a_backend_worse_than_some_healthy_alternative(
            loads in pvec((0u64..50, 1u32..10), 1..=8)
        ) {
            let backends: Vec<Backend> = loads
                .iter()
                .enumerate()
                .map(|(i, &(active, weight))| backend(i, active, weight))
                .collect();

            let picked = pick(&backends).expect("at least one healthy backend");
            let picked_score = {
                let b = backends.iter().find(|b| b.id == picked).unwrap();
                b.active_connections as f64 / b.weight() as f64
            };

            for b in &backends {
                let score = b.active_connections as f64 / b.weight() as f64;
                prop_assert!(picked_score <= score);
            }
        }
    }
}
