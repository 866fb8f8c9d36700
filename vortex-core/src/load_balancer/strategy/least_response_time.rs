//! Least-response-time selection.

use crate::domain::backend::{Backend, BackendId};

/// Return the healthy backend minimizing `rtt_avg / weight`. A backend
/// with no probe data yet is treated as having RTT `+inf`, so it is only
/// chosen when no measured healthy backend exists. Ties break by
/// declaration order.
pub fn pick(backends: &[Backend]) -> Option<BackendId> {
    backends
        .iter()
        .filter(|b| b.healthy)
        .min_by(|a, b| score(a).partial_cmp(&score(b)).unwrap_or(std::cmp::Ordering::Equal))
        .map(|b| b.id)
}

fn score(b: &Backend) -> f64 {
    if b.probed {
        b.rtt_avg / b.weight() as f64
    } else {
        f64::INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn backend(id: usize, rtt: f64, weight: u32, probed: bool) -> Backend {
        let mut b = Backend::new(
            BackendId(id),
            format!("b{id}"),
            "127.0.0.1".parse::<IpAddr>().unwrap(),
            8000 + id as u16,
            weight,
        );
        b.rtt_avg = rtt;
        b.probed = probed;
        b
    }

    #[test]
    fn picks_lowest_rtt_per_weight() {
        let backends = vec![
            backend(0, 0.100, 1, true),
            backend(1, 0.050, 1, true),
            backend(2, 0.200, 2, true),
        ];
        assert_eq!(pick(&backends), Some(BackendId(1)));
    }

    #[test]
    fn unprobed_backend_is_infinite_rtt() {
        let backends = vec![backend(0, 0.0, 1, false), backend(1, 0.9, 1, true)];
        assert_eq!(pick(&backends), Some(BackendId(1)));
    }

    #[test]
    fn all_unprobed_falls_back_to_declaration_order() {
        let backends = vec![backend(0, 0.0, 1, false), backend(1, 0.0, 1, false)];
        assert_eq!(pick(&backends), Some(BackendId(0)));
    }
}
