//! Plain round-robin.

use crate::domain::backend::{Backend, BackendId};

/// Advance `cursor` modulo `backends.len()`, scanning forward from it until
/// a healthy backend is found. The cursor always advances past the
/// returned pick (or past its starting point, on a full miss) so the next
/// call continues from there.
pub fn pick(backends: &[Backend], cursor: &mut usize) -> Option<BackendId> {
    let n = backends.len();
    if n == 0 {
        return None;
    }

    let start = *cursor % n;
    for offset in 0..n {
        let i = (start + offset) % n;
        if backends[i].healthy {
            *cursor = (i + 1) % n;
            return Some(backends[i].id);
        }
    }
    *cursor = (start + 1) % n;
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn backends(n: usize) -> Vec<Backend> {
        (0..n)
            .map(|i| {
                Backend::new(
                    BackendId(i),
                    format!("b{i}"),
                    "127.0.0.1".parse::<IpAddr>().unwrap(),
                    8000 + i as u16,
                    1,
                )
            })
            .collect()
    }

    #[test]
    fn even_split_over_three_healthy_backends() {
        let backends = backends(3);
        let mut cursor = 0;
        let picks: Vec<usize> = (0..9)
            .map(|_| pick(&backends, &mut cursor).unwrap().0)
            .collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn skips_unhealthy_backends() {
        let mut backends = backends(3);
        backends[1].healthy = false;
        let mut cursor = 0;
        let picks: Vec<usize> = (0..4)
            .map(|_| pick(&backends, &mut cursor).unwrap().0)
            .collect();
        assert_eq!(picks, vec![0, 2, 0, 2]);
    }

    #[test]
    fn none_when_all_unhealthy() {
        let mut backends = backends(2);
        backends.iter_mut().for_each(|b| b.healthy = false);
        let mut cursor = 0;
        assert_eq!(pick(&backends, &mut cursor), None);
    }

    #[test]
    fn empty_registry_returns_none() {
        let mut cursor = 0;
        assert_eq!(pick(&[], &mut cursor), None);
    }
}
