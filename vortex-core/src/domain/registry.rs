//! Pure helpers over a backend list.
//!
//! These functions hold no lock themselves; callers (the load balancer
//! facade and the health checker) apply them while holding the registry
//! mutex defined in [`crate::load_balancer`].

use super::backend::{Backend, BackendId};
use crate::load_balancer::ewma::update_rtt;

/// A read-only snapshot of one backend's state, safe to hand out after the
/// registry mutex has been released.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendDescriptor {
    /// Stable identifier.
    pub id: BackendId,
    /// Operator-facing name.
    pub name: String,
    /// Dial address.
    pub addr: std::net::SocketAddr,
    /// Most recent health status.
    pub healthy: bool,
    /// Open backend sockets attributed to this backend.
    pub active_connections: u64,
    /// Consecutive-teardown error count.
    pub errors: u64,
    /// Smoothed RTT in seconds.
    pub rtt_avg: f64,
    /// Configured weight.
    pub weight: u32,
}

/// Snapshot every backend for introspection (logging, tests) outside the
/// mutex.
pub fn snapshot(backends: &[Backend]) -> Vec<BackendDescriptor> {
    backends
        .iter()
        .map(|b| BackendDescriptor {
            id: b.id,
            name: b.name.clone(),
            addr: b.addr(),
            healthy: b.healthy,
            active_connections: b.active_connections,
            errors: b.errors,
            rtt_avg: b.rtt_avg,
            weight: b.weight(),
        })
        .collect()
}

/// Find a backend by id.
pub fn find(backends: &[Backend], id: BackendId) -> Option<&Backend> {
    backends.iter().find(|b| b.id == id)
}

/// Find a backend by id, mutably.
pub fn find_mut(backends: &mut [Backend], id: BackendId) -> Option<&mut Backend> {
    backends.iter_mut().find(|b| b.id == id)
}

/// Apply the outcome of one health probe cycle to a backend.
///
/// `rtt_sample` is `Some` only when a response was actually read; probes
/// that fail before any bytes are exchanged must not feed the EWMA.
pub fn record_probe(backend: &mut Backend, saw_200: bool, rtt_sample: Option<f64>) {
    if let Some(sample) = rtt_sample {
        backend.rtt_avg = update_rtt(backend.rtt_avg, sample);
        backend.probed = true;
    }
    backend.healthy = rtt_sample.is_some() && saw_200;
}
