//! Selection strategies.
//!
//! Represented as a closed tagged union rather than a trait object: the set
//! of variants is fixed and each carries its own precomputed state (a
//! weighted expansion, a hash ring) alongside any cursor.

mod hash_ring;
mod least_connections;
mod least_response_time;
mod round_robin;
mod weighted_round_robin;

use std::net::IpAddr;

use crate::domain::backend::{Backend, BackendId};

pub use hash_ring::{HashRing, DEFAULT_REPLICAS};
pub use weighted_round_robin::WeightedRoundRobin;

/// Everything a strategy needs to know about the request being routed.
#[derive(Debug, Clone, Copy)]
pub struct PickContext {
    /// The client's source IP, when known.
    pub source_ip: Option<IpAddr>,
}

/// The closed set of selection strategies.
///
/// Every call to [`Strategy::pick`] happens with the registry mutex held and
/// must not block.
#[derive(Debug)]
pub enum Strategy {
    /// Round-robin over healthy backends, in declaration order.
    RoundRobin { cursor: usize },
    /// Round-robin over a weight-expanded sequence.
    WeightedRoundRobin(WeightedRoundRobin),
    /// Fewest active connections per unit weight.
    LeastConnections,
    /// Lowest smoothed RTT per unit weight.
    LeastResponseTime,
    /// Consistent hashing on source IP with virtual replicas.
    Hash(HashRing),
}

impl Strategy {
    /// Build the round-robin variant.
    pub fn round_robin() -> Self {
        Strategy::RoundRobin { cursor: 0 }
    }

    /// Build the weighted round-robin variant from the current backend list.
    pub fn weighted_round_robin(backends: &[Backend]) -> Self {
        Strategy::WeightedRoundRobin(WeightedRoundRobin::new(backends))
    }

    /// Build the least-connections variant.
    pub fn least_connections() -> Self {
        Strategy::LeastConnections
    }

    /// Build the least-response-time variant.
    pub fn least_response_time() -> Self {
        Strategy::LeastResponseTime
    }

    /// Build the consistent-hashing variant, with `replicas` virtual nodes
    /// per backend.
    pub fn hash(backends: &[Backend], replicas: usize) -> Self {
        Strategy::Hash(HashRing::new(backends, replicas))
    }

    /// Select a backend, or `None` if no healthy backend is available.
    pub fn pick(&mut self, backends: &[Backend], ctx: &PickContext) -> Option<BackendId> {
        match self {
            Strategy::RoundRobin { cursor } => round_robin::pick(backends, cursor),
            Strategy::WeightedRoundRobin(state) => state.pick(backends),
            Strategy::LeastConnections => least_connections::pick(backends),
            Strategy::LeastResponseTime => least_response_time::pick(backends),
            Strategy::Hash(ring) => ring.pick(backends, ctx.source_ip),
        }
    }
}
