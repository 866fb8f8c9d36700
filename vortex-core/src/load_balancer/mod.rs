//! The load balancer facade.
//!
//! [`LoadBalancer`] owns the single coarse mutex that serializes every
//! write to the registry's mutable fields, the session table, and the
//! shedder's `in_flight` counter. It is built once from a [`Config`] and
//! lives for the process lifetime; the dispatcher and health checker each
//! hold an `Arc<LoadBalancer>` and never reach into the registry directly.

pub mod ewma;
pub mod shedder;
pub mod strategy;

use std::net::{IpAddr, SocketAddr};
use std::sync::Mutex;

use crate::config::Config;
use crate::domain::backend::{Backend, BackendId};
use crate::domain::registry::{self, BackendDescriptor};
use crate::domain::session::{now_unix, SessionTable};
use crate::error::ProxyError;

pub use shedder::LoadShedder;
pub use strategy::{HashRing, PickContext, Strategy, DEFAULT_REPLICAS};

/// Outcome of attempting to admit a new connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// A backend was selected and its counters updated. The caller must
    /// call [`LoadBalancer::release`] exactly once for this connection,
    /// regardless of how it ends.
    Admitted(BackendDescriptor),
    /// The load shedder refused admission before a backend was chosen; no
    /// counters were touched.
    Shed,
    /// No healthy backend was available; no counters were touched.
    Overloaded,
}

struct Inner {
    backends: Vec<Backend>,
    strategy: Strategy,
    sessions: SessionTable,
    in_flight: u64,
}

/// The selection, health, and admission state for one proxy instance.
pub struct LoadBalancer {
    inner: Mutex<Inner>,
    shedder: Option<LoadShedder>,
    sticky_sessions: bool,
}

impl LoadBalancer {
    /// Build a load balancer from an already-materialized configuration.
    /// The core never reads a file or the environment itself.
    pub fn new(config: &Config) -> Result<Self, ProxyError> {
        config.validate()?;
        let backends = config.build_backends();
        let strategy = match config.strategy {
            crate::config::Strategy::RoundRobin => Strategy::round_robin(),
            crate::config::Strategy::WeightedRoundRobin => {
                Strategy::weighted_round_robin(&backends)
            }
            crate::config::Strategy::LeastConnections => Strategy::least_connections(),
            crate::config::Strategy::LeastResponseTime => Strategy::least_response_time(),
            crate::config::Strategy::Hash => Strategy::hash(&backends, DEFAULT_REPLICAS),
        };
        let shedder = config.load_shedding_enabled.then(|| {
            LoadShedder::new(
                config.load_shed_params.strategy,
                config.load_shed_params.threshold,
                config.load_shed_params.k,
            )
        });

        Ok(Self {
            inner: Mutex::new(Inner {
                backends,
                strategy,
                sessions: SessionTable::new(),
                in_flight: 0,
            }),
            shedder,
            sticky_sessions: config.sticky_sessions,
        })
    }

    /// Run admission for one incoming connection.
    ///
    /// `session_key` is always the `SID:` header value or, absent that, the
    /// client IP; it is only consulted or written when `sticky_sessions` is
    /// enabled in configuration.
    pub fn admit(&self, source_ip: Option<IpAddr>, session_key: &str) -> Admission {
        let mut inner = self.inner.lock().expect("registry mutex poisoned");

        if let Some(shedder) = &self.shedder {
            if shedder.should_shed(inner.in_flight) {
                return Admission::Shed;
            }
        }

        let now = now_unix();
        let sticky_hit = self.sticky_sessions.then(|| inner.sessions.lookup(session_key, now)).flatten();

        let chosen = match sticky_hit {
            Some(id) => Some(id),
            None => {
                let ctx = PickContext { source_ip };
                inner.strategy.pick(&inner.backends, &ctx)
            }
        };

        let chosen = match chosen {
            Some(id) => id,
            None => return Admission::Overloaded,
        };

        let descriptor = {
            let backend = registry::find_mut(&mut inner.backends, chosen)
                .expect("strategy picked an id not present in the registry");
            backend.active_connections += 1;
            backend.errors = 0;
            BackendDescriptor {
                id: backend.id,
                name: backend.name.clone(),
                addr: backend.addr(),
                healthy: backend.healthy,
                active_connections: backend.active_connections,
                errors: backend.errors,
                rtt_avg: backend.rtt_avg,
                weight: backend.weight(),
            }
        };
        inner.in_flight += 1;

        if self.sticky_sessions {
            inner.sessions.update(session_key.to_string(), chosen, now);
        }

        Admission::Admitted(descriptor)
    }

    /// Release an admitted connection's counters exactly once. `had_error`
    /// marks a dial or relay failure, which bumps the backend's `errors`
    /// counter.
    pub fn release(&self, id: BackendId, had_error: bool) {
        let mut inner = self.inner.lock().expect("registry mutex poisoned");
        if let Some(backend) = registry::find_mut(&mut inner.backends, id) {
            backend.active_connections = backend.active_connections.saturating_sub(1);
            if had_error {
                backend.errors += 1;
            }
        }
        inner.in_flight = inner.in_flight.saturating_sub(1);
    }

    /// Declaration-ordered `(id, dial address)` pairs for the health
    /// checker to probe this cycle.
    pub fn probe_targets(&self) -> Vec<(BackendId, SocketAddr)> {
        let inner = self.inner.lock().expect("registry mutex poisoned");
        inner.backends.iter().map(|b| (b.id, b.addr())).collect()
    }

    /// Apply one probe's outcome to the named backend.
    pub fn record_probe(&self, id: BackendId, saw_200: bool, rtt_sample: Option<f64>) {
        let mut inner = self.inner.lock().expect("registry mutex poisoned");
        if let Some(backend) = registry::find_mut(&mut inner.backends, id) {
            registry::record_probe(backend, saw_200, rtt_sample);
        }
    }

    /// Snapshot every backend's current state, for logging or tests.
    pub fn snapshot(&self) -> Vec<BackendDescriptor> {
        let inner = self.inner.lock().expect("registry mutex poisoned");
        registry::snapshot(&inner.backends)
    }
}
