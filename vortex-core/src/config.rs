//! Configuration model.
//!
//! The core never reads a file or the environment itself; an embedder
//! materializes a [`Config`] however it likes (JSON via `serde_json`, a
//! literal in Rust, …) and hands it to [`crate::load_balancer::LoadBalancer::new`].

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::domain::backend::{Backend, BackendId};
use crate::error::ProxyError;

fn default_strategy() -> Strategy {
    Strategy::RoundRobin
}

fn default_false() -> bool {
    false
}

fn default_health_interval() -> u64 {
    3
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_health_timeout() -> u64 {
    2
}

fn default_shed_threshold() -> u64 {
    5
}

fn default_shed_strategy() -> LoadShedStrategy {
    LoadShedStrategy::Exponential
}

fn default_shed_k() -> f64 {
    0.3
}

fn default_weight() -> u32 {
    1
}

/// One backend entry from the `servers[]` config field.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Operator-facing name.
    pub name: String,
    /// Backend address.
    pub ip: IpAddr,
    /// Backend port.
    pub port: u16,
    /// Relative weight, used by the weighted strategies. Defaults to 1.
    #[serde(default = "default_weight")]
    pub weight: u32,
}

/// Selection strategy, one of five named variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Round-robin over healthy backends.
    RoundRobin,
    /// Round-robin over a weight-expanded sequence.
    WeightedRoundRobin,
    /// Fewest active connections per unit weight.
    LeastConnections,
    /// Lowest smoothed RTT per unit weight.
    LeastResponseTime,
    /// Consistent hashing on source IP.
    Hash,
}

impl std::str::FromStr for Strategy {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round_robin" => Ok(Strategy::RoundRobin),
            "weighted_round_robin" => Ok(Strategy::WeightedRoundRobin),
            "least_connections" => Ok(Strategy::LeastConnections),
            "least_response_time" => Ok(Strategy::LeastResponseTime),
            "hash" => Ok(Strategy::Hash),
            other => Err(ProxyError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Which admission-control formula the shedder applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadShedStrategy {
    /// Shed iff `in_flight >= threshold`.
    Threshold,
    /// Shed with probability rising exponentially past the threshold.
    Exponential,
}

/// Load shedder tuning.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct LoadShedParams {
    /// Concurrency threshold `T`.
    #[serde(default = "default_shed_threshold", rename = "sim_conn_threshold")]
    pub threshold: u64,
    /// Threshold or exponential variant.
    #[serde(default = "default_shed_strategy")]
    pub strategy: LoadShedStrategy,
    /// Exponential steepness `K`; unused by the threshold variant.
    #[serde(default = "default_shed_k")]
    pub k: f64,
}

impl Default for LoadShedParams {
    fn default() -> Self {
        Self {
            threshold: default_shed_threshold(),
            strategy: default_shed_strategy(),
            k: default_shed_k(),
        }
    }
}

/// The complete, already-materialized configuration consumed by the core.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Bind address.
    pub load_balancer_ip: IpAddr,
    /// Bind port.
    pub load_balancer_port: u16,
    /// Declaration-ordered backend list.
    pub servers: Vec<BackendConfig>,
    /// Selection strategy.
    #[serde(default = "default_strategy")]
    pub strategy: Strategy,
    /// Enable the sticky session table.
    #[serde(default = "default_false")]
    pub sticky_sessions: bool,
    /// Health probe cadence, in seconds.
    #[serde(default = "default_health_interval")]
    pub health_check_interval: u64,
    /// Health probe HTTP path.
    #[serde(default = "default_health_path")]
    pub health_check_path: String,
    /// Per-probe timeout, in seconds.
    #[serde(default = "default_health_timeout")]
    pub health_check_timeout: u64,
    /// Enable admission control.
    #[serde(default = "default_false")]
    pub load_shedding_enabled: bool,
    /// Load shedder tuning.
    #[serde(default)]
    pub load_shed_params: LoadShedParams,
    /// Verbose logging to stdout and `lb.log`.
    #[serde(default = "default_false")]
    pub debug_mode: bool,
}

impl Config {
    /// Validate the configuration, returning the first problem found.
    pub fn validate(&self) -> Result<(), ProxyError> {
        if self.servers.is_empty() {
            return Err(ProxyError::EmptyBackendList);
        }
        for s in &self.servers {
            if s.weight == 0 {
                return Err(ProxyError::InvalidBackend {
                    name: s.name.clone(),
                    reason: "weight must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Materialize the declaration-ordered backend list from `servers[]`.
    pub fn build_backends(&self) -> Vec<Backend> {
        self.servers
            .iter()
            .enumerate()
            .map(|(i, s)| Backend::new(BackendId(i), s.name.clone(), s.ip, s.port, s.weight))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            load_balancer_ip: "0.0.0.0".parse().unwrap(),
            load_balancer_port: 9000,
            servers: vec![BackendConfig {
                name: "a".into(),
                ip: "127.0.0.1".parse().unwrap(),
                port: 8080,
                weight: 1,
            }],
            strategy: Strategy::RoundRobin,
            sticky_sessions: false,
            health_check_interval: 3,
            health_check_path: "/health".into(),
            health_check_timeout: 2,
            load_shedding_enabled: false,
            load_shed_params: LoadShedParams::default(),
            debug_mode: false,
        }
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = sample();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.load_balancer_port, cfg.load_balancer_port);
        assert_eq!(back.servers.len(), 1);
    }

    #[test]
    fn rejects_empty_server_list() {
        let mut cfg = sample();
        cfg.servers.clear();
        assert!(matches!(cfg.validate(), Err(ProxyError::EmptyBackendList)));
    }

    #[test]
    fn defaults_apply_when_fields_absent() {
        let json = serde_json::json!({
            "load_balancer_ip": "0.0.0.0",
            "load_balancer_port": 9000,
            "servers": [{"name": "a", "ip": "127.0.0.1", "port": 8080}],
        });
        let cfg: Config = serde_json::from_value(json).unwrap();
        assert_eq!(cfg.strategy, Strategy::RoundRobin);
        assert_eq!(cfg.health_check_interval, 3);
        assert_eq!(cfg.health_check_path, "/health");
        assert_eq!(cfg.load_shed_params.threshold, 5);
        assert_eq!(cfg.servers[0].weight, 1);
    }

    #[test]
    fn strategy_parses_from_str() {
        assert_eq!("hash".parse::<Strategy>().unwrap(), Strategy::Hash);
        assert!("bogus".parse::<Strategy>().is_err());
    }
}
