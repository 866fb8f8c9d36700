//! Vortex Proxy Engine
//!
//! The binary entrypoint: loads an already-materialized configuration,
//! builds the core [`LoadBalancer`], then runs the connection dispatcher
//! and the background health checker side by side until the process is
//! torn down. Config file parsing and a full command-line launcher are
//! left out of the core crate; the `VORTEX_CONFIG` path below is the
//! minimal binary-level glue an embedder would otherwise supply.

#![deny(missing_docs)]

mod health_check;
mod server;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use vortex_core::config::{BackendConfig, Config};
use vortex_core::load_balancer::LoadBalancer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = load_config()?;
    let _log_guard = init_logging(&config);

    let addr = SocketAddr::new(config.load_balancer_ip, config.load_balancer_port);
    let lb = Arc::new(LoadBalancer::new(&config)?);

    tracing::info!(
        %addr,
        strategy = ?config.strategy,
        sticky_sessions = config.sticky_sessions,
        load_shedding_enabled = config.load_shedding_enabled,
        "starting vortex-proxy"
    );

    let health_handle = health_check::prober::spawn(
        Arc::clone(&lb),
        Duration::from_secs(config.health_check_interval),
        Duration::from_secs(config.health_check_timeout),
        config.health_check_path.clone(),
    );

    let result = server::run(addr, lb).await;
    health_handle.abort();

    tracing::info!("vortex-proxy shutting down");
    result.map_err(Into::into)
}

/// Read a `Config` from the JSON file at `VORTEX_CONFIG`, or fall back to a
/// single-backend default suitable for local smoke testing.
fn load_config() -> Result<Config, Box<dyn std::error::Error + Send + Sync>> {
    match std::env::var_os("VORTEX_CONFIG") {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)?;
            let config: Config = serde_json::from_str(&raw)?;
            config.validate()?;
            Ok(config)
        }
        None => Ok(default_config()),
    }
}

fn default_config() -> Config {
    Config {
        load_balancer_ip: "0.0.0.0".parse().unwrap(),
        load_balancer_port: 9000,
        servers: vec![BackendConfig {
            name: "default".to_string(),
            ip: "127.0.0.1".parse().unwrap(),
            port: 8080,
            weight: 1,
        }],
        strategy: vortex_core::config::Strategy::RoundRobin,
        sticky_sessions: false,
        health_check_interval: 3,
        health_check_path: "/health".to_string(),
        health_check_timeout: 2,
        load_shedding_enabled: false,
        load_shed_params: vortex_core::config::LoadShedParams::default(),
        debug_mode: false,
    }
}

/// Install a `tracing` subscriber honoring `RUST_LOG`, defaulting to
/// `debug` when `debug_mode` is set and `info` otherwise. `debug_mode`
/// additionally tees output to `lb.log` in the working directory. The
/// returned guard must be held for the life of the process to flush the
/// non-blocking file writer.
fn init_logging(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_level = if config.debug_mode { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if config.debug_mode {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("lb.log")
            .expect("failed to open lb.log for debug logging");
        let (file_writer, guard) = tracing_appender::non_blocking(file);
        let writer = std::io::stdout.and(file_writer);
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).init();
        Some(guard)
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        None
    }
}
