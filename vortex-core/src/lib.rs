//! Vortex Core: domain models, configuration, selection strategies, and the
//! load-balancer facade shared by the Vortex workspace.
//!
//! Everything in this crate is synchronous and, where state is shared,
//! guarded by a single mutex. The dispatcher (`vortex-proxy`) owns sockets
//! and all I/O; it calls into this crate only for non-blocking decisions,
//! never holding the lock across an `.await`.

pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod load_balancer;
