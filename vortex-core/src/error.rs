//! Error types surfaced by the core.

use thiserror::Error;

/// Failures the dispatcher, load balancer, or configuration layer can
/// produce.
///
/// Per-connection variants (`DialFailed`, `RelayIo`, `NoHealthyBackend`,
/// `Shed`) are always caught inside the dispatcher worker and translated
/// into an HTTP error response; they never unwind past it.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Dialing the selected backend did not complete within the configured
    /// timeout, or was refused.
    #[error("failed to connect to backend {backend}: {source}")]
    DialFailed {
        /// Name of the backend that could not be reached.
        backend: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred while relaying bytes between client and
    /// backend.
    #[error("relay I/O error: {0}")]
    RelayIo(#[source] std::io::Error),

    /// No healthy backend was available to serve the request.
    #[error("no healthy backend available")]
    NoHealthyBackend,

    /// The load shedder refused admission.
    #[error("connection shed under load")]
    Shed,

    /// The configuration named a backend with an unparsable address.
    #[error("invalid backend {name}: {reason}")]
    InvalidBackend {
        /// The offending backend's configured name.
        name: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The configuration's `servers` list was empty.
    #[error("configuration must declare at least one backend")]
    EmptyBackendList,

    /// The configuration named a strategy this build does not recognize.
    #[error("unknown selection strategy: {0}")]
    UnknownStrategy(String),
}
