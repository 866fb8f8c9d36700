//! Connection dispatcher: accept loop, session-key peek, admission,
//! backend dial, and bidirectional relay.
//!
//! One task per accepted connection; the task owns both sockets and runs
//! the full lifecycle to completion, never keeping state beyond itself.
//! Per-connection failures are translated into a best-effort HTTP error
//! response and never propagate out of the task.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Socket, Type};
use tokio::io::{self, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, warn};

use vortex_core::http::ErrorResponse;
use vortex_core::load_balancer::{Admission, LoadBalancer};

/// Client first-segment peek size.
const PEEK_BUF_SIZE: usize = 4096;
/// How long to wait for the client's first bytes before falling back to an
/// empty session key.
const PEEK_TIMEOUT: Duration = Duration::from_millis(200);
/// Backend dial timeout.
const DIAL_TIMEOUT: Duration = Duration::from_secs(5);
/// Listen backlog.
const LISTEN_BACKLOG: i32 = 5;

/// Bind the listening socket with `SO_REUSEADDR` and an explicit backlog,
/// then run the accept loop until the listener errors or the process is
/// torn down.
pub async fn run(addr: SocketAddr, lb: Arc<LoadBalancer>) -> io::Result<()> {
    let listener = bind_listener(addr)?;
    tracing::info!(%addr, "vortex-proxy listening");

    loop {
        let (client, client_addr) = listener.accept().await?;
        let lb = Arc::clone(&lb);
        tokio::spawn(async move {
            handle_connection(client, client_addr, lb).await;
        });
    }
}

fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    TcpListener::from_std(socket.into())
}

/// Drive one client connection end to end: peek the session key, admit,
/// dial the chosen backend, and relay. Never returns an error: all
/// failures are logged and, where warranted, answered with an HTTP error
/// response before the sockets close.
async fn handle_connection(mut client: TcpStream, client_addr: SocketAddr, lb: Arc<LoadBalancer>) {
    let session_key = peek_session_key(&client, client_addr).await;

    let backend = match lb.admit(Some(client_addr.ip()), &session_key) {
        Admission::Shed => {
            debug!(%client_addr, "shedding connection");
            send_error(&mut client, ErrorResponse::Shed).await;
            return;
        }
        Admission::Overloaded => {
            debug!(%client_addr, "no healthy backend available");
            send_error(&mut client, ErrorResponse::Overloaded).await;
            return;
        }
        Admission::Admitted(backend) => backend,
    };

    let mut upstream = match timeout(DIAL_TIMEOUT, TcpStream::connect(backend.addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            warn!(backend = %backend.name, error = %e, "dial failed");
            send_error(&mut client, ErrorResponse::Internal).await;
            lb.release(backend.id, true);
            return;
        }
        Err(_) => {
            warn!(backend = %backend.name, "dial timed out");
            send_error(&mut client, ErrorResponse::Internal).await;
            lb.release(backend.id, true);
            return;
        }
    };

    debug!(%client_addr, backend = %backend.name, "relaying");
    match io::copy_bidirectional(&mut client, &mut upstream).await {
        Ok((client_to_backend, backend_to_client)) => {
            debug!(client_to_backend, backend_to_client, "relay closed");
            lb.release(backend.id, false);
        }
        Err(e) => {
            warn!(backend = %backend.name, error = %e, "relay I/O error");
            send_error(&mut client, ErrorResponse::Internal).await;
            lb.release(backend.id, true);
        }
    }
}

/// Peek the client's first segment without consuming it, looking for a
/// `SID: <value>` header; fall back to the client IP otherwise.
/// Implemented with `TcpStream::peek`, so the bytes remain available to
/// the relay unchanged.
async fn peek_session_key(client: &TcpStream, client_addr: SocketAddr) -> String {
    let mut buf = [0u8; PEEK_BUF_SIZE];
    let peeked = match timeout(PEEK_TIMEOUT, client.peek(&mut buf)).await {
        Ok(Ok(n)) => n,
        _ => 0,
    };
    extract_sid(&buf[..peeked]).unwrap_or_else(|| client_addr.ip().to_string())
}

/// Scan line-delimited headers for the literal, case-sensitive token
/// `SID: ` (a space is required after the colon).
fn extract_sid(data: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(data);
    text.split("\r\n")
        .find_map(|line| line.strip_prefix("SID: ").map(str::to_string))
}

/// Best-effort write of a fixed error response; a write failure (client
/// already gone) is swallowed.
async fn send_error(stream: &mut TcpStream, response: ErrorResponse) {
    let _ = stream.write_all(&response.render()).await;
}
