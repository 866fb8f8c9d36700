//! Periodic out-of-band backend prober.
//!
//! A single background task probes every backend, serially and in
//! declaration order, once per cycle. The next cycle's interval starts
//! only after the previous cycle finishes, bounding concurrent socket
//! usage.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{self, timeout};
use tracing::debug;

use vortex_core::load_balancer::LoadBalancer;

/// Cap on the probe reply read.
const PROBE_READ_CAP: usize = 1024;

/// Spawn the prober as a background task. Returns its `JoinHandle` so the
/// caller can abort it on shutdown; the task itself never exits during
/// normal operation.
pub fn spawn(
    lb: Arc<LoadBalancer>,
    interval: Duration,
    probe_timeout: Duration,
    path: String,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            for (id, addr) in lb.probe_targets() {
                match probe_once(addr, &path, probe_timeout).await {
                    Some((saw_200, rtt)) => lb.record_probe(id, saw_200, Some(rtt)),
                    None => lb.record_probe(id, false, None),
                }
            }
            time::sleep(interval).await;
        }
    })
}

/// Probe one backend: connect on its HTTP port, send a minimal GET, read up
/// to 1 KiB of reply, and measure RTT as wall time from socket open to read
/// completion. Returns `None` for any failure before bytes were exchanged,
/// so the caller does not feed the EWMA on those.
async fn probe_once(addr: SocketAddr, path: &str, probe_timeout: Duration) -> Option<(bool, f64)> {
    let attempt = async {
        let start = Instant::now();
        let mut stream = TcpStream::connect(addr).await?;
        let request = format!(
            "GET {path} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            addr.ip()
        );
        stream.write_all(request.as_bytes()).await?;

        let mut buf = [0u8; PROBE_READ_CAP];
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            // Peer closed without sending anything: no bytes exchanged.
            return Ok::<_, std::io::Error>(None);
        }
        let rtt = start.elapsed().as_secs_f64();
        let response = String::from_utf8_lossy(&buf[..n]).into_owned();
        Ok(Some((response, rtt)))
    };

    match timeout(probe_timeout, attempt).await {
        Ok(Ok(Some((response, rtt)))) => Some((response.contains("200 OK"), rtt)),
        Ok(Ok(None)) => {
            debug!(%addr, "probe closed before sending a response");
            None
        }
        Ok(Err(e)) => {
            debug!(%addr, error = %e, "probe connection failed");
            None
        }
        Err(_) => {
            debug!(%addr, "probe timed out");
            None
        }
    }
}
