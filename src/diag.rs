// SPDX-License-Identifier: MIT

use std::io::Write;
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Port the `-debug` diagnostics endpoint binds on localhost.
pub const DEBUG_PORT: u16 = 6060;

/// Runtime counters, shared across all workers.
#[derive(Debug, Default)]
pub struct Stats {
    /// Frames delivered by the capture handle.
    pub received: AtomicU64,
    /// Frames the classifier rejected.
    pub parse_drops: AtomicU64,
    /// Frames emitted onto the trunk.
    pub forwarded: AtomicU64,
    /// Allow-list and wrong-VLAN rejections.
    pub policy_drops: AtomicU64,
    /// SSDP queries/advertisements arriving as unicast to the reflector.
    pub protocol_drops: AtomicU64,
    /// SSDP unicast responses without a matching session.
    pub correlation_misses: AtomicU64,
    pub send_errors: AtomicU64,
    pub arp_replies: AtomicU64,
    pub ndp_replies: AtomicU64,
}

/// Relaxed ordering everywhere: the counters are monotonic telemetry,
/// nothing synchronizes on them.
pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl Stats {
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "received": self.received.load(Ordering::Relaxed),
            "parse_drops": self.parse_drops.load(Ordering::Relaxed),
            "forwarded": self.forwarded.load(Ordering::Relaxed),
            "policy_drops": self.policy_drops.load(Ordering::Relaxed),
            "protocol_drops": self.protocol_drops.load(Ordering::Relaxed),
            "correlation_misses":
                self.correlation_misses.load(Ordering::Relaxed),
            "send_errors": self.send_errors.load(Ordering::Relaxed),
            "arp_replies": self.arp_replies.load(Ordering::Relaxed),
            "ndp_replies": self.ndp_replies.load(Ordering::Relaxed),
        })
    }
}

/// Serves the counters as JSON on `localhost:{port}` until `stop` is
/// set. Binds and accepts non-blocking so shutdown is observed within
/// one poll interval.
pub fn run_debug_server(
    port: u16,
    stats: Arc<Stats>,
    stop: Arc<AtomicBool>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(("127.0.0.1", port))?;
    listener.set_nonblocking(true)?;
    log::info!("diagnostics endpoint listening on localhost:{port}");
    while !stop.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((mut stream, _)) => {
                let body = match serde_json::to_string_pretty(&stats.snapshot())
                {
                    Ok(body) => body,
                    Err(e) => {
                        log::warn!("could not serialize diagnostics: {e}");
                        continue;
                    }
                };
                let response = format!(
                    "HTTP/1.0 200 OK\r\n\
                    Content-Type: application/json\r\n\
                    Content-Length: {}\r\n\r\n{body}",
                    body.len()
                );
                if let Err(e) = stream.write_all(response.as_bytes()) {
                    log::debug!("diagnostics client went away: {e}");
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(200));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
