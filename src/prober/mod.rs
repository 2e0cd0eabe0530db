use anyhow::Result;
use std::net::SocketAddrV4;
use std::time::Duration;

pub mod tcp_connect;

/// Result of a single probe. Timeouts and refusals are data, not errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeOutcome {
    Success { rtt_ms: f64 },
    Timeout,
    ConnectionError,
}

impl ProbeOutcome {
    /// Short label used for metric labels and log fields.
    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Success { .. } => "success",
            ProbeOutcome::Timeout => "timeout",
            ProbeOutcome::ConnectionError => "connection_error",
        }
    }
}

/// Something that can time one connection handshake against a target.
///
/// Returns `Err` only for faults inside the prober itself (e.g. the process is
/// out of sockets). Callers should treat those as fatal for the run.
pub trait Prober {
    fn probe(&self, target: SocketAddrV4, timeout: Duration) -> Result<ProbeOutcome>;
}
