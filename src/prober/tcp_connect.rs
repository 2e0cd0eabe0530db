use anyhow::{Context, Result};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::SocketAddrV4;
use std::os::fd::AsRawFd;
use std::time::Duration;
use tracing::{debug, trace};

use super::{ProbeOutcome, Prober};
use crate::timestamp::{elapsed_ms, monotonic_ns};

/// Times the TCP three-way handshake with a fresh non-blocking socket per probe.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnectProber;

enum WaitResult {
    Writable,
    TimedOut,
    Failed(io::Error),
}

impl Prober for TcpConnectProber {
    fn probe(&self, target: SocketAddrV4, timeout: Duration) -> Result<ProbeOutcome> {
        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
            .context("failed to create TCP socket")?;
        socket
            .set_nonblocking(true)
            .context("failed to put socket in non-blocking mode")?;

        let addr = SockAddr::from(target);
        let t0 = monotonic_ns();

        match socket.connect(&addr) {
            Ok(()) => {
                trace!("connect to {} completed synchronously", target);
            }
            Err(e) if is_in_progress(&e) => {
                let deadline = t0 + timeout.as_nanos();
                match wait_writable(&socket, deadline) {
                    WaitResult::Writable => {}
                    WaitResult::TimedOut => return Ok(ProbeOutcome::Timeout),
                    WaitResult::Failed(e) => {
                        debug!("waiting on {} failed: {}", target, e);
                        return Ok(ProbeOutcome::ConnectionError);
                    }
                }
                match socket.take_error() {
                    Ok(None) => {}
                    Ok(Some(e)) => {
                        debug!("connect to {} failed: {}", target, e);
                        return Ok(ProbeOutcome::ConnectionError);
                    }
                    Err(e) => {
                        debug!("reading SO_ERROR for {} failed: {}", target, e);
                        return Ok(ProbeOutcome::ConnectionError);
                    }
                }
            }
            Err(e) => {
                debug!("connect to {} failed immediately: {}", target, e);
                return Ok(ProbeOutcome::ConnectionError);
            }
        }

        let t1 = monotonic_ns();
        drop(socket);

        Ok(ProbeOutcome::Success {
            rtt_ms: elapsed_ms(t0, t1),
        })
    }
}

// EAGAIN from connect means no local port was available, not a pending handshake.
fn is_in_progress(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::EINPROGRESS)
}

/// Blocks until the socket is writable or `deadline_ns` passes. EINTR resumes
/// the wait with whatever budget is left.
fn wait_writable(socket: &Socket, deadline_ns: u128) -> WaitResult {
    loop {
        let now = monotonic_ns();
        if now >= deadline_ns {
            return WaitResult::TimedOut;
        }
        let remaining_ms = (deadline_ns - now).div_ceil(1_000_000);
        let timeout_ms = remaining_ms.min(libc::c_int::MAX as u128) as libc::c_int;

        let mut pfd = libc::pollfd {
            fd: socket.as_raw_fd(),
            events: libc::POLLOUT,
            revents: 0,
        };
        // SAFETY: `pfd` points to exactly one initialized pollfd that outlives the call.
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };

        match rc {
            0 => return WaitResult::TimedOut,
            n if n > 0 => return WaitResult::Writable,
            _ => {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    trace!("poll interrupted, retrying");
                    continue;
                }
                return WaitResult::Failed(err);
            }
        }
    }
}
