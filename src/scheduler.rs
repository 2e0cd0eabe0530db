use std::net::SocketAddrV4;
use std::sync::Arc;
use std::time::Duration;
use anyhow::{Context, Result};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::prober::{ProbeOutcome, Prober};

/// Paces probes at a fixed rate, one in flight at a time. A probe that overruns
/// the interval pushes the schedule back so the next one still waits a full
/// interval.
pub struct Scheduler {
    interval: Duration,
    count: Option<u64>,
}

impl Scheduler {
    /// `count` of `None` runs until cancelled.
    pub fn new(interval: Duration, count: Option<u64>) -> Result<Self> {
        if interval.is_zero() {
            anyhow::bail!("probe interval must be positive");
        }
        Ok(Self { interval, count })
    }

    fn exhausted(&self, sent: u64) -> bool {
        self.count.is_some_and(|limit| sent >= limit)
    }

    /// Runs probes until the count is reached or `cancel` fires, handing each
    /// outcome with its 1-based sequence number to `on_outcome`.
    ///
    /// Cancellation is only observed between probes; a probe in flight always
    /// finishes (bounded by `timeout`). Returns the number of probes sent.
    pub async fn run<P, F>(
        &self,
        prober: Arc<P>,
        target: SocketAddrV4,
        timeout: Duration,
        cancel: &CancellationToken,
        mut on_outcome: F,
    ) -> Result<u64>
    where
        P: Prober + Send + Sync + 'static,
        F: FnMut(u64, ProbeOutcome) -> Result<()>,
    {
        let mut seq = 0u64;
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.exhausted(seq) {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let started = Instant::now();
            let p = prober.clone();
            let outcome = tokio::task::spawn_blocking(move || p.probe(target, timeout))
                .await
                .context("probe task panicked")??;
            seq += 1;
            debug!(seq, outcome = outcome.label(), "probe finished");
            on_outcome(seq, outcome)?;

            if started.elapsed() >= self.interval {
                ticker.reset();
            }
        }

        Ok(seq)
    }
}
