use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::net::SocketAddrV4;

use crate::prober::ProbeOutcome;
use crate::stats::AggregateStats;

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Header, one line per probe, text summary.
    #[default]
    Normal,
    /// Text summary only.
    Quiet,
    /// Summary as a single JSON object.
    Json,
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    host: &'a str,
    address: String,
    port: u16,
    elapsed_ms: f64,
    #[serde(flatten)]
    stats: &'a AggregateStats,
}

/// Renders probe outcomes and the final summary to any writer.
pub struct Presenter<W: Write> {
    out: W,
    mode: DisplayMode,
    audible: bool,
}

impl<W: Write> Presenter<W> {
    pub fn new(out: W, mode: DisplayMode, audible: bool) -> Self {
        Self { out, mode, audible }
    }

    pub fn header(&mut self, host: &str, target: SocketAddrV4) -> Result<()> {
        if self.mode == DisplayMode::Normal {
            writeln!(
                self.out,
                "TCP PING {} ({}) tcp port {}",
                host,
                target.ip(),
                target.port()
            )?;
        }
        Ok(())
    }

    pub fn probe(
        &mut self,
        target: SocketAddrV4,
        seq: u64,
        outcome: &ProbeOutcome,
        warm_up: bool,
    ) -> Result<()> {
        if self.mode != DisplayMode::Normal {
            return Ok(());
        }
        let ip = target.ip();
        let suffix = if warm_up { " (warm-up)" } else { "" };
        match outcome {
            ProbeOutcome::Success { rtt_ms } => {
                write!(self.out, "{}: seq={} time={:.3} ms{}", ip, seq, rtt_ms, suffix)?;
                if self.audible {
                    write!(self.out, "\x07")?;
                }
                writeln!(self.out)?;
            }
            ProbeOutcome::Timeout => writeln!(self.out, "{}: seq={} timeout{}", ip, seq, suffix)?,
            ProbeOutcome::ConnectionError => {
                writeln!(self.out, "{}: seq={} connection error{}", ip, seq, suffix)?
            }
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn summary(
        &mut self,
        host: &str,
        target: SocketAddrV4,
        stats: &AggregateStats,
        elapsed_ms: f64,
    ) -> Result<()> {
        if self.mode == DisplayMode::Json {
            let summary = JsonSummary {
                host,
                address: target.ip().to_string(),
                port: target.port(),
                elapsed_ms,
                stats,
            };
            serde_json::to_writer(&mut self.out, &summary)?;
            writeln!(self.out)?;
            self.out.flush()?;
            return Ok(());
        }

        writeln!(self.out, "--- {} tcp ping statistics ---", host)?;
        writeln!(
            self.out,
            "{} pings, {} success, {} failed, {:.1}% loss, time: {:.3} ms",
            stats.total_count, stats.success_count, stats.fail_count, stats.loss_ratio, elapsed_ms
        )?;
        writeln!(
            self.out,
            "rtt min/avg/max/range/jitter = {:.3}/{:.3}/{:.3}/{:.3}/{:.3} ms",
            stats.min_rtt.unwrap_or(0.0),
            stats.avg_rtt.unwrap_or(0.0),
            stats.max_rtt.unwrap_or(0.0),
            stats.range_rtt.unwrap_or(0.0),
            stats.jitter_avg.unwrap_or(0.0)
        )?;
        self.out.flush()?;
        Ok(())
    }
}
