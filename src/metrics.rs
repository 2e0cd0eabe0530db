use prometheus::{Encoder, TextEncoder, HistogramOpts, HistogramVec, IntCounterVec, GaugeVec, Opts, Registry};
use warp::Filter;
use std::net::SocketAddr;
use once_cell::sync::{Lazy, OnceCell};

use crate::prober::ProbeOutcome;
use crate::stats::AggregateStats;

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

static LATENCY_GAUGE: Lazy<GaugeVec> = Lazy::new(|| {
    let opts = Opts::new("tcpping_rtt_milliseconds_current", "Latest TCP handshake latency in milliseconds");
    let gauge = GaugeVec::new(opts, &["target"]).expect("valid gauge definition");
    REGISTRY.register(Box::new(gauge.clone())).expect("gauge registered once");
    gauge
});

static PROBE_COUNTER: Lazy<IntCounterVec> = Lazy::new(|| {
    let opts = Opts::new("tcpping_probes_total", "Probes counted in statistics, by outcome");
    let ctr = IntCounterVec::new(opts, &["target", "outcome"]).expect("valid counter definition");
    REGISTRY.register(Box::new(ctr.clone())).expect("counter registered once");
    ctr
});

static LOSS_GAUGE: Lazy<GaugeVec> = Lazy::new(|| {
    let opts = Opts::new("tcpping_loss_ratio_percent", "Percentage of failed probes");
    let gauge = GaugeVec::new(opts, &["target"]).expect("valid gauge definition");
    REGISTRY.register(Box::new(gauge.clone())).expect("gauge registered once");
    gauge
});

static JITTER_GAUGE: Lazy<GaugeVec> = Lazy::new(|| {
    let opts = Opts::new("tcpping_jitter_milliseconds", "Mean absolute difference between consecutive RTTs");
    let gauge = GaugeVec::new(opts, &["target"]).expect("valid gauge definition");
    REGISTRY.register(Box::new(gauge.clone())).expect("gauge registered once");
    gauge
});

// Only set when latency history is enabled
static LATENCY_HIST: OnceCell<HistogramVec> = OnceCell::new();

pub fn initialize_metrics(enable_latency_history: bool) -> anyhow::Result<()> {
    Lazy::force(&LATENCY_GAUGE);
    Lazy::force(&PROBE_COUNTER);
    Lazy::force(&LOSS_GAUGE);
    Lazy::force(&JITTER_GAUGE);

    if enable_latency_history {
        LATENCY_HIST.get_or_try_init(|| -> anyhow::Result<HistogramVec> {
            let opts = HistogramOpts::new("tcpping_rtt_milliseconds", "TCP handshake latency in milliseconds")
                .buckets(vec![
                    0.05, 0.1, 0.2, 0.5, 1.0,
                    2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 250.0, 500.0, 1000.0
                ]);
            let hist = HistogramVec::new(opts, &["target"])?;
            REGISTRY.register(Box::new(hist.clone()))?;
            Ok(hist)
        })?;
    }
    Ok(())
}

pub async fn serve_metrics(addr: SocketAddr) {
    let metrics_route = warp::path!("metrics").map(|| {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buf) {
            tracing::error!("failed to encode metrics: {:?}", e);
            buf.clear();
        }
        warp::reply::with_header(buf, "Content-Type", prometheus::TEXT_FORMAT)
    });

    tracing::info!("serving metrics on http://{}/metrics", addr);
    warp::serve(metrics_route).run(addr).await;
}

/// Exports one counted probe and the aggregate it produced.
pub fn observe_probe(target: &str, outcome: &ProbeOutcome, stats: &AggregateStats) {
    PROBE_COUNTER
        .with_label_values(&[target, outcome.label()])
        .inc();

    if let ProbeOutcome::Success { rtt_ms } = outcome {
        LATENCY_GAUGE.with_label_values(&[target]).set(*rtt_ms);
        if let Some(hist) = LATENCY_HIST.get() {
            hist.with_label_values(&[target]).observe(*rtt_ms);
        }
    }

    LOSS_GAUGE.with_label_values(&[target]).set(stats.loss_ratio);
    if let Some(jitter) = stats.jitter_avg {
        JITTER_GAUGE.with_label_values(&[target]).set(jitter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatsAggregator;

    fn sample(name: &str, labels: &[&str]) -> Option<f64> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&REGISTRY.gather(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let prefix = format!("{}{{", name);
        text.lines()
            .filter(|line| line.starts_with(&prefix))
            .find(|line| labels.iter().all(|l| line.contains(l)))
            .and_then(|line| line.rsplit(' ').next())
            .and_then(|v| v.parse().ok())
    }

    #[test]
    fn probes_and_aggregates_exported() {
        initialize_metrics(true).unwrap();
        let target = "export-test:443";
        let mut agg = StatsAggregator::new(0);

        for outcome in [
            ProbeOutcome::Success { rtt_ms: 10.0 },
            ProbeOutcome::Timeout,
            ProbeOutcome::Success { rtt_ms: 14.0 },
            ProbeOutcome::ConnectionError,
        ] {
            agg.record(outcome);
            observe_probe(target, &outcome, &agg.snapshot());
        }

        let t = r#"target="export-test:443""#;
        assert_eq!(sample("tcpping_probes_total", &[t, r#"outcome="success""#]), Some(2.0));
        assert_eq!(sample("tcpping_probes_total", &[t, r#"outcome="timeout""#]), Some(1.0));
        assert_eq!(sample("tcpping_rtt_milliseconds_current", &[t]), Some(14.0));
        assert_eq!(sample("tcpping_loss_ratio_percent", &[t]), Some(50.0));
        assert_eq!(sample("tcpping_jitter_milliseconds", &[t]), Some(4.0));
        assert_eq!(sample("tcpping_rtt_milliseconds_count", &[t]), Some(2.0));
    }

    #[test]
    fn initialization_is_idempotent() {
        initialize_metrics(true).unwrap();
        initialize_metrics(true).unwrap();
        initialize_metrics(false).unwrap();
    }
}
