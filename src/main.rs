mod cli;
mod config;
mod metrics;
mod output;
mod prober;
mod scheduler;
mod stats;
mod timestamp;
mod util;

use clap::Parser;
use cli::Args;
use config::ProbeConfig;
use output::Presenter;
use prober::tcp_connect::TcpConnectProber;
use scheduler::Scheduler;
use stats::StatsAggregator;

use std::net::SocketAddrV4;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ProbeConfig::load(&args).await?;
    let log_level = config.get_tracing_level()?;

    // Init tracing with configured log level; stdout is reserved for probe output
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()
                         .add_directive(format!("tcpping={}", log_level.as_str().to_lowercase()).parse()?))
        .with_writer(std::io::stderr)
        .init();

    let address = util::resolve_ipv4(&args.host).await?;
    let target = SocketAddrV4::new(address, config.port);
    info!("probing {} ({})", args.host, target);

    if let Some(metrics_addr) = config.metrics_addr {
        metrics::initialize_metrics(config.enable_latency_history)?;
        tokio::spawn(metrics::serve_metrics(metrics_addr));
    }

    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone())?;

    let scheduler = Scheduler::new(config.interval()?, config.count)?;
    let mut presenter = Presenter::new(std::io::stdout(), config.display, config.audible);
    let mut aggregator = StatsAggregator::new(config.skip);
    let metrics_label = target.to_string();
    let export_metrics = config.metrics_addr.is_some();

    presenter.header(&args.host, target)?;
    let started = timestamp::monotonic_ns();

    let result = scheduler
        .run(Arc::new(TcpConnectProber), target, config.timeout(), &cancel, |seq, outcome| {
            let warm_up = aggregator.in_skip_window();
            aggregator.record(outcome);
            if export_metrics && !warm_up {
                metrics::observe_probe(&metrics_label, &outcome, &aggregator.snapshot());
            }
            presenter.probe(target, seq, &outcome, warm_up)
        })
        .await;

    let sent = result?;
    let elapsed_ms = timestamp::elapsed_ms(started, timestamp::monotonic_ns());
    debug!(sent, elapsed_ms, "run finished");

    presenter.summary(&args.host, target, &aggregator.snapshot(), elapsed_ms)?;
    Ok(())
}

/// Cancels `cancel` on SIGINT or SIGTERM. The scheduler checks it between probes.
fn spawn_signal_listener(cancel: CancellationToken) -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => debug!("received SIGINT"),
            _ = terminate.recv() => debug!("received SIGTERM"),
        }
        cancel.cancel();
    });
    Ok(())
}
