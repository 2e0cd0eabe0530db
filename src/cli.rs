use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// TCP based ping: times the three-way handshake to a host and port
#[derive(Parser, Debug, Clone)]
#[command(name = "tcpping")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Host to probe (IPv4 address or hostname)
    pub host: String,

    /// TCP port number [default: 443]
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Number of probes to send [default: unlimited]
    #[arg(short = 'c', long = "count")]
    pub count: Option<u64>,

    /// Seconds between probes [default: 1]
    #[arg(short = 'i', long = "interval")]
    pub interval: Option<f64>,

    /// Seconds to wait for each handshake [default: 3]
    #[arg(short = 't', long = "timeout")]
    pub timeout: Option<u64>,

    /// Leading probes to exclude from statistics [default: 0]
    #[arg(short = 's', long = "skip")]
    pub skip: Option<u64>,

    /// Only print the final summary
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Print the final summary as JSON
    #[arg(long = "json", conflicts_with = "quiet")]
    pub json: bool,

    /// Ring the terminal bell on each successful probe
    #[arg(short = 'a', long = "audible")]
    pub audible: bool,

    /// JSON config file with default settings
    #[arg(long = "config", env = "TCPPING_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level")]
    pub log_level: Option<String>,

    /// Serve Prometheus metrics on this address
    #[arg(long = "metrics-addr")]
    pub metrics_addr: Option<SocketAddr>,

    /// Export a latency histogram alongside the current-latency gauge
    #[arg(long = "latency-history")]
    pub latency_history: bool,
}
