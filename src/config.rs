use serde::{Deserialize, Serialize};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

use crate::cli::Args;
use crate::output::DisplayMode;

const MAX_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    pub port: u16,
    /// Absent means probe until interrupted.
    pub count: Option<u64>,
    pub interval_secs: f64,
    pub timeout_secs: u64,
    pub skip: u64,
    pub display: DisplayMode,
    pub audible: bool,
    pub log_level: String,
    pub metrics_addr: Option<SocketAddr>,
    pub enable_latency_history: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            port: 443,
            count: None,
            interval_secs: 1.0,
            timeout_secs: 3,
            skip: 0,
            display: DisplayMode::Normal,
            audible: false,
            log_level: "warn".to_string(),
            metrics_addr: None,
            enable_latency_history: false,
        }
    }
}

impl ProbeConfig {
    /// Defaults, then the optional JSON file, then explicit command-line flags.
    pub async fn load(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load_file_config(path).await?,
            None => Self::default(),
        };
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    async fn load_file_config(file_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(file_path)
            .await
            .with_context(|| format!("failed to read config file {}", file_path.display()))?;
        let config: ProbeConfig = serde_json::from_str(&content)
            .with_context(|| format!("invalid config file {}", file_path.display()))?;
        Ok(config)
    }

    fn apply_args(&mut self, args: &Args) {
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(count) = args.count {
            self.count = Some(count);
        }
        if let Some(interval) = args.interval {
            self.interval_secs = interval;
        }
        if let Some(timeout) = args.timeout {
            self.timeout_secs = timeout;
        }
        if let Some(skip) = args.skip {
            self.skip = skip;
        }
        if args.quiet {
            self.display = DisplayMode::Quiet;
        }
        if args.json {
            self.display = DisplayMode::Json;
        }
        if args.audible {
            self.audible = true;
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
        if let Some(addr) = args.metrics_addr {
            self.metrics_addr = Some(addr);
        }
        if args.latency_history {
            self.enable_latency_history = true;
        }
    }

    /// Get the log level as a tracing::Level
    pub fn get_tracing_level(&self) -> Result<tracing::Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(tracing::Level::TRACE),
            "debug" => Ok(tracing::Level::DEBUG),
            "info" => Ok(tracing::Level::INFO),
            "warn" | "warning" => Ok(tracing::Level::WARN),
            "error" => Ok(tracing::Level::ERROR),
            _ => Err(anyhow::anyhow!("Invalid log level: {}. Valid levels are: trace, debug, info, warn, error", self.log_level))
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("Port must be between 1 and 65535");
        }
        if self.count == Some(0) {
            anyhow::bail!("Count must be at least 1 (omit it to probe until interrupted)");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("Timeout must be at least 1 second");
        }
        let interval = self.interval()?;
        if interval.is_zero() || interval > MAX_INTERVAL {
            anyhow::bail!("Interval must be greater than 0 and at most {} seconds", MAX_INTERVAL.as_secs());
        }
        self.get_tracing_level().map(|_| ())
    }

    pub fn interval(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.interval_secs)
            .map_err(|_| anyhow::anyhow!("Invalid interval: {} seconds", self.interval_secs))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
