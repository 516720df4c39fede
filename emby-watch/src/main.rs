use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use emby_monitor::logging::{init_logging, LoggingMode};
use emby_monitor::{
    ChangeEvent, ChangeKind, CycleOutcome, DerivedState, EmbyMonitor, MonitorConfig,
    MIN_POLL_INTERVAL,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

/// Emby Watch
///
/// Polls an Emby server and prints every state change: server health,
/// library counts, and what each monitored device is playing.
#[derive(Parser, Debug)]
#[command(name = "emby-watch")]
#[command(about = "Watch an Emby server and print state changes")]
#[command(version)]
pub struct Args {
    /// Emby server host name or IP address
    #[arg(long, env = "EMBY_HOST")]
    pub host: String,

    /// Emby server port
    #[arg(short, long, env = "EMBY_PORT", default_value = "8096")]
    pub port: u16,

    /// API key created in the Emby dashboard
    #[arg(short = 'k', long, env = "EMBY_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Connect over HTTPS
    #[arg(long, env = "EMBY_TLS")]
    pub tls: bool,

    /// Reject self-signed certificates
    #[arg(long)]
    pub strict_tls: bool,

    /// Comma separated device ids to monitor, or "all"
    #[arg(short, long, env = "EMBY_DEVICES", value_delimiter = ',', default_value = "all")]
    pub devices: Vec<String>,

    /// Polling interval in seconds
    #[arg(short, long, env = "EMBY_INTERVAL", default_value = "30")]
    pub interval: u64,

    /// Consecutive failed system-info polls before the server counts as offline
    #[arg(long, default_value = "1")]
    pub offline_threshold: u32,

    /// Run a single cycle, print the state and exit
    #[arg(long)]
    pub once: bool,

    /// Only check that the server answers with this key
    #[arg(long)]
    pub test_connection: bool,

    /// Print changes as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Log output: silent, development, debug or json
    #[arg(long, env = "EMBY_LOG_MODE", default_value = "development")]
    pub log_mode: String,
}

impl Args {
    pub fn interval_duration(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Validate command line arguments
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(anyhow::anyhow!("Host must not be empty"));
        }

        if self.api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("API key must not be empty"));
        }

        if self.port == 0 {
            return Err(anyhow::anyhow!("Port must not be 0"));
        }

        if self.interval_duration() < MIN_POLL_INTERVAL {
            return Err(anyhow::anyhow!(
                "Interval must be at least {}s, got {}s",
                MIN_POLL_INTERVAL.as_secs(),
                self.interval
            ));
        }

        if self.offline_threshold == 0 {
            return Err(anyhow::anyhow!("Offline threshold must be at least 1"));
        }

        if self.once && self.test_connection {
            return Err(anyhow::anyhow!(
                "--once and --test-connection cannot be combined"
            ));
        }

        self.log_mode
            .parse::<LoggingMode>()
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        Ok(())
    }

    pub fn monitor_config(&self) -> Result<MonitorConfig> {
        MonitorConfig::builder(self.host.trim(), self.api_key.trim())
            .with_port(self.port)
            .with_tls(self.tls)
            .accept_invalid_certs(!self.strict_tls)
            .with_devices(&self.devices)
            .with_poll_interval(self.interval_duration())
            .with_offline_threshold(self.offline_threshold)
            .build()
            .context("Invalid monitor configuration")
    }
}

fn print_change(change: &ChangeEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(change)?);
        return Ok(());
    }

    let marker = match change.kind {
        ChangeKind::Added => "+",
        ChangeKind::Updated => "~",
        ChangeKind::Removed => "-",
    };
    println!(
        "{} {} {} = {}",
        change.timestamp.format("%H:%M:%S"),
        marker,
        change.key,
        change.value
    );
    Ok(())
}

fn print_state(state: &DerivedState, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(state)?);
        return Ok(());
    }

    for (key, value) in state.entities() {
        println!("{} = {}", key, value);
    }
    Ok(())
}

async fn run_once(monitor: &EmbyMonitor, json: bool) -> Result<()> {
    let outcome = monitor.run_cycle().await;
    info!(outcome = ?outcome, "Cycle finished");

    if let CycleOutcome::Rejected(e) = outcome {
        return Err(anyhow::anyhow!("State was rejected: {}", e));
    }

    let state = monitor
        .current_state()
        .context("No state was published")?;
    print_state(&state, json)
}

async fn watch(monitor: &EmbyMonitor, json: bool) -> Result<()> {
    let mut changes = monitor.changes();
    let handle = monitor.start().context("Failed to start polling")?;
    info!(
        interval = ?monitor.config().poll_interval,
        devices = ?monitor.config().monitored_devices,
        "Watching, press Ctrl+C to stop"
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
            received = changes.recv() => match received {
                Ok(change) => print_change(&change, json)?,
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Output fell behind, some changes were dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    handle.shutdown().await.context("Failed to stop polling")?;
    if json {
        println!("{}", serde_json::to_string(&monitor.stats())?);
    } else {
        info!("{}", monitor.stats());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;

    let mode: LoggingMode = args.log_mode.parse().map_err(|e| anyhow::anyhow!("{}", e))?;
    init_logging(mode).context("Failed to initialize logging")?;

    let monitor = EmbyMonitor::new(args.monitor_config()?).context("Failed to create monitor")?;

    if args.test_connection {
        let info = monitor.test_connection().await.context("Connection test failed")?;
        println!(
            "Connected to {} (version {})",
            info.name.as_deref().unwrap_or("Emby"),
            info.version.as_deref().unwrap_or("unknown")
        );
        return Ok(());
    }

    let result = if args.once {
        run_once(&monitor, args.json).await
    } else {
        watch(&monitor, args.json).await
    };

    if let Err(e) = &result {
        error!("emby-watch failed: {:#}", e);
    }
    result
}
