use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use tcp_state_exporter::{
    Config, MetricsServer, ProcNetTcpReader, StaticLabels, TcpStateCollector,
};

/// Prometheus exporter for TCP connection states and listening ports.
#[derive(Parser)]
#[command(name = "tcp-state-exporter", about)]
struct Cli {
    /// Path to an optional YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// The port number for the metrics server to listen on.
    #[arg(short, long)]
    port: Option<u16>,

    /// Logging verbosity level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print version information and exit.
    Version,
}

/// Build-time version info.
mod version {
    pub const RELEASE: &str = env!("CARGO_PKG_VERSION");

    /// Git commit hash (set at build time via env, or "unknown").
    pub fn git_commit() -> &'static str {
        option_env!("GIT_COMMIT").unwrap_or("unknown")
    }

    /// Full version string with platform info.
    pub fn full() -> String {
        format!(
            "{} (commit: {}, {}/{})",
            RELEASE,
            git_commit(),
            std::env::consts::OS,
            std::env::consts::ARCH,
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Version) = &cli.command {
        println!("tcp-state-exporter {}", version::full());
        return Ok(());
    }

    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;

    fmt().with_env_filter(filter).with_target(true).init();

    let mut cfg = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(port) = cli.port {
        cfg.set_port(port);
    }
    cfg.validate().context("invalid configuration")?;

    tracing::info!(
        version = version::RELEASE,
        commit = version::git_commit(),
        "starting tcp-state-exporter",
    );

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    rt.block_on(async { run(cfg).await })
}

async fn run(cfg: Config) -> Result<()> {
    let labels = StaticLabels::from_env(&cfg.label_prefix);
    labels.validate().context("invalid static labels")?;
    if !labels.is_empty() {
        tracing::info!(labels = ?labels.keys().collect::<Vec<_>>(), "static labels");
    }

    let reader = ProcNetTcpReader::new(&cfg.proc_path, cfg.include_ipv6);
    reader
        .probe()
        .context("socket table is not readable")?;

    let collector = TcpStateCollector::new(reader, &cfg.collector(), labels)
        .context("building TCP state collector")?;

    let server = MetricsServer::new(&cfg);
    server.register(collector)?;
    server.start().await?;

    let ctrl_c = tokio::signal::ctrl_c();
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("registering SIGTERM handler")?;

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }

    server.stop().await?;

    tracing::info!("tcp-state-exporter stopped");

    Ok(())
}
