// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! The uiprobe daemon binary.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uiprobe_backend::BackendRegistry;
use uiprobe_backend_mock::MockBackend;
use uiprobe_config::DaemonConfig;
use uiprobe_daemon::{run_all_scripts, serve};
use uiprobe_protocol::ExtensionRegistry;

#[derive(Parser, Debug)]
#[command(name = "uiprobed", version, about = "Remote UI introspection daemon")]
struct Args {
    /// Path to the daemon configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip running start-up scripts.
    #[arg(long)]
    no_startup: bool,

    /// Override the bind address from configuration (`address:port`).
    #[arg(long)]
    bind: Option<String>,

    /// Enable request/response debug logging.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let (config, config_missing) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("daemon starting failure: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let level = if args.debug {
        "debug".to_owned()
    } else {
        config.log_level.clone().unwrap_or_else(|| "info".into())
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .init();

    if let Some(path) = config_missing {
        warn!(path = %path.display(), "configuration file does not exist, using defaults");
    }

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("daemon starting failure: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Load configuration, treating a missing file like the absence of one.
fn load_config(args: &Args) -> Result<(DaemonConfig, Option<PathBuf>)> {
    match &args.config {
        Some(path) if path.is_file() => {
            let config = uiprobe_config::load_config(Some(path)).context("load configuration")?;
            Ok((config, None))
        }
        Some(path) => {
            let config = uiprobe_config::load_config(None).context("load configuration")?;
            Ok((config, Some(path.clone())))
        }
        None => {
            let config = uiprobe_config::load_config(None).context("load configuration")?;
            Ok((config, None))
        }
    }
}

async fn run(args: Args, config: DaemonConfig) -> Result<()> {
    for warning in
        uiprobe_config::validate_config(&config).context("validate configuration")?
    {
        warn!(%warning, "configuration warning");
    }

    if args.no_startup {
        info!("start-up scripts skipped");
    } else {
        let count = run_all_scripts(&config.startup.scripts_dir)
            .context("run start-up scripts")?;
        info!(count, "start-up scripts finished");
    }

    let registry = build_registry();
    let extensions = Arc::new(ExtensionRegistry::new());

    let bind = args
        .bind
        .unwrap_or_else(|| config.connection.bind_addr());
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    info!(bind = %bind, backends = registry.len(), "uiprobe daemon listening");

    serve(listener, registry, extensions).await
}

/// Platform adapters register here, explicitly, before the registry
/// freezes.  The shipped build carries the in-memory demo back-end.
fn build_registry() -> Arc<BackendRegistry> {
    let mut builder = BackendRegistry::builder();
    builder.register(Box::new(MockBackend::sample()));
    Arc::new(builder.build())
}
