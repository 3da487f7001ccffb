//! sefazd — the SEFAZ status daemon.
//!
//! Assembles the registry, the hyper transport, and the status engine, then
//! either serves the REST API or runs a single check.
//!
//! # Usage
//!
//! ```text
//! sefazd serve --config sefaz.toml --listen 0.0.0.0:8080
//! sefazd check SP --environment homologation
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sefaz_core::SefazConfig;
use sefaz_engine::StatusEngine;
use sefaz_probe::HyperTransport;
use sefaz_registry::RegionRegistry;

const DEFAULT_FILTER: &str = "info,sefazd=debug,sefaz=debug";
const DEFAULT_CONFIG: &str = "sefaz.toml";

#[derive(Parser)]
#[command(name = "sefazd", about = "SEFAZ regional and national status aggregator")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Configuration file. Defaults apply when it does not exist.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Registry document path, overriding the config file.
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the REST API.
    Serve {
        /// Address to listen on, overriding the config file.
        #[arg(long)]
        listen: Option<SocketAddr>,
    },

    /// Probe one region and print the aggregate as JSON.
    Check {
        /// Two-letter region code, e.g. SP.
        region: String,

        /// production or homologation.
        #[arg(long, short)]
        environment: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = load_config(&cli.config)?;
    if let Some(path) = cli.registry {
        config.registry.path = path;
    }

    match cli.command {
        Command::Serve { listen } => {
            if let Some(addr) = listen {
                config.server.listen = addr;
            }
            run_server(config).await
        }
        Command::Check {
            region,
            environment,
        } => run_check(config, &region, environment.as_deref()).await,
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: &Path) -> anyhow::Result<SefazConfig> {
    if path.exists() {
        let config = SefazConfig::from_file(path)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    } else {
        info!(path = %path.display(), "no configuration file, using defaults");
        Ok(SefazConfig::default())
    }
}

fn build_engine(config: &SefazConfig) -> anyhow::Result<StatusEngine> {
    let registry = RegionRegistry::open_or_seed(&config.registry.path).with_context(|| {
        format!("open registry {}", config.registry.path.display())
    })?;
    info!(path = %config.registry.path.display(), "region registry opened");

    let transport = HyperTransport::new().context("initialize TLS client")?;
    Ok(StatusEngine::from_config(config, registry, Arc::new(transport)))
}

async fn run_server(config: SefazConfig) -> anyhow::Result<()> {
    info!("sefazd starting");

    let engine = build_engine(&config)?;
    let policy = engine.policy();
    info!(
        fallback = policy.fallback,
        auto_heal = policy.auto_heal,
        mock_on_failure = policy.mock_on_failure,
        use_cache = policy.use_cache,
        "status engine initialized"
    );

    let router = sefaz_api::build_router(engine);
    let addr = config.server.listen;

    info!(%addr, "API server starting");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to install Ctrl-C handler");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("sefazd stopped");
    Ok(())
}

async fn run_check(
    config: SefazConfig,
    region: &str,
    environment: Option<&str>,
) -> anyhow::Result<()> {
    let engine = build_engine(&config)?;
    let status = engine.get_status(region, environment).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
