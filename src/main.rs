//! Rotor - Multi-Chain Micro Arbitrage Bot
//!
//! Run with: cargo run -- [--config rotor.toml] [--dry-run] [--max-ticks N]
//!
//! Startup:
//! - Load and validate configuration
//! - Connect and verify every configured chain (failures are skipped)
//! - Build one worker per chain and hand them to the controller

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use console::style;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rotor::brain::{Bandit, QuickScanResult};
use rotor::config::Config;
use rotor::controller::{Controller, ControllerSettings};
use rotor::executor::OperatorWallet;
use rotor::gas_oracle::{ChainlinkOracle, PriceOracle};
use rotor::rpc::ChainClients;
use rotor::store::{JsonStore, MetricStore};
use rotor::worker::Worker;

/// Windowed metrics older than this are dropped at startup
const METRIC_RETENTION_DAYS: i64 = 30;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Load a TOML config instead of the environment
    #[arg(long)]
    config: Option<PathBuf>,

    /// Never broadcast, whatever the config says
    #[arg(long)]
    dry_run: bool,

    /// Stop after this many ticks
    #[arg(long)]
    max_ticks: Option<u64>,
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 🎰 ROTOR - Multi-Chain Micro Arbitrage").cyan().bold()
    );
    println!(
        "{}",
        style("    Thompson Sampling | Two-Leg V3 Routes | Re-Quote Before Send").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    if cli.dry_run {
        config.dry_run = true;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    print_banner();

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        error!("Please check your .env file");
        return Err(e);
    }

    config.print_summary();
    println!();

    let wallet = OperatorWallet::from_optional(config.private_key.as_deref())?;
    let store: Arc<JsonStore> = Arc::new(JsonStore::open(&config.db_path));
    let pruned = store.cleanup_old_metrics(METRIC_RETENTION_DAYS);
    if pruned > 0 {
        info!("Pruned {} metrics older than {} days", pruned, METRIC_RETENTION_DAYS);
    }

    // =============================================
    // CONNECT CHAINS
    // =============================================
    println!("{}", style("═══ CONNECTING CHAINS ═══").blue().bold());

    let mut connected: Vec<ChainClients> = Vec::new();
    for &chain in &config.chains {
        let Some(endpoints) = config.endpoints_for(chain) else {
            warn!("{} has no endpoints configured, skipping", chain);
            continue;
        };
        info!("Connecting {} ({})", chain.info().name, chain.info().chain_id);

        let eth_wallet = wallet.as_ref().map(|w| w.ethereum_wallet(chain.info().chain_id));
        let clients = match ChainClients::connect(endpoints, eth_wallet) {
            Ok(c) => c,
            Err(e) => {
                warn!("{} setup failed, skipping: {:#}", chain, e);
                continue;
            }
        };

        match clients.verify(wallet.as_ref().map(|w| w.address())).await {
            Ok(_) => connected.push(clients),
            Err(e) => warn!("{} verification failed, skipping: {:#}", chain, e),
        }
    }

    let read_providers = connected.iter().map(|c| (c.chain, c.read.clone())).collect::<HashMap<_, _>>();
    let oracle: Arc<dyn PriceOracle> = Arc::new(ChainlinkOracle::new(read_providers));

    let mut workers = Vec::new();
    for clients in &connected {
        match Worker::from_clients(&config, clients, wallet.as_ref(), oracle.clone(), store.clone()) {
            Ok(worker) => workers.push(worker),
            Err(e) => warn!("{} worker setup failed, skipping: {:#}", clients.chain, e),
        }
    }

    if workers.is_empty() {
        return Err(eyre!("No chain could be initialized, nothing to do"));
    }

    // Quick probe at the smallest size, one quote per route
    for worker in &workers {
        match worker.probe().await {
            QuickScanResult { route_name: Some(route), profit_bps: Some(bps), .. } => {
                info!("{} probe: {} shows +{} bps", worker.chain(), route, bps)
            }
            _ => info!("{} probe: no positive edge at the smallest size", worker.chain()),
        }
    }

    let chains: Vec<_> = workers.iter().map(|w| w.chain()).collect();
    println!(
        "{} {} worker(s): {}",
        style("✓").green(),
        workers.len(),
        chains.iter().map(|c| c.key()).collect::<Vec<_>>().join(", ")
    );
    println!();

    // =============================================
    // MAIN LOOP
    // =============================================
    println!("{}", style("═══ RUNNING (Ctrl-C to stop) ═══").blue().bold());

    let bandit = Bandit::new(&chains, config.bandit_prior)?;
    let settings = ControllerSettings::from_config(&config, cli.max_ticks);
    let store: Arc<dyn MetricStore> = store;
    let mut controller = Controller::new(settings, bandit, workers, store)?;

    controller.run().await?;

    info!("👋 Shutdown complete");
    Ok(())
}
