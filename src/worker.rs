//! The Worker
//!
//! One worker per chain. Each tick runs:
//! - Scan every (route, size) pair for the best candidate
//! - Re-check it against a fresh quote
//! - Execute it (live or dry run)
//! - Record the trade and a metric
//!
//! A tick never fails: errors become a failure metric and `TickResult::error`.

use std::sync::Arc;
use std::time::Instant;

use alloy_primitives::{Address, U256};
use chrono::Utc;
use eyre::{eyre, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{error, info, warn};

use crate::brain::{
    find_candidate, quick_scan, validate_candidate, Candidate, ProfitFilter, QuickScanResult,
    Validation,
};
use crate::chains::Chain;
use crate::config::{Config, ExecutionMode};
use crate::executor::{DryRunExecutor, LiveExecutor, OperatorWallet, TradeExecutor};
use crate::gas_oracle::PriceOracle;
use crate::routes::{routes_for, Route};
use crate::rpc::ChainClients;
use crate::simulator::{RpcSimulator, SimulationClient};
use crate::store::{Metric, MetricStore, TradeRecord, TradeStatus};

/// Immutable per-worker settings
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub chain: Chain,
    pub routes: Vec<Route>,

    /// Raw stable amounts, probed in order
    pub sizes: Vec<U256>,
    pub stable_decimals: u8,
    pub filter: ProfitFilter,
    pub max_slippage_bps: u64,
}

impl WorkerConfig {
    pub fn from_config(config: &Config, chain: Chain) -> Self {
        Self {
            chain,
            routes: routes_for(chain),
            sizes: config.trade_sizes_raw(),
            stable_decimals: config.stable_decimals,
            filter: ProfitFilter::from_config(config),
            max_slippage_bps: config.max_slippage_bps,
        }
    }
}

/// Outcome of one tick; the bandit's unit of feedback
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickResult {
    pub found: bool,
    pub executed: bool,
    pub success: bool,
    pub profit_net_usd: f64,
    pub gas_usd: f64,
    pub latency_ms: u64,
    pub route_name: Option<String>,
    pub error: Option<String>,
}

/// Diagnostic counters, independent of the bandit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerStats {
    pub tick_count: u64,
    pub success_count: u64,

    /// Percent
    pub success_rate: f64,
}

pub struct Worker {
    config: WorkerConfig,
    sim: Arc<dyn SimulationClient>,
    oracle: Arc<dyn PriceOracle>,
    executor: Arc<dyn TradeExecutor>,
    store: Arc<dyn MetricStore>,
    tick_count: u64,
    success_count: u64,
}

impl Worker {
    pub fn new(
        config: WorkerConfig,
        sim: Arc<dyn SimulationClient>,
        oracle: Arc<dyn PriceOracle>,
        executor: Arc<dyn TradeExecutor>,
        store: Arc<dyn MetricStore>,
    ) -> Self {
        Self {
            config,
            sim,
            oracle,
            executor,
            store,
            tick_count: 0,
            success_count: 0,
        }
    }

    /// Wire a worker to its chain's providers. Picks the live executor only
    /// when the config allows it for this chain.
    pub fn from_clients(
        config: &Config,
        clients: &ChainClients,
        wallet: Option<&OperatorWallet>,
        oracle: Arc<dyn PriceOracle>,
        store: Arc<dyn MetricStore>,
    ) -> Result<Self> {
        let chain = clients.chain;
        let worker_config = WorkerConfig::from_config(config, chain);
        let sim: Arc<dyn SimulationClient> = Arc::new(RpcSimulator::new(chain, clients.sim.clone()));

        let executor: Arc<dyn TradeExecutor> = match config.execution_mode(chain) {
            ExecutionMode::Live => {
                let wallet = wallet.ok_or_else(|| eyre!("{} is live but no wallet is loaded", chain))?;
                let contract = config
                    .endpoints_for(chain)
                    .and_then(|e| e.executor)
                    .ok_or_else(|| eyre!("{} is live but has no executor contract", chain))?;
                Arc::new(LiveExecutor::new(
                    chain,
                    clients.read.clone(),
                    clients.send.clone(),
                    wallet.address(),
                    contract,
                    config.max_slippage_bps,
                    config.deadline_seconds,
                ))
            }
            ExecutionMode::DryRun => Arc::new(DryRunExecutor::new(
                chain,
                clients.read.clone(),
                wallet.map(|w| w.address()),
                config.max_slippage_bps,
                config.stable_decimals,
            )),
        };

        info!(
            target: "worker",
            "{} worker ready: {} routes, {} sizes, {}",
            chain,
            worker_config.routes.len(),
            worker_config.sizes.len(),
            config.execution_mode(chain)
        );

        Ok(Self::new(worker_config, sim, oracle, executor, store))
    }

    pub fn chain(&self) -> Chain {
        self.config.chain
    }

    pub fn stats(&self) -> WorkerStats {
        let success_rate = if self.tick_count > 0 {
            self.success_count as f64 / self.tick_count as f64 * 100.0
        } else {
            0.0
        };
        WorkerStats {
            tick_count: self.tick_count,
            success_count: self.success_count,
            success_rate,
        }
    }

    /// Run one scan → validate → execute → record cycle
    pub async fn tick(&mut self) -> TickResult {
        let start = Instant::now();
        self.tick_count += 1;

        match self.run_tick(start).await {
            Ok(result) => result,
            Err(e) => {
                let latency_ms = elapsed_ms(start);
                error!(target: "worker", "❌ {} tick error: {:#}", self.config.chain, e);

                let metric = Metric::new(self.config.chain, 0.0, 0.0, false, latency_ms);
                if let Err(store_err) = self.store.insert_metric(metric) {
                    warn!(target: "worker", "{} could not record failure metric: {}", self.config.chain, store_err);
                }

                TickResult {
                    latency_ms,
                    error: Some(e.to_string()),
                    ..TickResult::default()
                }
            }
        }
    }

    async fn run_tick(&mut self, start: Instant) -> Result<TickResult> {
        let chain = self.config.chain;

        let scan = find_candidate(
            chain,
            self.sim.as_ref(),
            self.oracle.as_ref(),
            &self.config.routes,
            &self.config.sizes,
            self.config.stable_decimals,
            &self.config.filter,
        )
        .await?;

        let latency_ms = elapsed_ms(start);

        let Some(candidate) = scan.candidate else {
            self.store.insert_metric(Metric::new(chain, 0.0, 0.0, true, latency_ms))?;
            return Ok(TickResult {
                success: true,
                latency_ms,
                ..TickResult::default()
            });
        };

        let validation = validate_candidate(
            chain,
            self.sim.as_ref(),
            self.oracle.as_ref(),
            &candidate,
            self.config.stable_decimals,
            &self.config.filter,
            self.config.max_slippage_bps,
        )
        .await?;

        let validated = match validation {
            Validation::Valid(c) => c,
            Validation::Rejected(reason) => {
                warn!(target: "worker", "⚠️  {} {} rejected: {}", chain, candidate.route_name, reason);
                self.store
                    .insert_metric(Metric::new(chain, 0.0, candidate.gas_usd, false, latency_ms))?;
                return Ok(TickResult {
                    found: true,
                    gas_usd: candidate.gas_usd,
                    latency_ms,
                    route_name: Some(candidate.route_name),
                    error: Some(reason.to_string()),
                    ..TickResult::default()
                });
            }
        };

        self.execute(validated, start).await
    }

    async fn execute(&mut self, candidate: Candidate, start: Instant) -> Result<TickResult> {
        let chain = self.config.chain;
        let trade_id = trade_id(chain);

        self.store.insert_trade(TradeRecord {
            id: trade_id.clone(),
            chain,
            route_name: candidate.route_name.clone(),
            amount_in: candidate.amount_in,
            amount_out: candidate.amount_out,
            profit_usd: candidate.profit_net_usd,
            gas_usd: candidate.gas_usd,
            status: TradeStatus::Pending,
            tx_hash: None,
            created_at: Utc::now(),
        })?;

        let outcome = self.executor.execute_arbitrage(&candidate).await;
        let success = outcome.is_success();
        let tx_hash = outcome.tx_hash();

        let status = if success { TradeStatus::Confirmed } else { TradeStatus::Failed };
        self.store
            .update_trade_status(&trade_id, status, tx_hash.map(|h| format!("{:#x}", h)))?;

        let profit_net_usd = if success { candidate.profit_net_usd } else { 0.0 };
        let latency_ms = elapsed_ms(start);
        self.store
            .insert_metric(Metric::new(chain, profit_net_usd, candidate.gas_usd, success, latency_ms))?;

        if success {
            self.success_count += 1;
            info!(
                target: "worker",
                "✅ {} executed {} | net ${:.4} | {}",
                chain,
                candidate.route_name,
                candidate.profit_net_usd,
                tx_hash
                    .map(|h| self.executor.explorer_url(&h))
                    .unwrap_or_default()
            );
        } else {
            warn!(
                target: "worker",
                "{} execution of {} failed: {}",
                chain,
                candidate.route_name,
                outcome.error().unwrap_or_default()
            );
        }

        Ok(TickResult {
            found: true,
            executed: true,
            success,
            profit_net_usd,
            gas_usd: candidate.gas_usd,
            latency_ms,
            route_name: Some(candidate.route_name),
            error: outcome.error(),
        })
    }

    /// Liveness probe at the smallest configured size
    pub async fn probe(&self) -> QuickScanResult {
        match self.config.sizes.iter().min() {
            Some(&size) => quick_scan(self.sim.as_ref(), &self.config.routes, size).await,
            None => QuickScanResult::default(),
        }
    }

    pub fn wallet_address(&self) -> Option<Address> {
        self.executor.wallet_address()
    }

    pub async fn native_balance(&self) -> Result<U256> {
        self.executor.native_balance().await
    }

    pub async fn token_balance(&self, token: Address) -> Result<U256> {
        self.executor.token_balance(token).await
    }
}

/// `<chain>-<unix ms>-<6 random alphanumerics>`
pub fn trade_id(chain: Chain) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect();
    format!("{}-{}-{}", chain.key(), Utc::now().timestamp_millis(), suffix)
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
