//! Configuration for Rotor
//!
//! Everything is read once at startup, either from the environment (with
//! `.env` support) or from a TOML file, and is immutable afterwards.

use crate::chains::{parse_chain_list, Chain};
use alloy_primitives::{Address, U256};
use eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

// ============================================
// EXECUTION MODE
// ============================================

/// How a worker's executor behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Scan, validate and account, but never broadcast
    DryRun,

    /// Sign and broadcast through the deployed executor contract
    /// CAUTION: This uses real funds!
    Live,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::DryRun => write!(f, "DRY_RUN"),
            ExecutionMode::Live => write!(f, "LIVE"),
        }
    }
}

// ============================================
// PER-CHAIN ENDPOINTS
// ============================================

/// RPC endpoints and deployment for one chain. Quoting, simulation and
/// submission are separate so load on one does not slow the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEndpoints {
    pub chain: Chain,
    pub read: String,
    pub sim: String,
    pub send: String,
    #[serde(default)]
    pub ws: Option<String>,

    /// Deployed arbitrage executor contract
    #[serde(default)]
    pub executor: Option<Address>,
}

impl ChainEndpoints {
    /// Endpoints from `RPC_<CHAIN>`, `RPC_<CHAIN>_SIM`, `RPC_<CHAIN>_SEND`,
    /// `WS_<CHAIN>` and `EXECUTOR_<CHAIN>`
    pub fn from_env(chain: Chain) -> Result<Self> {
        let key = chain.key().to_uppercase();
        let read = env::var(format!("RPC_{}", key))
            .unwrap_or_else(|_| chain.info().default_rpc.to_string());
        let sim = env::var(format!("RPC_{}_SIM", key)).unwrap_or_else(|_| read.clone());
        let send = env::var(format!("RPC_{}_SEND", key)).unwrap_or_else(|_| read.clone());
        let ws = env::var(format!("WS_{}", key)).ok().filter(|s| !s.is_empty());

        let executor = match env::var(format!("EXECUTOR_{}", key)) {
            Ok(s) if !s.trim().is_empty() => Some(
                Address::from_str(s.trim())
                    .wrap_err_with(|| format!("Invalid EXECUTOR_{} address", key))?,
            ),
            _ => None,
        };

        Ok(Self { chain, read, sim, send, ws, executor })
    }

    /// Public defaults for a chain, no executor
    pub fn defaults(chain: Chain) -> Self {
        let read = chain.info().default_rpc.to_string();
        Self {
            chain,
            sim: read.clone(),
            send: read.clone(),
            read,
            ws: None,
            executor: None,
        }
    }
}

// ============================================
// MAIN CONFIGURATION
// ============================================

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // ========== Chains ==========
    /// Active chain set (bandit arms)
    pub chains: Vec<Chain>,

    // ========== Cadence ==========
    /// Delay between ticks
    pub tick_ms: u64,

    /// Decision epoch: how often the bandit may switch chains
    pub decision_ms: u64,

    // ========== Profit Thresholds ==========
    /// Absolute net profit floor in USD
    pub min_profit_usd: f64,

    /// Net profit must also be at least gas * this multiple
    pub gas_mult: f64,

    /// Maximum quote drift between scan and validation
    pub max_slippage_bps: u64,

    /// Seconds until the on-chain deadline of a submitted trade
    pub deadline_seconds: u64,

    // ========== Trade Sizes ==========
    /// Probed trade sizes in whole stable units
    pub trade_sizes_usd: Vec<u64>,

    /// Decimals of the stable asset (USDC = 6)
    pub stable_decimals: u8,

    // ========== Bandit ==========
    /// Tick latency above which a profitable tick is not rewarded
    pub reward_latency_ms: u64,

    /// Initial Beta pseudo-count for both success and failure
    pub bandit_prior: f64,

    /// Pull toward the prior at each decision epoch (1.0 = off)
    pub bandit_decay: f64,

    // ========== Storage & Mode ==========
    /// JSON store file
    pub db_path: String,

    /// Never broadcast when set
    pub dry_run: bool,

    /// Default tracing directive
    pub log_level: String,

    /// Operator key (never written back to disk)
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,

    // ========== Endpoints ==========
    pub endpoints: Vec<ChainEndpoints>,
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let chains = parse_chain_list(
            &env::var("CHAINS").unwrap_or_else(|_| "base,arbitrum,optimism".to_string()),
        )?;

        let endpoints = chains
            .iter()
            .map(|c| ChainEndpoints::from_env(*c))
            .collect::<Result<Vec<_>>>()?;

        let defaults = Self::default();

        Ok(Self {
            chains,
            tick_ms: env_or("TICK_MS", defaults.tick_ms),
            decision_ms: env_or("DECISION_MS", defaults.decision_ms),
            min_profit_usd: env_or("MIN_PROFIT_USD", defaults.min_profit_usd),
            gas_mult: env_or("GAS_MULT", defaults.gas_mult),
            max_slippage_bps: env_or("MAX_SLIPPAGE_BPS", defaults.max_slippage_bps),
            deadline_seconds: env_or("DEADLINE_SECONDS", defaults.deadline_seconds),
            trade_sizes_usd: match env::var("TRADE_SIZES_USD") {
                Ok(s) => parse_sizes(&s)?,
                Err(_) => defaults.trade_sizes_usd,
            },
            stable_decimals: env_or("STABLE_DECIMALS", defaults.stable_decimals),
            reward_latency_ms: env_or("REWARD_LATENCY_MS", defaults.reward_latency_ms),
            bandit_prior: env_or("BANDIT_PRIOR", defaults.bandit_prior),
            bandit_decay: env_or("BANDIT_DECAY", defaults.bandit_decay),
            db_path: env::var("DB_PATH").unwrap_or(defaults.db_path),
            dry_run: env_or("DRY_RUN", defaults.dry_run),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            private_key: env::var("PRIVATE_KEY").ok().filter(|k| !k.trim().is_empty()),
            endpoints,
        })
    }

    /// Load configuration from a TOML file. The operator key still comes
    /// from the environment.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        dotenvy::dotenv().ok();

        let content = fs::read_to_string(path.as_ref())
            .wrap_err_with(|| format!("Failed to read {}", path.as_ref().display()))?;
        let mut config: Self = toml::from_str(&content)?;
        if config.private_key.is_none() {
            config.private_key = env::var("PRIVATE_KEY").ok().filter(|k| !k.trim().is_empty());
        }
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration before starting workers
    pub fn validate(&self) -> Result<()> {
        if self.chains.is_empty() {
            return Err(eyre!("CHAINS is empty - at least one chain is required"));
        }
        for chain in &self.chains {
            let ep = self
                .endpoints_for(*chain)
                .ok_or_else(|| eyre!("No endpoints configured for {}", chain))?;
            if ep.read.is_empty() {
                return Err(eyre!("Empty read RPC for {}", chain));
            }
        }
        if self.tick_ms == 0 || self.decision_ms == 0 {
            return Err(eyre!("TICK_MS and DECISION_MS must be positive"));
        }
        if self.trade_sizes_usd.is_empty() || self.trade_sizes_usd.contains(&0) {
            return Err(eyre!("TRADE_SIZES_USD must be a non-empty list of positive sizes"));
        }
        if self.stable_decimals > 30 {
            return Err(eyre!("STABLE_DECIMALS {} is out of range", self.stable_decimals));
        }
        if self.min_profit_usd < 0.0 || self.gas_mult < 0.0 {
            return Err(eyre!("MIN_PROFIT_USD and GAS_MULT must not be negative"));
        }
        if self.max_slippage_bps > 10_000 {
            return Err(eyre!(
                "MAX_SLIPPAGE_BPS must be at most 10000 (currently {})",
                self.max_slippage_bps
            ));
        }
        if self.bandit_prior <= 0.0 {
            return Err(eyre!("BANDIT_PRIOR must be positive"));
        }
        if self.bandit_decay <= 0.0 || self.bandit_decay > 1.0 {
            return Err(eyre!("BANDIT_DECAY must be in (0, 1]"));
        }

        // Live mode needs a key to sign with
        if !self.dry_run && self.private_key.is_none() {
            return Err(eyre!("Live mode requires PRIVATE_KEY (or set DRY_RUN=true)"));
        }

        Ok(())
    }

    /// Endpoints configured for `chain`
    pub fn endpoints_for(&self, chain: Chain) -> Option<&ChainEndpoints> {
        self.endpoints.iter().find(|e| e.chain == chain)
    }

    /// Mode a worker on `chain` runs in: live only with an executor, a key
    /// and dry-run off
    pub fn execution_mode(&self, chain: Chain) -> ExecutionMode {
        let has_executor = self
            .endpoints_for(chain)
            .map(|e| e.executor.is_some())
            .unwrap_or(false);

        if !self.dry_run && has_executor && self.private_key.is_some() {
            ExecutionMode::Live
        } else {
            ExecutionMode::DryRun
        }
    }

    /// Trade sizes as raw stable-asset amounts (USD * 10^decimals)
    pub fn trade_sizes_raw(&self) -> Vec<U256> {
        let unit = U256::from(10u64).pow(U256::from(self.stable_decimals));
        self.trade_sizes_usd
            .iter()
            .map(|usd| U256::from(*usd) * unit)
            .collect()
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        let chains: Vec<&str> = self.chains.iter().map(|c| c.key()).collect();
        let sizes: Vec<String> = self.trade_sizes_usd.iter().map(|s| format!("${}", s)).collect();

        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║                 ROTOR - CONFIGURATION                      ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Mode:              {:^40} ║", if self.dry_run { "DRY_RUN" } else { "LIVE" });
        println!("║ Chains:            {:^40} ║", chains.join(", "));
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ CADENCE                                                    ║");
        println!("║ • Tick:            {:>37} ms ║", self.tick_ms);
        println!("║ • Decision Epoch:  {:>37} ms ║", self.decision_ms);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ PROFIT THRESHOLDS                                          ║");
        println!("║ • Min Net Profit:  ${:<39.2} ║", self.min_profit_usd);
        println!("║ • Gas Multiple:    {:<39.2}x ║", self.gas_mult);
        println!("║ • Max Slippage:    {:>36} bps ║", self.max_slippage_bps);
        println!("║ • Trade Sizes:     {:^40} ║", sizes.join(","));
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ BANDIT                                                     ║");
        println!("║ • Prior:           {:^40.1} ║", self.bandit_prior);
        println!("║ • Decay:           {:^40.3} ║", self.bandit_decay);
        println!("║ • Reward Latency:  {:>37} ms ║", self.reward_latency_ms);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ EXECUTION                                                  ║");
        for chain in &self.chains {
            let executor = self
                .endpoints_for(*chain)
                .and_then(|e| e.executor)
                .map(|a| format!("{:#x}", a))
                .unwrap_or_else(|| "✗ Not Deployed".to_string());
            println!("║ • {:<16} {:^40} ║", chain.key(), truncate(&executor, 40));
        }
        println!("║ • Signer Key:      {:^40} ║",
            if self.private_key.is_some() { "✓ Configured" } else { "✗ Not Set" }
        );
        println!("║ • Store:           {:^40} ║", truncate(&self.db_path, 40));
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        let chains = vec![Chain::Base, Chain::Arbitrum, Chain::Optimism];
        let endpoints = chains.iter().map(|c| ChainEndpoints::defaults(*c)).collect();

        Self {
            chains,
            tick_ms: 700,
            decision_ms: 5000,
            min_profit_usd: 0.50,
            gas_mult: 1.7,
            max_slippage_bps: 50,
            deadline_seconds: 60,
            trade_sizes_usd: vec![25, 50, 100, 250, 500, 1000],
            stable_decimals: 6,
            reward_latency_ms: 1500,
            bandit_prior: 2.0,
            bandit_decay: 1.0,
            db_path: "./bot-data.json".to_string(),
            dry_run: true,
            log_level: "info".to_string(),
            private_key: None,
            endpoints,
        }
    }
}

/// Read and parse an env var, falling back to `default` when unset or invalid
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse "25,50,100" into whole-unit sizes
pub fn parse_sizes(s: &str) -> Result<Vec<u64>> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<u64>()
                .map_err(|e| eyre!("Invalid trade size '{}': {}", p, e))
        })
        .collect()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max - 1).collect();
        format!("{}…", head)
    }
}

// ============================================
// TESTS
// ============================================
