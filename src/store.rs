//! Metrics & Trade Store
//!
//! In-memory metrics, trades and bandit arm state with a JSON file backup.
//! The metric window is bounded; per-chain running totals are kept beside
//! it so statistics stay exact for the whole run however much of the
//! window has been dropped.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::brain::BanditArm;
use crate::chains::Chain;

/// Metrics kept in memory
const MAX_METRICS_IN_MEMORY: usize = 10_000;

/// Trades kept in memory
const MAX_TRADES_IN_MEMORY: usize = 10_000;

/// Metrics written to the backup file
const MAX_METRICS_ON_DISK: usize = 1_000;

/// Trades written to the backup file
const MAX_TRADES_ON_DISK: usize = 500;

/// Minimum time between automatic saves
const AUTOSAVE_INTERVAL_SECS: u64 = 30;

// ============================================
// RECORDS
// ============================================

/// One tick's accounting entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub chain: Chain,
    pub profit_usd: f64,
    pub gas_usd: f64,
    pub success: bool,
    pub latency_ms: u64,
    pub ts: DateTime<Utc>,
}

impl Metric {
    pub fn new(chain: Chain, profit_usd: f64, gas_usd: f64, success: bool, latency_ms: u64) -> Self {
        Self {
            chain,
            profit_usd,
            gas_usd,
            success,
            latency_ms,
            ts: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Pending,
    Confirmed,
    Failed,
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeStatus::Pending => write!(f, "pending"),
            TradeStatus::Confirmed => write!(f, "confirmed"),
            TradeStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub chain: Chain,
    pub route_name: String,
    pub amount_in: U256,
    pub amount_out: U256,
    pub profit_usd: f64,
    pub gas_usd: f64,
    pub status: TradeStatus,
    #[serde(default)]
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate statistics for one chain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainStats {
    pub chain: Chain,
    pub total_trades: u64,
    pub successful_trades: u64,
    pub total_profit_usd: f64,
    pub total_gas_usd: f64,
    pub net_profit_usd: f64,

    /// Percent
    pub win_rate: f64,
    pub avg_latency_ms: f64,
}

// ============================================
// STORE CONTRACT
// ============================================

/// Durable metric/trade store. Implementations serialize their own writes.
pub trait MetricStore: Send + Sync {
    fn insert_metric(&self, metric: Metric) -> Result<()>;
    fn insert_trade(&self, trade: TradeRecord) -> Result<()>;
    fn update_trade_status(&self, id: &str, status: TradeStatus, tx_hash: Option<String>) -> Result<()>;
    fn chain_stats(&self, chain: Chain) -> ChainStats;
    fn all_chain_stats(&self) -> Vec<ChainStats>;
    fn save_bandit_state(&self, arms: &[BanditArm]) -> Result<()>;
    fn load_bandit_state(&self) -> Vec<BanditArm>;
    fn flush(&self) -> Result<()>;
}

// ============================================
// JSON STORE
// ============================================

#[derive(Debug, Default, Clone, Copy)]
struct ChainTotals {
    trades: u64,
    successes: u64,
    profit_usd: f64,
    gas_usd: f64,
    latency_ms: u64,
}

#[derive(Debug, Default)]
struct StoreData {
    metrics: VecDeque<Metric>,
    trades: VecDeque<TradeRecord>,
    bandit: Vec<BanditArm>,
    totals: BTreeMap<Chain, ChainTotals>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    metrics: Vec<Metric>,
    #[serde(default)]
    trades: Vec<TradeRecord>,
    #[serde(default)]
    bandit: Vec<BanditArm>,
}

pub struct JsonStore {
    path: Option<PathBuf>,
    data: Mutex<StoreData>,
    last_saved: Mutex<Instant>,
}

impl JsonStore {
    /// Open a store backed by `path`, loading it if it exists. A corrupt
    /// file is logged and replaced on the next save.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut data = StoreData::default();

        match load_file(&path) {
            Ok(Some(file)) => {
                info!(
                    target: "store",
                    "Loaded {} ({} metrics, {} trades, {} arms)",
                    path.display(),
                    file.metrics.len(),
                    file.trades.len(),
                    file.bandit.len()
                );
                data.metrics = file.metrics.into();
                data.trades = file.trades.into();
                data.bandit = file.bandit;
            }
            Ok(None) => debug!(target: "store", "No store file at {}, starting fresh", path.display()),
            Err(e) => warn!(target: "store", "Could not load {}: {}, starting fresh", path.display(), e),
        }

        Self {
            path: Some(path),
            data: Mutex::new(data),
            last_saved: Mutex::new(Instant::now()),
        }
    }

    /// Store with no file backup
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: Mutex::new(StoreData::default()),
            last_saved: Mutex::new(Instant::now()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreData> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Write the backup file now
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let file = {
            let data = self.lock();
            StoreFile {
                metrics: tail(&data.metrics, MAX_METRICS_ON_DISK),
                trades: tail(&data.trades, MAX_TRADES_ON_DISK),
                bandit: data.bandit.clone(),
            }
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(path, json).wrap_err_with(|| format!("Failed to write {}", path.display()))?;

        *self.last_saved.lock().unwrap_or_else(|p| p.into_inner()) = Instant::now();
        debug!(target: "store", "Saved {}", path.display());
        Ok(())
    }

    fn autosave(&self) {
        let due = self
            .last_saved
            .lock()
            .map(|t| t.elapsed() >= Duration::from_secs(AUTOSAVE_INTERVAL_SECS))
            .unwrap_or(true);
        if due {
            if let Err(e) = self.save() {
                warn!(target: "store", "Autosave failed: {}", e);
            }
        }
    }

    /// Drop windowed metrics older than `days`; returns how many were removed.
    /// Running totals are unaffected.
    pub fn cleanup_old_metrics(&self, days: i64) -> usize {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        let mut data = self.lock();
        let before = data.metrics.len();
        data.metrics.retain(|m| m.ts >= cutoff);
        before - data.metrics.len()
    }

    /// Metrics currently in the window
    pub fn metrics(&self) -> Vec<Metric> {
        self.lock().metrics.iter().cloned().collect()
    }

    pub fn trades(&self) -> Vec<TradeRecord> {
        self.lock().trades.iter().cloned().collect()
    }

    pub fn trade(&self, id: &str) -> Option<TradeRecord> {
        self.lock().trades.iter().rev().find(|t| t.id == id).cloned()
    }
}

impl MetricStore for JsonStore {
    fn insert_metric(&self, metric: Metric) -> Result<()> {
        {
            let mut data = self.lock();

            let totals = data.totals.entry(metric.chain).or_default();
            totals.trades += 1;
            if metric.success {
                totals.successes += 1;
            }
            totals.profit_usd += metric.profit_usd;
            totals.gas_usd += metric.gas_usd;
            totals.latency_ms += metric.latency_ms;

            data.metrics.push_back(metric);
            while data.metrics.len() > MAX_METRICS_IN_MEMORY {
                data.metrics.pop_front();
            }
        }

        self.autosave();
        Ok(())
    }

    fn insert_trade(&self, trade: TradeRecord) -> Result<()> {
        let mut data = self.lock();
        data.trades.push_back(trade);
        while data.trades.len() > MAX_TRADES_IN_MEMORY {
            data.trades.pop_front();
        }
        Ok(())
    }

    fn update_trade_status(&self, id: &str, status: TradeStatus, tx_hash: Option<String>) -> Result<()> {
        let mut data = self.lock();
        match data.trades.iter_mut().rev().find(|t| t.id == id) {
            Some(trade) => {
                trade.status = status;
                if tx_hash.is_some() {
                    trade.tx_hash = tx_hash;
                }
            }
            None => warn!(target: "store", "Status update for unknown trade {}", id),
        }
        Ok(())
    }

    fn chain_stats(&self, chain: Chain) -> ChainStats {
        let totals = self.lock().totals.get(&chain).copied().unwrap_or_default();
        stats_from_totals(chain, &totals)
    }

    fn all_chain_stats(&self) -> Vec<ChainStats> {
        Chain::ALL.iter().map(|c| self.chain_stats(*c)).collect()
    }

    fn save_bandit_state(&self, arms: &[BanditArm]) -> Result<()> {
        {
            let mut data = self.lock();
            for arm in arms {
                match data.bandit.iter_mut().find(|a| a.chain == arm.chain) {
                    Some(existing) => *existing = *arm,
                    None => data.bandit.push(*arm),
                }
            }
        }

        self.autosave();
        Ok(())
    }

    fn load_bandit_state(&self) -> Vec<BanditArm> {
        self.lock().bandit.clone()
    }

    fn flush(&self) -> Result<()> {
        self.save()
    }
}

fn stats_from_totals(chain: Chain, t: &ChainTotals) -> ChainStats {
    let (win_rate, avg_latency_ms) = if t.trades > 0 {
        (
            t.successes as f64 / t.trades as f64 * 100.0,
            t.latency_ms as f64 / t.trades as f64,
        )
    } else {
        (0.0, 0.0)
    };

    ChainStats {
        chain,
        total_trades: t.trades,
        successful_trades: t.successes,
        total_profit_usd: t.profit_usd,
        total_gas_usd: t.gas_usd,
        net_profit_usd: t.profit_usd - t.gas_usd,
        win_rate,
        avg_latency_ms,
    }
}

fn tail<T: Clone>(items: &VecDeque<T>, n: usize) -> Vec<T> {
    items.iter().skip(items.len().saturating_sub(n)).cloned().collect()
}

fn load_file(path: &Path) -> Result<Option<StoreFile>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(id: &str) -> TradeRecord {
        TradeRecord {
            id: id.to_string(),
            chain: Chain::Base,
            route_name: "USDC-WETH-USDC 500/3000".to_string(),
            amount_in: U256::from(100_000_000u64),
            amount_out: U256::from(100_500_000u64),
            profit_usd: 0.4,
            gas_usd: 0.1,
            status: TradeStatus::Pending,
            tx_hash: None,
            created_at: Utc::now(),
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rotor-store-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_chain_stats() {
        let store = JsonStore::in_memory();
        store.insert_metric(Metric::new(Chain::Base, 0.40, 0.10, true, 300)).unwrap();
        store.insert_metric(Metric::new(Chain::Base, 0.0, 0.05, false, 900)).unwrap();
        store.insert_metric(Metric::new(Chain::Arbitrum, 1.0, 0.0, true, 100)).unwrap();

        let base = store.chain_stats(Chain::Base);
        assert_eq!(base.total_trades, 2);
        assert_eq!(base.successful_trades, 1);
        assert!((base.net_profit_usd - 0.25).abs() < 1e-12);
        assert_eq!(base.win_rate, 50.0);
        assert_eq!(base.avg_latency_ms, 600.0);

        let all = store.all_chain_stats();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].chain, Chain::Base);
        assert_eq!(all[3].total_trades, 0);
        assert_eq!(all[3].win_rate, 0.0);
    }

    #[test]
    fn test_totals_survive_window_truncation() {
        let store = JsonStore::in_memory();
        for _ in 0..(MAX_METRICS_IN_MEMORY + 5) {
            store.insert_metric(Metric::new(Chain::Optimism, 0.5, 0.0, true, 1)).unwrap();
        }

        assert_eq!(store.metrics().len(), MAX_METRICS_IN_MEMORY);
        let stats = store.chain_stats(Chain::Optimism);
        assert_eq!(stats.total_trades, (MAX_METRICS_IN_MEMORY + 5) as u64);
    }

    #[test]
    fn test_trade_status_update() {
        let store = JsonStore::in_memory();
        store.insert_trade(trade("base-1-abcdef")).unwrap();
        store
            .update_trade_status("base-1-abcdef", TradeStatus::Confirmed, Some("0xabc".to_string()))
            .unwrap();

        let t = store.trade("base-1-abcdef").unwrap();
        assert_eq!(t.status, TradeStatus::Confirmed);
        assert_eq!(t.tx_hash.as_deref(), Some("0xabc"));

        // Unknown ids are not an error
        assert!(store.update_trade_status("nope", TradeStatus::Failed, None).is_ok());
    }

    #[test]
    fn test_cleanup_old_metrics() {
        let store = JsonStore::in_memory();
        let mut old = Metric::new(Chain::Base, 0.0, 0.0, true, 1);
        old.ts = Utc::now() - chrono::Duration::days(40);
        store.insert_metric(old).unwrap();
        store.insert_metric(Metric::new(Chain::Base, 0.0, 0.0, true, 1)).unwrap();

        assert_eq!(store.cleanup_old_metrics(30), 1);
        assert_eq!(store.metrics().len(), 1);
        assert_eq!(store.chain_stats(Chain::Base).total_trades, 2);
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let path = temp_path("roundtrip");
        let _ = fs::remove_file(&path);

        let store = JsonStore::open(&path);
        store.insert_metric(Metric::new(Chain::Base, 0.4, 0.1, true, 200)).unwrap();
        store.insert_trade(trade("t1")).unwrap();
        store
            .save_bandit_state(&[BanditArm { chain: Chain::Base, alpha: 5.0, beta: 3.0 }])
            .unwrap();
        store.flush().unwrap();

        let reloaded = JsonStore::open(&path);
        assert_eq!(reloaded.metrics().len(), 1);
        assert_eq!(reloaded.trades()[0].id, "t1");
        assert_eq!(reloaded.load_bandit_state()[0].alpha, 5.0);
        // Totals are per run
        assert_eq!(reloaded.chain_stats(Chain::Base).total_trades, 0);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let path = temp_path("corrupt");
        fs::write(&path, "{not json").unwrap();

        let store = JsonStore::open(&path);
        assert!(store.metrics().is_empty());

        let _ = fs::remove_file(&path);
    }
}
