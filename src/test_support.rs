//! Scripted collaborators for unit tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use eyre::{eyre, Result};

use crate::brain::{to_usd, BanditArm, Candidate, ProfitFilter};
use crate::chains::Chain;
use crate::executor::{ExecutionResult, TradeExecutor};
use crate::gas_oracle::PriceOracle;
use crate::routes::{fee, Route};
use crate::simulator::{profit_bps, SimulationClient, SimulationResult};
use crate::store::{ChainStats, JsonStore, Metric, MetricStore, TradeRecord, TradeStatus};

/// `n` whole units of a 6-decimal stable
pub fn usd(n: u64) -> U256 {
    U256::from(n) * U256::from(1_000_000u64)
}

/// USDC → WETH → USDC on Base, named `name`
pub fn route(name: &str) -> Route {
    let t = &Chain::Base.info().tokens;
    Route::new(
        Chain::Base,
        name,
        (t.usdc, t.weth, t.usdc),
        (fee::LOW, fee::MEDIUM),
        "test route",
    )
}

/// Candidate with $0.10 gas at 200k units
pub fn candidate(name: &str, amount_in: U256, amount_out: u64) -> Candidate {
    let amount_out = U256::from(amount_out);
    let profit_usd = to_usd(amount_out, 6) - to_usd(amount_in, 6);
    let gas_usd = 0.10;
    let profit_net_usd = profit_usd - gas_usd;
    let bps = profit_bps(amount_in, amount_out);
    Candidate {
        route_name: name.to_string(),
        route: route(name),
        amount_in,
        amount_out,
        mid_amount: amount_in,
        profit_bps: bps,
        profit_usd,
        profit_net_usd,
        gas_usd,
        gas_estimate: 200_000,
        score: ProfitFilter::score(profit_net_usd, bps),
    }
}

// ============================================
// SIMULATOR
// ============================================

#[derive(Debug, Clone)]
enum Scripted {
    Quote { out: U256, gas: Option<u64> },
    Error,
}

/// Answers from a script keyed by (route name, amount in).
///
/// Repeated entries for one key are served in order; the last one sticks.
/// Unscripted pairs come back as failed quotes.
#[derive(Default)]
pub struct ScriptedSimulator {
    script: Mutex<HashMap<(String, U256), VecDeque<Scripted>>>,
    gas_price_fails: bool,
}

impl ScriptedSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quote(self, name: &str, amount_in: U256, out: u64, gas: Option<u64>) -> Self {
        self.push(name, amount_in, Scripted::Quote { out: U256::from(out), gas })
    }

    pub fn error(self, name: &str, amount_in: U256) -> Self {
        self.push(name, amount_in, Scripted::Error)
    }

    pub fn failing_gas_price(mut self) -> Self {
        self.gas_price_fails = true;
        self
    }

    fn push(self, name: &str, amount_in: U256, entry: Scripted) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry((name.to_string(), amount_in))
            .or_default()
            .push_back(entry);
        self
    }
}

#[async_trait]
impl SimulationClient for ScriptedSimulator {
    async fn gas_price_wei(&self) -> Result<u128> {
        if self.gas_price_fails {
            return Err(eyre!("gas price unavailable"));
        }
        Ok(10_000_000)
    }

    async fn simulate(&self, route: &Route, amount_in: U256) -> Result<SimulationResult> {
        let mut script = self.script.lock().unwrap();
        let entry = match script.get_mut(&(route.name.clone(), amount_in)) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        match entry {
            Some(Scripted::Quote { out, gas }) => {
                Ok(SimulationResult::quoted(amount_in, amount_in, out, gas))
            }
            Some(Scripted::Error) => Err(eyre!("execution reverted")),
            None => Ok(SimulationResult::failed(amount_in, U256::ZERO, "no liquidity")),
        }
    }
}

// ============================================
// ORACLE
// ============================================

/// Flat gas cost, recording every request
pub struct FixedOracle {
    usd: f64,
    calls: Mutex<Vec<(Chain, u64)>>,
}

impl FixedOracle {
    pub fn new(usd: f64) -> Self {
        Self {
            usd,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(Chain, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceOracle for FixedOracle {
    async fn gas_to_usd(&self, chain: Chain, gas_used: u64, _gas_price_wei: u128) -> Result<f64> {
        self.calls.lock().unwrap().push((chain, gas_used));
        Ok(self.usd)
    }
}

// ============================================
// EXECUTOR
// ============================================

/// Returns a fixed result and remembers what it was asked to execute
pub struct RecordingExecutor {
    chain: Chain,
    result: ExecutionResult,
    executed: Mutex<Vec<String>>,
}

impl RecordingExecutor {
    pub fn succeeding(chain: Chain) -> Self {
        Self::with_result(
            chain,
            ExecutionResult::Confirmed {
                tx_hash: B256::repeat_byte(0xAB),
                gas_used: 180_000,
            },
        )
    }

    pub fn with_result(chain: Chain, result: ExecutionResult) -> Self {
        Self {
            chain,
            result,
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl TradeExecutor for RecordingExecutor {
    async fn execute_arbitrage(&self, candidate: &Candidate) -> ExecutionResult {
        self.executed.lock().unwrap().push(candidate.route_name.clone());
        self.result.clone()
    }

    fn explorer_url(&self, tx_hash: &B256) -> String {
        crate::executor::explorer_tx_url(self.chain, tx_hash)
    }

    fn wallet_address(&self) -> Option<Address> {
        Some(Address::repeat_byte(0x11))
    }

    async fn native_balance(&self) -> Result<U256> {
        Ok(U256::from(10u64).pow(U256::from(16u64)))
    }

    async fn token_balance(&self, _token: Address) -> Result<U256> {
        Ok(usd(1_000))
    }
}

// ============================================
// STORE
// ============================================

/// In-memory store that also logs the order of writes
pub struct RecordingStore {
    inner: JsonStore,
    events: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: JsonStore::in_memory(),
            events: Mutex::new(Vec::new()),
        }
    }

    /// `metric:<ok|fail>`, `trade:<status>`, `status:<status>`
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn inner(&self) -> &JsonStore {
        &self.inner
    }

    fn log(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl MetricStore for RecordingStore {
    fn insert_metric(&self, metric: Metric) -> Result<()> {
        self.log(format!("metric:{}", if metric.success { "ok" } else { "fail" }));
        self.inner.insert_metric(metric)
    }

    fn insert_trade(&self, trade: TradeRecord) -> Result<()> {
        self.log(format!("trade:{}", trade.status));
        self.inner.insert_trade(trade)
    }

    fn update_trade_status(&self, id: &str, status: TradeStatus, tx_hash: Option<String>) -> Result<()> {
        self.log(format!("status:{}", status));
        self.inner.update_trade_status(id, status, tx_hash)
    }

    fn chain_stats(&self, chain: Chain) -> ChainStats {
        self.inner.chain_stats(chain)
    }

    fn all_chain_stats(&self) -> Vec<ChainStats> {
        self.inner.all_chain_stats()
    }

    fn save_bandit_state(&self, arms: &[BanditArm]) -> Result<()> {
        self.log("bandit:save".to_string());
        self.inner.save_bandit_state(arms)
    }

    fn load_bandit_state(&self) -> Vec<BanditArm> {
        self.inner.load_bandit_state()
    }

    fn flush(&self) -> Result<()> {
        self.log("flush".to_string());
        self.inner.flush()
    }
}
