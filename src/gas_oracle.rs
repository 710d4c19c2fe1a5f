//! Gas Cost Oracle - Chainlink Integration
//!
//! Converts a gas amount at a given gas price into USD using each chain's
//! Chainlink native/USD aggregator. Prices are cached per chain; when the
//! feed cannot be read the chain's conservative fallback cost is used.

use crate::chains::Chain;
use alloy_primitives::{Address, I256};
use alloy_provider::{DynProvider, Provider};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use eyre::{eyre, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

// ============================================
// CONSTANTS
// ============================================

/// Cache duration for native prices
const CACHE_DURATION_SECS: u64 = 30;

/// Feed answers older than this are logged as stale
const STALE_ANSWER_SECS: u64 = 3600;

sol! {
    /// Chainlink AggregatorV3 (subset)
    #[derive(Debug)]
    interface IAggregatorV3 {
        function latestRoundData()
            external
            view
            returns (
                uint80 roundId,
                int256 answer,
                uint256 startedAt,
                uint256 updatedAt,
                uint80 answeredInRound
            );
        function decimals() external view returns (uint8);
    }
}

// ============================================
// ORACLE CONTRACT
// ============================================

/// Gas-to-USD conversion used by the scanner and validator
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn gas_to_usd(&self, chain: Chain, gas_used: u64, gas_price_wei: u128) -> Result<f64>;
}

/// Cost in USD of `gas_used` at `gas_price_wei` with the native token at `native_usd`
pub fn gas_cost_usd(gas_used: u64, gas_price_wei: u128, native_usd: f64) -> f64 {
    let wei_cost = (gas_used as u128).saturating_mul(gas_price_wei);
    (wei_cost as f64) / 1e18 * native_usd
}

// ============================================
// CACHED NATIVE PRICE
// ============================================

#[derive(Debug, Clone)]
pub struct NativePrice {
    pub usd: f64,

    /// Feed's own `updatedAt` (unix seconds)
    pub updated_at: u64,

    pub fetched_at: Instant,
}

impl NativePrice {
    pub fn is_stale(&self) -> bool {
        self.fetched_at.elapsed() > Duration::from_secs(CACHE_DURATION_SECS)
    }
}

// ============================================
// CHAINLINK ORACLE
// ============================================

pub struct ChainlinkOracle {
    providers: HashMap<Chain, DynProvider>,
    cache: Arc<RwLock<HashMap<Chain, NativePrice>>>,
}

impl ChainlinkOracle {
    /// Oracle reading feeds through each chain's read provider
    pub fn new(providers: HashMap<Chain, DynProvider>) -> Self {
        Self {
            providers,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Native token price in USD (with caching)
    pub async fn native_usd(&self, chain: Chain) -> Result<f64> {
        {
            let cache = self.cache.read().await;
            if let Some(price) = cache.get(&chain) {
                if !price.is_stale() {
                    trace!(target: "oracle", "Using cached {} price: ${:.2}", chain, price.usd);
                    return Ok(price.usd);
                }
            }
        }

        let price = self.fetch_native_price(chain).await?;
        let usd = price.usd;
        self.cache.write().await.insert(chain, price);

        Ok(usd)
    }

    async fn fetch_native_price(&self, chain: Chain) -> Result<NativePrice> {
        let provider = self
            .providers
            .get(&chain)
            .ok_or_else(|| eyre!("No provider for {} price feed", chain))?;
        let feed = chain.info().native_usd_feed;

        let decimals_raw = call(provider, feed, IAggregatorV3::decimalsCall {}.abi_encode()).await?;
        let decimals = IAggregatorV3::decimalsCall::abi_decode_returns(&decimals_raw)
            .map_err(|e| eyre!("Failed to decode feed decimals: {}", e))?;

        let round_raw = call(provider, feed, IAggregatorV3::latestRoundDataCall {}.abi_encode()).await?;
        let round = IAggregatorV3::latestRoundDataCall::abi_decode_returns(&round_raw)
            .map_err(|e| eyre!("Failed to decode latestRoundData: {}", e))?;

        let usd = scale_answer(round.answer, decimals)?;
        let updated_at = round.updatedAt.saturating_to::<u64>();

        let age = (chrono::Utc::now().timestamp().max(0) as u64).saturating_sub(updated_at);
        if age > STALE_ANSWER_SECS {
            warn!(target: "oracle", "{} {}/USD answer is {}s old", chain, chain.info().native_currency, age);
        }

        debug!(target: "oracle", "{} {}/USD = ${:.2}", chain, chain.info().native_currency, usd);

        Ok(NativePrice {
            usd,
            updated_at,
            fetched_at: Instant::now(),
        })
    }
}

#[async_trait]
impl PriceOracle for ChainlinkOracle {
    async fn gas_to_usd(&self, chain: Chain, gas_used: u64, gas_price_wei: u128) -> Result<f64> {
        match self.native_usd(chain).await {
            Ok(native_usd) => {
                let cost = gas_cost_usd(gas_used, gas_price_wei, native_usd);
                debug!(
                    target: "oracle",
                    "{} gas {} @ {:.4} gwei = ${:.4}",
                    chain, gas_used, gas_price_wei as f64 / 1e9, cost
                );
                Ok(cost)
            }
            Err(e) => {
                warn!(target: "oracle", "{} price feed unavailable ({}), using fallback gas cost", chain, e);
                Ok(chain.fallback_gas_usd())
            }
        }
    }
}

async fn call(provider: &DynProvider, to: Address, calldata: Vec<u8>) -> Result<alloy_primitives::Bytes> {
    let tx = TransactionRequest::default().to(to).input(calldata.into());
    provider
        .call(tx)
        .await
        .map_err(|e| eyre!("eth_call failed: {}", e))
}

/// Convert a raw aggregator answer to a float price
fn scale_answer(answer: I256, decimals: u8) -> Result<f64> {
    if answer <= I256::ZERO {
        return Err(eyre!("Non-positive feed answer: {}", answer));
    }
    let raw: f64 = answer
        .to_string()
        .parse()
        .map_err(|e| eyre!("Unparseable feed answer {}: {}", answer, e))?;
    Ok(raw / 10f64.powi(decimals as i32))
}

// ============================================
// TESTS
// ============================================
