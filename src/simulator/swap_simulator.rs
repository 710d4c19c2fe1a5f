//! Swap Simulator - Two-Leg Route Simulation
//!
//! Quotes a route leg by leg: token_in → token_mid on the first pool, then
//! the leg-1 output token_mid → token_out on the second pool.

use alloy_primitives::U256;
use alloy_provider::{DynProvider, Provider};
use async_trait::async_trait;
use eyre::{eyre, Result};
use tracing::debug;

use super::{SimulationClient, SimulationResult, V3Quoter};
use crate::chains::Chain;
use crate::routes::Route;

/// Simulation client backed by a chain's simulation RPC
pub struct RpcSimulator {
    chain: Chain,
    provider: DynProvider,
    quoter: V3Quoter,
}

impl RpcSimulator {
    pub fn new(chain: Chain, provider: DynProvider) -> Self {
        Self {
            chain,
            quoter: V3Quoter::new(provider.clone()),
            provider,
        }
    }
}

#[async_trait]
impl SimulationClient for RpcSimulator {
    async fn gas_price_wei(&self) -> Result<u128> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| eyre!("Fee data lookup failed on {}: {}", self.chain, e))
    }

    async fn simulate(&self, route: &Route, amount_in: U256) -> Result<SimulationResult> {
        let leg1 = self
            .quoter
            .quote_exact_input(route.quoter, route.path1()?, amount_in)
            .await?;

        if leg1.amount_out.is_zero() {
            return Ok(SimulationResult::failed(amount_in, U256::ZERO, "Leg 1 returned zero"));
        }

        let leg2 = self
            .quoter
            .quote_exact_input(route.quoter, route.path2()?, leg1.amount_out)
            .await?;

        if leg2.amount_out.is_zero() {
            return Ok(SimulationResult::failed(amount_in, leg1.amount_out, "Leg 2 returned zero"));
        }

        let total_gas = leg1.gas_estimate.saturating_add(leg2.gas_estimate);
        let result = SimulationResult::quoted(
            amount_in,
            leg1.amount_out,
            leg2.amount_out,
            (total_gas > 0).then_some(total_gas),
        );

        debug!(
            target: "dex",
            "{} {}: in={} mid={} out={} bps={}",
            self.chain, route.name, amount_in, result.mid_amount, result.amount_out, result.profit_bps
        );

        Ok(result)
    }
}
