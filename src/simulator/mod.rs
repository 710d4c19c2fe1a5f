//! The Simulator
//!
//! Responsible for:
//! - Quoting two-leg routes through the Uniswap V3 QuoterV2 (`eth_call`)
//! - Reporting the chain's current gas price
//!
//! The scanner and validator only see the [`SimulationClient`] trait, so
//! each worker owns its own explicitly constructed client handle.

mod quoter;
mod swap_simulator;

pub use quoter::*;
pub use swap_simulator::*;

use crate::routes::Route;
use alloy_primitives::U256;
use async_trait::async_trait;
use eyre::Result;

/// Outcome of simulating one route at one input amount
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub success: bool,
    pub amount_in: U256,
    pub amount_out: U256,

    /// Output of the first leg
    pub mid_amount: U256,

    /// Signed, truncated (out - in) * 10000 / in
    pub profit_bps: i64,

    /// Gas units reported by the quoter, if any
    pub gas_estimate: Option<u64>,

    pub error: Option<String>,
}

impl SimulationResult {
    /// A successful quote
    pub fn quoted(amount_in: U256, mid_amount: U256, amount_out: U256, gas_estimate: Option<u64>) -> Self {
        Self {
            success: true,
            amount_in,
            amount_out,
            mid_amount,
            profit_bps: profit_bps(amount_in, amount_out),
            gas_estimate,
            error: None,
        }
    }

    /// A quote that produced nothing usable
    pub fn failed(amount_in: U256, mid_amount: U256, error: impl Into<String>) -> Self {
        Self {
            success: false,
            amount_in,
            amount_out: U256::ZERO,
            mid_amount,
            profit_bps: 0,
            gas_estimate: None,
            error: Some(error.into()),
        }
    }
}

/// Quote source for one chain
#[async_trait]
pub trait SimulationClient: Send + Sync {
    /// Current gas price in wei
    async fn gas_price_wei(&self) -> Result<u128>;

    /// Simulate `route` with `amount_in` of its input token
    async fn simulate(&self, route: &Route, amount_in: U256) -> Result<SimulationResult>;
}

/// Return of a round trip in basis points, truncated toward zero
pub fn profit_bps(amount_in: U256, amount_out: U256) -> i64 {
    if amount_in.is_zero() {
        return 0;
    }
    let scale = U256::from(10_000u64);
    if amount_out >= amount_in {
        let bps: U256 = (amount_out - amount_in) * scale / amount_in;
        bps.saturating_to::<i64>()
    } else {
        let bps: U256 = (amount_in - amount_out) * scale / amount_in;
        -bps.saturating_to::<i64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profit_bps_signed_and_truncated() {
        let amount_in = U256::from(100_000_000u64);
        assert_eq!(profit_bps(amount_in, U256::from(100_500_000u64)), 50);
        assert_eq!(profit_bps(amount_in, U256::from(100_009_999u64)), 0);
        assert_eq!(profit_bps(amount_in, U256::from(99_000_000u64)), -100);
        assert_eq!(profit_bps(amount_in, U256::from(99_990_001u64)), 0);
        assert_eq!(profit_bps(U256::ZERO, U256::from(1u64)), 0);
    }

    #[test]
    fn test_failed_result_has_no_output() {
        let r = SimulationResult::failed(U256::from(5u64), U256::from(3u64), "Leg 2 returned zero");
        assert!(!r.success);
        assert_eq!(r.amount_out, U256::ZERO);
        assert_eq!(r.mid_amount, U256::from(3u64));
    }
}
