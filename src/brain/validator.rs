//! Candidate Validator
//!
//! Re-quotes a chosen candidate right before execution so stale quotes are
//! never traded.

use std::fmt;

use alloy_primitives::U256;
use eyre::Result;
use tracing::{debug, warn};

use super::{to_usd, Candidate, ProfitFilter};
use crate::chains::Chain;
use crate::gas_oracle::PriceOracle;
use crate::simulator::SimulationClient;

/// Why a candidate was turned down at validation
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    SimulationFailed,
    SlippageTooHigh { slippage_bps: u64 },
    ProfitTooLow { profit_net_usd: f64 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::SimulationFailed => write!(f, "Simulation failed on re-check"),
            RejectReason::SlippageTooHigh { slippage_bps } => {
                write!(f, "Slippage too high: {} bps", slippage_bps)
            }
            RejectReason::ProfitTooLow { profit_net_usd } => {
                write!(f, "Profit too low: ${:.4}", profit_net_usd)
            }
        }
    }
}

/// Outcome of a re-check
#[derive(Debug, Clone)]
pub enum Validation {
    /// Fresh quote still good; carries the refreshed candidate
    Valid(Candidate),
    Rejected(RejectReason),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }
}

/// Slippage between two quotes for the same input, in bps. Integer math,
/// truncating; a favorable move counts as zero.
pub fn slippage_bps(old_amount_out: U256, new_amount_out: U256) -> u64 {
    if old_amount_out.is_zero() || new_amount_out >= old_amount_out {
        return 0;
    }
    let bps: U256 = (old_amount_out - new_amount_out) * U256::from(10_000u64) / old_amount_out;
    bps.saturating_to::<u64>()
}

/// Re-simulate `candidate` at the same input and re-check slippage and the
/// absolute profit floor. The gas-multiple floor is not re-applied here.
///
/// Rejections are values; only a gas price or gas pricing failure is an error.
pub async fn validate_candidate(
    chain: Chain,
    sim: &dyn SimulationClient,
    oracle: &dyn PriceOracle,
    candidate: &Candidate,
    stable_decimals: u8,
    filter: &ProfitFilter,
    max_slippage_bps: u64,
) -> Result<Validation> {
    let fresh = match sim.simulate(&candidate.route, candidate.amount_in).await {
        Ok(q) if q.success => q,
        Ok(q) => {
            debug!(target: "strategy", "{} re-check of {} failed: {:?}", chain, candidate.route_name, q.error);
            return Ok(Validation::Rejected(RejectReason::SimulationFailed));
        }
        Err(e) => {
            debug!(target: "strategy", "{} re-check of {} errored: {}", chain, candidate.route_name, e);
            return Ok(Validation::Rejected(RejectReason::SimulationFailed));
        }
    };

    let slippage = slippage_bps(candidate.amount_out, fresh.amount_out);
    if slippage > max_slippage_bps {
        warn!(
            target: "strategy",
            "{} {} slipped {} bps (max {})",
            chain, candidate.route_name, slippage, max_slippage_bps
        );
        return Ok(Validation::Rejected(RejectReason::SlippageTooHigh { slippage_bps: slippage }));
    }

    let gas_price_wei = sim.gas_price_wei().await?;
    let gas_estimate = fresh.gas_estimate.unwrap_or_else(|| chain.gas_proxy());
    let gas_usd = oracle.gas_to_usd(chain, gas_estimate, gas_price_wei).await?;

    let profit_usd = to_usd(fresh.amount_out, stable_decimals) - to_usd(candidate.amount_in, stable_decimals);
    let profit_net_usd = profit_usd - gas_usd;

    if !filter.clears_floor(profit_net_usd) {
        warn!(
            target: "strategy",
            "{} {} no longer profitable: ${:.4}",
            chain, candidate.route_name, profit_net_usd
        );
        return Ok(Validation::Rejected(RejectReason::ProfitTooLow { profit_net_usd }));
    }

    Ok(Validation::Valid(Candidate {
        amount_out: fresh.amount_out,
        mid_amount: fresh.mid_amount,
        profit_bps: fresh.profit_bps,
        profit_usd,
        profit_net_usd,
        gas_usd,
        gas_estimate,
        ..candidate.clone()
    }))
}
