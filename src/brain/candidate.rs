//! Candidates and scan results

use crate::routes::Route;
use alloy_primitives::U256;
use serde::Serialize;

/// A fully priced, simulated opportunity awaiting validation/execution.
///
/// On-chain amounts stay integers; the USD fields are derived values for
/// ranking and accounting only.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub route_name: String,
    #[serde(skip)]
    pub route: Route,
    pub amount_in: U256,
    pub amount_out: U256,
    pub mid_amount: U256,
    pub profit_bps: i64,
    pub profit_usd: f64,
    pub profit_net_usd: f64,
    pub gas_usd: f64,
    pub gas_estimate: u64,
    pub score: f64,
}

/// Output of one full scan
#[derive(Debug, Clone, Default)]
pub struct StrategyResult {
    pub found: bool,

    /// Highest scoring candidate
    pub candidate: Option<Candidate>,

    /// Every accepted candidate, sorted by score descending
    pub candidates: Vec<Candidate>,

    pub scanned_routes: usize,
    pub scanned_sizes: usize,
    pub scan_time_ms: u64,
}

/// Output of a liveness probe
#[derive(Debug, Clone, Default)]
pub struct QuickScanResult {
    pub found: bool,
    pub route_name: Option<String>,
    pub profit_bps: Option<i64>,
}

/// Raw stable amount → USD, splitting whole and fractional units so the
/// integer part never loses precision
pub fn to_usd(amount: U256, decimals: u8) -> f64 {
    let unit = U256::from(10u64).pow(U256::from(decimals));
    let (whole, frac) = amount.div_rem(unit);
    let whole: f64 = whole.saturating_to::<u128>() as f64;
    let frac: f64 = frac.saturating_to::<u128>() as f64;
    whole + frac / 10f64.powi(decimals as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_usd() {
        assert_eq!(to_usd(U256::from(100_500_000u64), 6), 100.5);
        assert_eq!(to_usd(U256::from(25_000_000u64), 6), 25.0);
        assert_eq!(to_usd(U256::from(1u64), 6), 0.000001);
        assert_eq!(to_usd(U256::from(5u64) * U256::from(10u64).pow(U256::from(18u64)), 18), 5.0);
    }
}
