//! Profit Filter
//!
//! Filters out "dust" profits that won't pay for gas.
//!
//! A quote survives only if its net profit clears both an absolute USD floor
//! and a multiple of its own gas cost, whichever is larger. Survivors are
//! ranked by net profit weighted up for higher percentage returns.

use crate::config::Config;

/// Profit thresholds shared by the scanner and validator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitFilter {
    /// Minimum net profit threshold in USD
    pub min_profit_usd: f64,

    /// Net profit must also be at least gas cost × this
    pub gas_mult: f64,
}

impl ProfitFilter {
    pub fn new(min_profit_usd: f64, gas_mult: f64) -> Self {
        Self { min_profit_usd, gas_mult }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.min_profit_usd, config.gas_mult)
    }

    /// Net profit a quote with `gas_usd` cost must reach
    pub fn min_required(&self, gas_usd: f64) -> f64 {
        self.min_profit_usd.max(gas_usd * self.gas_mult)
    }

    /// Scan-time check: both floors
    pub fn accepts(&self, profit_net_usd: f64, gas_usd: f64) -> bool {
        profit_net_usd >= self.min_required(gas_usd)
    }

    /// Validation-time check: only the absolute floor
    pub fn clears_floor(&self, profit_net_usd: f64) -> bool {
        profit_net_usd >= self.min_profit_usd
    }

    /// Ranking key: a bigger but thinner trade does not automatically beat
    /// a smaller, fatter one
    pub fn score(profit_net_usd: f64, profit_bps: i64) -> f64 {
        profit_net_usd * (1.0 + profit_bps as f64 / 100.0)
    }
}
