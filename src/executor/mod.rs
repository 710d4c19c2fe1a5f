//! The Executor
//!
//! This module handles turning a validated candidate into a trade:
//! - Live: sign and send `execute(path1, path2, amountIn, minOut, deadline)`
//!   to the deployed executor contract, then wait for the receipt
//! - Dry run: same accounting and balance queries, never broadcasts
//!
//! ⚠️  WARNING: The live executor interacts with real funds!

mod dry_run;
mod live;
mod signer;

pub use dry_run::DryRunExecutor;
pub use live::LiveExecutor;
pub use signer::OperatorWallet;

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::sol;
use async_trait::async_trait;
use eyre::Result;

use crate::brain::Candidate;
use crate::chains::Chain;

sol! {
    /// Deployed two-leg arbitrage executor
    #[derive(Debug)]
    interface IArbExecutor {
        function execute(
            bytes path1,
            bytes path2,
            uint256 amountIn,
            uint256 minOut,
            uint256 deadline
        ) external returns (uint256 amountOut);
    }

    #[derive(Debug)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}

/// Gas limit used when estimation fails
pub const FALLBACK_GAS_LIMIT: u64 = 500_000;

/// Result of an execution attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    /// Transaction mined and succeeded
    Confirmed { tx_hash: B256, gas_used: u64 },

    /// Dry run: accounted as success, nothing broadcast
    Simulated { tx_hash: B256, gas_estimate: u64 },

    /// Mined but reverted
    Reverted { tx_hash: B256 },

    /// Never made it on chain, or the receipt could not be read
    Failed { reason: String, tx_hash: Option<B256> },
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Confirmed { .. } | ExecutionResult::Simulated { .. })
    }

    pub fn tx_hash(&self) -> Option<B256> {
        match self {
            ExecutionResult::Confirmed { tx_hash, .. }
            | ExecutionResult::Simulated { tx_hash, .. }
            | ExecutionResult::Reverted { tx_hash } => Some(*tx_hash),
            ExecutionResult::Failed { tx_hash, .. } => *tx_hash,
        }
    }

    pub fn error(&self) -> Option<String> {
        match self {
            ExecutionResult::Reverted { .. } => Some("Transaction reverted".to_string()),
            ExecutionResult::Failed { reason, .. } => Some(reason.clone()),
            _ => None,
        }
    }
}

/// Execution client for one chain
#[async_trait]
pub trait TradeExecutor: Send + Sync {
    /// Execute a validated candidate. Failures are values, not errors.
    async fn execute_arbitrage(&self, candidate: &Candidate) -> ExecutionResult;

    fn explorer_url(&self, tx_hash: &B256) -> String;

    fn wallet_address(&self) -> Option<Address>;

    async fn native_balance(&self) -> Result<U256>;

    async fn token_balance(&self, token: Address) -> Result<U256>;
}

/// `<explorer>/tx/<hash>` for `chain`
pub fn explorer_tx_url(chain: Chain, tx_hash: &B256) -> String {
    format!("{}/tx/{:#x}", chain.info().explorer, tx_hash)
}

/// Minimum acceptable output after slippage: `out − out · bps / 10000`
pub fn min_out(amount_out: U256, max_slippage_bps: u64) -> U256 {
    amount_out - amount_out * U256::from(max_slippage_bps) / U256::from(10_000u64)
}

/// Estimate + 20%
pub fn padded_gas_limit(estimate: u64) -> u64 {
    estimate.saturating_mul(12) / 10
}

/// Current price + 10%
pub fn bumped_gas_price(gas_price_wei: u128) -> u128 {
    gas_price_wei.saturating_mul(11) / 10
}
