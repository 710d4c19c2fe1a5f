//! Dry-run executor: full accounting, no broadcast

use alloy_primitives::{Address, B256, U256};
use alloy_provider::{DynProvider, Provider};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use eyre::{eyre, Result};
use tracing::{debug, info};

use super::{explorer_tx_url, min_out, ExecutionResult, IERC20, TradeExecutor};
use crate::brain::{to_usd, Candidate};
use crate::chains::Chain;
use crate::routes::{format_v3_path, Route};

pub struct DryRunExecutor {
    chain: Chain,
    read: DynProvider,
    wallet: Option<Address>,
    max_slippage_bps: u64,
    stable_decimals: u8,
}

impl DryRunExecutor {
    pub fn new(
        chain: Chain,
        read: DynProvider,
        wallet: Option<Address>,
        max_slippage_bps: u64,
        stable_decimals: u8,
    ) -> Self {
        Self {
            chain,
            read,
            wallet,
            max_slippage_bps,
            stable_decimals,
        }
    }

    fn require_wallet(&self) -> Result<Address> {
        self.wallet
            .ok_or_else(|| eyre!("No wallet configured for {}", self.chain))
    }
}

/// Both legs as they would be passed to the executor contract
fn route_hops(route: &Route) -> Result<String> {
    Ok(format!(
        "{} || {}",
        format_v3_path(&route.path1()?)?,
        format_v3_path(&route.path2()?)?
    ))
}

#[async_trait]
impl TradeExecutor for DryRunExecutor {
    async fn execute_arbitrage(&self, candidate: &Candidate) -> ExecutionResult {
        info!(
            target: "executor",
            "📋 DRY RUN {}: would execute {} | in ${:.2} | min out {} | net ${:.4}",
            self.chain,
            candidate.route_name,
            to_usd(candidate.amount_in, self.stable_decimals),
            min_out(candidate.amount_out, self.max_slippage_bps),
            candidate.profit_net_usd
        );

        match route_hops(&candidate.route) {
            Ok(hops) => info!(target: "executor", "   {} | {}", candidate.route.description, hops),
            Err(e) => debug!(target: "executor", "   could not render path for {}: {}", candidate.route_name, e),
        }

        ExecutionResult::Simulated {
            tx_hash: B256::ZERO,
            gas_estimate: candidate.gas_estimate,
        }
    }

    fn explorer_url(&self, tx_hash: &B256) -> String {
        explorer_tx_url(self.chain, tx_hash)
    }

    fn wallet_address(&self) -> Option<Address> {
        self.wallet
    }

    async fn native_balance(&self) -> Result<U256> {
        let wallet = self.require_wallet()?;
        Ok(self.read.get_balance(wallet).await?)
    }

    async fn token_balance(&self, token: Address) -> Result<U256> {
        let wallet = self.require_wallet()?;
        let calldata = IERC20::balanceOfCall { account: wallet }.abi_encode();
        let tx = TransactionRequest::default().to(token).input(calldata.into());
        let output = self.read.call(tx).await?;
        IERC20::balanceOfCall::abi_decode_returns(&output)
            .map_err(|e| eyre!("Failed to decode balanceOf: {}", e))
    }
}
