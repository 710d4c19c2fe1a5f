//! Live executor: signs and broadcasts through the deployed contract

use alloy_network::{ReceiptResponse, TransactionBuilder};
use alloy_primitives::{Address, B256, U256};
use alloy_provider::{DynProvider, Provider};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use eyre::{eyre, Result};
use tracing::{error, info, warn};

use super::{
    bumped_gas_price, explorer_tx_url, min_out, padded_gas_limit, ExecutionResult, IArbExecutor,
    IERC20, TradeExecutor, FALLBACK_GAS_LIMIT,
};
use crate::brain::Candidate;
use crate::chains::Chain;

pub struct LiveExecutor {
    chain: Chain,
    read: DynProvider,

    /// Wallet-filled provider on the send endpoint
    send: DynProvider,
    wallet: Address,
    contract: Address,
    max_slippage_bps: u64,
    deadline_seconds: u64,
}

impl LiveExecutor {
    pub fn new(
        chain: Chain,
        read: DynProvider,
        send: DynProvider,
        wallet: Address,
        contract: Address,
        max_slippage_bps: u64,
        deadline_seconds: u64,
    ) -> Self {
        info!(target: "executor", "🚀 {} live executor {:#x} (wallet {:#x})", chain, contract, wallet);
        Self {
            chain,
            read,
            send,
            wallet,
            contract,
            max_slippage_bps,
            deadline_seconds,
        }
    }

    fn build_tx(&self, candidate: &Candidate) -> Result<TransactionRequest> {
        let deadline = chrono::Utc::now().timestamp().max(0) as u64 + self.deadline_seconds;

        let calldata = IArbExecutor::executeCall {
            path1: candidate.route.path1()?,
            path2: candidate.route.path2()?,
            amountIn: candidate.amount_in,
            minOut: min_out(candidate.amount_out, self.max_slippage_bps),
            deadline: U256::from(deadline),
        }
        .abi_encode();

        Ok(TransactionRequest::default()
            .from(self.wallet)
            .to(self.contract)
            .input(calldata.into()))
    }

    async fn send_and_confirm(&self, candidate: &Candidate) -> Result<ExecutionResult> {
        let tx = self.build_tx(candidate)?;

        let gas_limit = match self.send.estimate_gas(tx.clone()).await {
            Ok(estimate) => padded_gas_limit(estimate),
            Err(e) => {
                warn!(target: "executor", "{} gas estimation failed ({}), using {}", self.chain, e, FALLBACK_GAS_LIMIT);
                FALLBACK_GAS_LIMIT
            }
        };
        let gas_price = bumped_gas_price(self.send.get_gas_price().await?);

        let tx = tx.with_gas_limit(gas_limit).with_gas_price(gas_price);

        let pending = self.send.send_transaction(tx).await?;
        let tx_hash = *pending.tx_hash();
        info!(
            target: "executor",
            "📤 {} sent {}: {}",
            self.chain,
            candidate.route_name,
            explorer_tx_url(self.chain, &tx_hash)
        );

        let receipt = match pending.get_receipt().await {
            Ok(r) => r,
            Err(e) => {
                return Ok(ExecutionResult::Failed {
                    reason: format!("Receipt unavailable: {}", e),
                    tx_hash: Some(tx_hash),
                })
            }
        };

        if receipt.status() {
            Ok(ExecutionResult::Confirmed {
                tx_hash,
                gas_used: receipt.gas_used,
            })
        } else {
            Ok(ExecutionResult::Reverted { tx_hash })
        }
    }
}

#[async_trait]
impl TradeExecutor for LiveExecutor {
    async fn execute_arbitrage(&self, candidate: &Candidate) -> ExecutionResult {
        match self.send_and_confirm(candidate).await {
            Ok(result) => result,
            Err(e) => {
                error!(target: "executor", "{} execution of {} failed: {}", self.chain, candidate.route_name, e);
                ExecutionResult::Failed {
                    reason: e.to_string(),
                    tx_hash: None,
                }
            }
        }
    }

    fn explorer_url(&self, tx_hash: &B256) -> String {
        explorer_tx_url(self.chain, tx_hash)
    }

    fn wallet_address(&self) -> Option<Address> {
        Some(self.wallet)
    }

    async fn native_balance(&self) -> Result<U256> {
        Ok(self.read.get_balance(self.wallet).await?)
    }

    async fn token_balance(&self, token: Address) -> Result<U256> {
        let calldata = IERC20::balanceOfCall { account: self.wallet }.abi_encode();
        let tx = TransactionRequest::default().to(token).input(calldata.into());
        let output = self.read.call(tx).await?;
        IERC20::balanceOfCall::abi_decode_returns(&output)
            .map_err(|e| eyre!("Failed to decode balanceOf: {}", e))
    }
}
