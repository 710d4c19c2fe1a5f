//! UniswapV3 QuoterV2 - Provider-based Quotes
//!
//! Uses the official Uniswap QuoterV2 contract via eth_call. The quoter is
//! not a view function, but eth_call lets us read its revert-encoded result
//! without sending anything.

use alloy_primitives::{Address, Bytes, U256};
use alloy_provider::{DynProvider, Provider};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall};
use eyre::{eyre, Result};
use tracing::debug;

// ============================================
// SOLIDITY INTERFACES
// ============================================

sol! {
    /// Uniswap V3 QuoterV2 interface
    #[derive(Debug)]
    interface IQuoterV2 {
        function quoteExactInput(bytes memory path, uint256 amountIn)
            external
            returns (
                uint256 amountOut,
                uint160[] memory sqrtPriceX96AfterList,
                uint32[] memory initializedTicksCrossedList,
                uint256 gasEstimate
            );
    }
}

/// Quote result for one (possibly multi-hop) path
#[derive(Debug, Clone)]
pub struct QuoteResult {
    pub amount_in: U256,
    pub amount_out: U256,
    pub gas_estimate: u64,
}

/// QuoterV2 client bound to one chain's simulation provider
#[derive(Clone)]
pub struct V3Quoter {
    provider: DynProvider,
}

impl V3Quoter {
    pub fn new(provider: DynProvider) -> Self {
        Self { provider }
    }

    async fn call_contract(&self, to: Address, calldata: Vec<u8>) -> Result<Bytes> {
        let tx = TransactionRequest::default()
            .to(to)
            .input(calldata.into());

        self.provider
            .call(tx)
            .await
            .map_err(|e| eyre!("eth_call failed: {}", e))
    }

    /// Quote `amount_in` along a packed V3 path
    pub async fn quote_exact_input(
        &self,
        quoter: Address,
        path: Bytes,
        amount_in: U256,
    ) -> Result<QuoteResult> {
        debug!(target: "dex", "Quoting path of {} bytes, amount: {}", path.len(), amount_in);

        let calldata = IQuoterV2::quoteExactInputCall {
            path,
            amountIn: amount_in,
        }
        .abi_encode();

        let output = self
            .call_contract(quoter, calldata)
            .await
            .map_err(|e| eyre!("Quote failed: {}", e))?;

        let decoded = IQuoterV2::quoteExactInputCall::abi_decode_returns(&output)
            .map_err(|e| eyre!("Failed to decode quoter output: {}", e))?;

        Ok(QuoteResult {
            amount_in,
            amount_out: decoded.amountOut,
            gas_estimate: decoded.gasEstimate.saturating_to::<u64>(),
        })
    }
}
