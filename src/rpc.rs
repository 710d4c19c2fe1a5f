//! Per-chain RPC client handles
//!
//! Each worker gets its own explicitly constructed set of providers:
//! read (quotes, balances, price feeds), sim (simulation) and send
//! (transaction submission, wallet-filled when a key is configured).

use crate::chains::Chain;
use crate::config::ChainEndpoints;
use alloy_network::EthereumWallet;
use alloy_primitives::Address;
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use eyre::{eyre, Result, WrapErr};
use std::time::Instant;
use tracing::info;

/// Provider handles for one chain
#[derive(Clone)]
pub struct ChainClients {
    pub chain: Chain,
    pub read: DynProvider,
    pub sim: DynProvider,
    pub send: DynProvider,

    /// Streaming endpoint, if configured (not consumed by the tick loop)
    pub ws_url: Option<String>,
}

impl ChainClients {
    /// Build HTTP providers for the configured endpoints
    pub fn connect(endpoints: &ChainEndpoints, wallet: Option<EthereumWallet>) -> Result<Self> {
        let read = http_provider(&endpoints.read)
            .wrap_err_with(|| format!("Invalid read RPC for {}", endpoints.chain))?;
        let sim = http_provider(&endpoints.sim)
            .wrap_err_with(|| format!("Invalid sim RPC for {}", endpoints.chain))?;

        let send = match wallet {
            Some(wallet) => ProviderBuilder::new()
                .wallet(wallet)
                .connect_http(endpoints.send.parse()?)
                .erased(),
            None => http_provider(&endpoints.send)
                .wrap_err_with(|| format!("Invalid send RPC for {}", endpoints.chain))?,
        };

        Ok(Self {
            chain: endpoints.chain,
            read,
            sim,
            send,
            ws_url: endpoints.ws.clone(),
        })
    }

    /// Check the read endpoint answers with the expected chain id
    pub async fn verify(&self, wallet: Option<Address>) -> Result<EndpointCheck> {
        let check = check_endpoint(self.chain, &self.read).await?;

        if let Some(address) = wallet {
            let balance = self.read.get_balance(address).await?;
            info!(
                target: "worker",
                "✓ {} connected (block {}, {}ms) wallet balance: {} wei",
                self.chain, check.block_number, check.latency_ms, balance
            );
        } else {
            info!(
                target: "worker",
                "✓ {} connected (block {}, {}ms)",
                self.chain, check.block_number, check.latency_ms
            );
        }

        Ok(check)
    }
}

/// Result of probing one endpoint
#[derive(Debug, Clone)]
pub struct EndpointCheck {
    pub chain_id: u64,
    pub block_number: u64,
    pub latency_ms: u64,
}

/// Plain HTTP provider for `url`
pub fn http_provider(url: &str) -> Result<DynProvider> {
    Ok(ProviderBuilder::new().connect_http(url.parse()?).erased())
}

/// Probe a provider: chain id must match `chain`, and it must serve blocks
pub async fn check_endpoint(chain: Chain, provider: &DynProvider) -> Result<EndpointCheck> {
    let start = Instant::now();

    let chain_id = provider.get_chain_id().await?;
    let expected = chain.info().chain_id;
    if chain_id != expected {
        return Err(eyre!(
            "{} endpoint reports chain id {} (expected {})",
            chain,
            chain_id,
            expected
        ));
    }

    let block_number = provider.get_block_number().await?;

    Ok(EndpointCheck {
        chain_id,
        block_number,
        latency_ms: start.elapsed().as_millis() as u64,
    })
}
