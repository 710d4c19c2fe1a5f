//! Route catalogue
//!
//! Static two-leg Uniswap V3 cycles per chain: stable → mid → stable.
//! Routes are built once at startup and passed through unchanged to the
//! simulation client and the executor.

use crate::chains::Chain;
use alloy_primitives::{Address, Bytes};
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};

/// Uniswap V3 fee tiers (hundredths of a bip)
pub mod fee {
    pub const LOWEST: u32 = 100;
    pub const LOW: u32 = 500;
    pub const MEDIUM: u32 = 3000;
    pub const HIGH: u32 = 10_000;
}

/// A cyclic swap path through two V3 pools on one chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub name: String,
    pub token_in: Address,
    pub token_mid: Address,
    pub token_out: Address,
    pub fee1: u32,
    pub fee2: u32,
    pub quoter: Address,
    pub description: String,
}

impl Route {
    /// Route on `chain` using that chain's QuoterV2
    pub fn new(
        chain: Chain,
        name: impl Into<String>,
        tokens: (Address, Address, Address),
        fees: (u32, u32),
        description: impl Into<String>,
    ) -> Self {
        let info = chain.info();
        Self {
            name: name.into(),
            token_in: tokens.0,
            token_mid: tokens.1,
            token_out: tokens.2,
            fee1: fees.0,
            fee2: fees.1,
            quoter: info.quoter_v2,
            description: description.into(),
        }
    }

    /// Packed path for the first leg (token_in → token_mid)
    pub fn path1(&self) -> Result<Bytes> {
        encode_v3_path(&[self.token_in, self.token_mid], &[self.fee1])
    }

    /// Packed path for the second leg (token_mid → token_out)
    pub fn path2(&self) -> Result<Bytes> {
        encode_v3_path(&[self.token_mid, self.token_out], &[self.fee2])
    }
}

/// Static route catalogue for `chain`
pub fn routes_for(chain: Chain) -> Vec<Route> {
    let t = &chain.info().tokens;
    let usdc = t.usdc;
    let mut routes = vec![
        Route::new(
            chain,
            "USDC-WETH-USDC 500/3000",
            (usdc, t.weth, usdc),
            (fee::LOW, fee::MEDIUM),
            "Buy WETH on the 0.05% pool, sell on the 0.30% pool",
        ),
        Route::new(
            chain,
            "USDC-WETH-USDC 3000/500",
            (usdc, t.weth, usdc),
            (fee::MEDIUM, fee::LOW),
            "Buy WETH on the 0.30% pool, sell on the 0.05% pool",
        ),
    ];

    if let Some(bridged) = t.usdc_bridged {
        let label = if chain == Chain::Base { "USDbC" } else { "USDCe" };
        routes.push(Route::new(
            chain,
            format!("USDC-WETH-{} 500/500", label),
            (usdc, t.weth, bridged),
            (fee::LOW, fee::LOW),
            "Native USDC → WETH → bridged USDC",
        ));
    }

    if let Some(usdt) = t.usdt {
        routes.push(Route::new(
            chain,
            "USDC-USDT-USDC 100/100",
            (usdc, usdt, usdc),
            (fee::LOWEST, fee::LOWEST),
            "Stable swap USDC ↔ USDT",
        ));
    }

    if let Some(dai) = t.dai {
        routes.push(Route::new(
            chain,
            "USDC-DAI-USDC 100/100",
            (usdc, dai, usdc),
            (fee::LOWEST, fee::LOWEST),
            "Stable swap USDC ↔ DAI",
        ));
    }

    if let Some((symbol, token)) = t.extra {
        let tier = match chain {
            Chain::Base | Chain::Polygon => fee::LOW,
            Chain::Arbitrum | Chain::Optimism => fee::MEDIUM,
        };
        routes.push(Route::new(
            chain,
            format!("USDC-{}-USDC {}/{}", symbol, tier, tier),
            (usdc, token, usdc),
            (tier, tier),
            format!("USDC → {} → USDC", symbol),
        ));
    }

    routes
}

// ============================================
// V3 PATH ENCODING
// ============================================

/// Encode a multi-hop V3 path: token (20 bytes) | fee (3 bytes) | token ...
pub fn encode_v3_path(tokens: &[Address], fees: &[u32]) -> Result<Bytes> {
    if tokens.len() != fees.len() + 1 {
        return Err(eyre!(
            "Invalid path: {} tokens require {} fees, got {}",
            tokens.len(),
            tokens.len().saturating_sub(1),
            fees.len()
        ));
    }

    let mut path = Vec::with_capacity(tokens.len() * 20 + fees.len() * 3);
    for (token, fee) in tokens.iter().zip(fees) {
        if *fee > 0x00ff_ffff {
            return Err(eyre!("Fee {} does not fit in 24 bits", fee));
        }
        path.extend_from_slice(token.as_slice());
        path.extend_from_slice(&fee.to_be_bytes()[1..]);
    }
    if let Some(last) = tokens.last() {
        path.extend_from_slice(last.as_slice());
    }

    Ok(path.into())
}

/// Decode a packed V3 path back into tokens and fees
pub fn decode_v3_path(path: &[u8]) -> Result<(Vec<Address>, Vec<u32>)> {
    if path.len() < 20 || (path.len() - 20) % 23 != 0 {
        return Err(eyre!("Invalid V3 path length: {}", path.len()));
    }

    let mut tokens = Vec::new();
    let mut fees = Vec::new();
    let mut offset = 0;

    loop {
        tokens.push(Address::from_slice(&path[offset..offset + 20]));
        offset += 20;
        if offset == path.len() {
            break;
        }
        let f = &path[offset..offset + 3];
        fees.push(u32::from_be_bytes([0, f[0], f[1], f[2]]));
        offset += 3;
    }

    Ok((tokens, fees))
}

/// Human-readable hops of a packed path: `0x8335…2913 -(500)→ 0x4200…0006`
pub fn format_v3_path(path: &[u8]) -> Result<String> {
    let (tokens, fees) = decode_v3_path(path)?;
    let mut out = short_address(&tokens[0]);
    for (token, fee) in tokens[1..].iter().zip(&fees) {
        out.push_str(&format!(" -({})→ {}", fee, short_address(token)));
    }
    Ok(out)
}

fn short_address(address: &Address) -> String {
    let hex = format!("{:#x}", address);
    format!("{}…{}", &hex[..6], &hex[hex.len() - 4..])
}
