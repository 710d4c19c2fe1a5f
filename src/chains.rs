//! Chain catalogue for Rotor
//!
//! The closed set of networks the bot rotates between, plus everything
//! static we need to know about each one:
//! - Explorer, native currency and chain id
//! - Uniswap V3 QuoterV2 deployments
//! - Stable and mid tokens used by the route catalogue
//! - Chainlink native/USD feeds for gas conversion
//! - Gas proxies and fallback gas costs

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================
// CHAIN IDENTIFIER
// ============================================

/// A supported network. Used as the bandit arm key and as the key for
/// per-chain workers and providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Base,
    Arbitrum,
    Optimism,
    Polygon,
}

impl Chain {
    /// Every supported chain, in catalogue order
    pub const ALL: [Chain; 4] = [Chain::Base, Chain::Arbitrum, Chain::Optimism, Chain::Polygon];

    /// Lowercase key used in env vars, trade ids and the store
    pub fn key(&self) -> &'static str {
        match self {
            Chain::Base => "base",
            Chain::Arbitrum => "arbitrum",
            Chain::Optimism => "optimism",
            Chain::Polygon => "polygon",
        }
    }

    /// Static information for this chain
    pub fn info(&self) -> &'static ChainInfo {
        match self {
            Chain::Base => &BASE,
            Chain::Arbitrum => &ARBITRUM,
            Chain::Optimism => &OPTIMISM,
            Chain::Polygon => &POLYGON,
        }
    }

    /// Gas units assumed for a two-swap cycle when the quoter reports none
    pub fn gas_proxy(&self) -> u64 {
        self.info().gas_proxy
    }

    /// USD cost of one cycle used when the price feed is unavailable
    pub fn fallback_gas_usd(&self) -> f64 {
        self.info().fallback_gas_usd
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Chain {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "base" => Ok(Chain::Base),
            "arbitrum" | "arb" => Ok(Chain::Arbitrum),
            "optimism" | "op" => Ok(Chain::Optimism),
            "polygon" | "matic" => Ok(Chain::Polygon),
            other => Err(eyre::eyre!("Unknown chain: {}", other)),
        }
    }
}

// ============================================
// STATIC CHAIN INFO
// ============================================

/// Everything static we know about a chain
#[derive(Debug)]
pub struct ChainInfo {
    pub name: &'static str,
    pub chain_id: u64,
    pub native_currency: &'static str,
    pub explorer: &'static str,

    /// Proxy gas estimate for 2 swaps
    pub gas_proxy: u64,

    /// Conservative per-cycle gas cost when the oracle fails
    pub fallback_gas_usd: f64,

    /// Uniswap V3 QuoterV2
    pub quoter_v2: Address,

    /// Chainlink native/USD aggregator
    pub native_usd_feed: Address,

    /// Default public endpoint (override via env)
    pub default_rpc: &'static str,

    pub tokens: ChainTokens,
}

/// Tokens used by the route catalogue
#[derive(Debug)]
pub struct ChainTokens {
    pub weth: Address,
    pub usdc: Address,

    /// Bridged USDC (USDbC on Base, USDC.e elsewhere)
    pub usdc_bridged: Option<Address>,
    pub usdt: Option<Address>,
    pub dai: Option<Address>,

    /// Chain-specific extra mid token (cbETH, ARB, OP, WMATIC)
    pub extra: Option<(&'static str, Address)>,
}

const BASE: ChainInfo = ChainInfo {
    name: "Base",
    chain_id: 8453,
    native_currency: "ETH",
    explorer: "https://basescan.org",
    gas_proxy: 260_000,
    fallback_gas_usd: 0.05,
    quoter_v2: address!("3d4e44Eb1374240CE5F1B871ab261CD16335B76a"),
    native_usd_feed: address!("71041dddad3595F9CEd3DcCFBe3D1F4b0a16Bb70"),
    default_rpc: "https://mainnet.base.org",
    tokens: ChainTokens {
        weth: address!("4200000000000000000000000000000000000006"),
        usdc: address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
        usdc_bridged: Some(address!("d9aAEc86B65D86f6A7B5B1b0c42FFA531710b6CA")),
        usdt: None,
        dai: Some(address!("50c5725949A6F0c72E6C4a641F24049A917DB0Cb")),
        extra: Some(("cbETH", address!("2Ae3F1Ec7F1F5012CFEab0185bfc7aa3cf0DEc22"))),
    },
};

const ARBITRUM: ChainInfo = ChainInfo {
    name: "Arbitrum One",
    chain_id: 42161,
    native_currency: "ETH",
    explorer: "https://arbiscan.io",
    gas_proxy: 280_000,
    fallback_gas_usd: 0.08,
    quoter_v2: address!("61fFE014bA17989E743c5F6cB21bF9697530B21e"),
    native_usd_feed: address!("639Fe6ab55C921f74e7fac1ee960C0B6293ba612"),
    default_rpc: "https://arb1.arbitrum.io/rpc",
    tokens: ChainTokens {
        weth: address!("82aF49447D8a07e3bd95BD0d56f35241523fBab1"),
        usdc: address!("af88d065e77c8cC2239327C5EDb3A432268e5831"),
        usdc_bridged: Some(address!("FF970A61A04b1cA14834A43f5dE4533eBDDB5CC8")),
        usdt: Some(address!("Fd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9")),
        dai: Some(address!("DA10009cBd5D07dd0CeCc66161FC93D7c9000da1")),
        extra: Some(("ARB", address!("912CE59144191C1204E64559FE8253a0e49E6548"))),
    },
};

const OPTIMISM: ChainInfo = ChainInfo {
    name: "Optimism",
    chain_id: 10,
    native_currency: "ETH",
    explorer: "https://optimistic.etherscan.io",
    gas_proxy: 260_000,
    fallback_gas_usd: 0.06,
    quoter_v2: address!("61fFE014bA17989E743c5F6cB21bF9697530B21e"),
    native_usd_feed: address!("13e3Ee699D1909E989722E753853AE30b17e08c5"),
    default_rpc: "https://mainnet.optimism.io",
    tokens: ChainTokens {
        weth: address!("4200000000000000000000000000000000000006"),
        usdc: address!("0b2C639c533813f4Aa9D7837CAf62653d097Ff85"),
        usdc_bridged: Some(address!("7F5c764cBc14f9669B88837ca1490cCa17c31607")),
        usdt: Some(address!("94b008aA00579c1307B0EF2c499aD98a8ce58e58")),
        dai: Some(address!("DA10009cBd5D07dd0CeCc66161FC93D7c9000da1")),
        extra: Some(("OP", address!("4200000000000000000000000000000000000042"))),
    },
};

// Native is MATIC, so the feed is MATIC/USD rather than ETH/USD
const POLYGON: ChainInfo = ChainInfo {
    name: "Polygon",
    chain_id: 137,
    native_currency: "MATIC",
    explorer: "https://polygonscan.com",
    gas_proxy: 300_000,
    fallback_gas_usd: 0.02,
    quoter_v2: address!("61fFE014bA17989E743c5F6cB21bF9697530B21e"),
    native_usd_feed: address!("AB594600376Ec9fD91F8e885dADF0CE036862dE0"),
    default_rpc: "https://polygon-rpc.com",
    tokens: ChainTokens {
        weth: address!("7ceB23fD6bC0adD59E62ac25578270cFf1b9f619"),
        usdc: address!("3c499c542cEF5E3811e1192ce70d8cC03d5c3359"),
        usdc_bridged: Some(address!("2791Bca1f2de4661ED88A30C99A7a9449Aa84174")),
        usdt: Some(address!("c2132D05D31c914a87C6611C10748AEb04B58e8F")),
        dai: Some(address!("8f3Cf7ad23Cd3CaDbD9735AFf958023239c6A063")),
        extra: Some(("WMATIC", address!("0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270"))),
    },
};

/// Parse a comma separated chain list ("base,arbitrum"), skipping blanks
pub fn parse_chain_list(s: &str) -> eyre::Result<Vec<Chain>> {
    let mut chains = Vec::new();

    for part in s.split(',').filter(|p| !p.trim().is_empty()) {
        let chain: Chain = part.parse()?;
        if !chains.contains(&chain) {
            chains.push(chain);
        }
    }

    Ok(chains)
}
