//! Operator wallet
//!
//! ⚠️  SECURITY WARNING:
//! - Never log or expose the private key
//! - Load it from the environment, not from committed config

use alloy_network::EthereumWallet;
use alloy_primitives::Address;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use eyre::{eyre, Result};
use std::str::FromStr;
use tracing::info;

/// The single key that signs every live execution
#[derive(Clone)]
pub struct OperatorWallet {
    signer: PrivateKeySigner,
}

impl OperatorWallet {
    /// Parse a hex key, with or without `0x`
    pub fn from_key(key: &str) -> Result<Self> {
        let key = key.trim().trim_start_matches("0x");
        let signer = PrivateKeySigner::from_str(key)
            .map_err(|_| eyre!("PRIVATE_KEY is not a valid secp256k1 key"))?;
        info!(target: "executor", "✓ Operator wallet loaded: {:#x}", signer.address());
        Ok(Self { signer })
    }

    /// `None` when no key is configured
    pub fn from_optional(key: Option<&str>) -> Result<Option<Self>> {
        match key {
            Some(k) if !k.trim().is_empty() => Self::from_key(k).map(Some),
            _ => Ok(None),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Signer bound to `chain_id` (EIP-155)
    pub fn ethereum_wallet(&self, chain_id: u64) -> EthereumWallet {
        let signer = self.signer.clone().with_chain_id(Some(chain_id));
        EthereumWallet::from(signer)
    }
}

impl std::fmt::Debug for OperatorWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorWallet")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_loads_key_with_or_without_prefix() {
        let expected = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        assert_eq!(OperatorWallet::from_key(ANVIL_KEY).unwrap().address(), expected);
        assert_eq!(
            OperatorWallet::from_key(ANVIL_KEY.trim_start_matches("0x")).unwrap().address(),
            expected
        );
    }

    #[test]
    fn test_bad_key_error_hides_key() {
        let err = OperatorWallet::from_key("0xdeadbeef").unwrap_err().to_string();
        assert!(!err.contains("deadbeef"));
    }

    #[test]
    fn test_optional_key() {
        assert!(OperatorWallet::from_optional(None).unwrap().is_none());
        assert!(OperatorWallet::from_optional(Some("  ")).unwrap().is_none());
        assert!(OperatorWallet::from_optional(Some(ANVIL_KEY)).unwrap().is_some());
    }

    #[test]
    fn test_debug_hides_key() {
        let w = OperatorWallet::from_key(ANVIL_KEY).unwrap();
        let dbg = format!("{:?}", w);
        assert!(!dbg.contains("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"));
    }
}
