//! Registry of Solana networks and well-known deployment constants.
//!
//! Network names follow the x402 V1 convention: `"solana"` for mainnet,
//! `"solana-devnet"` and `"solana-testnet"` for the test clusters.

use serde::{Deserialize, Serialize};
use solana_pubkey::{Pubkey, pubkey};
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

/// Default facilitator endpoint used when no custom URL is configured.
pub const DEFAULT_FACILITATOR_URL: &str = "https://facilitator.payai.network";

/// Fee payer account operated by the default facilitator.
///
/// Transactions built by this crate designate the facilitator as fee payer:
/// the user signs only as token authority and never pays network fees.
pub static DEFAULT_FEE_PAYER: Pubkey = pubkey!("2wKupLR9q6wXYppw8Gr2NvWxKBUqm4PPJKkQfoxHDBg4");

/// USDC mint on Solana mainnet.
pub static USDC_MINT_MAINNET: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");

/// USDC mint on Solana devnet and testnet.
pub static USDC_MINT_DEVNET: Pubkey = pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU");

/// Decimal precision of USDC.
pub const USDC_DECIMALS: u8 = 6;

/// A Solana cluster identified by its x402 network name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolanaNetwork {
    #[serde(rename = "solana")]
    Mainnet,
    #[serde(rename = "solana-devnet")]
    Devnet,
    #[serde(rename = "solana-testnet")]
    Testnet,
}

impl SolanaNetwork {
    /// Returns the x402 wire name of this network.
    pub fn as_str(&self) -> &'static str {
        match self {
            SolanaNetwork::Mainnet => "solana",
            SolanaNetwork::Devnet => "solana-devnet",
            SolanaNetwork::Testnet => "solana-testnet",
        }
    }

    /// Returns the public RPC endpoint for this network.
    pub fn rpc_url(&self) -> &'static str {
        match self {
            SolanaNetwork::Mainnet => "https://api.mainnet-beta.solana.com",
            SolanaNetwork::Devnet => "https://api.devnet.solana.com",
            SolanaNetwork::Testnet => "https://api.testnet.solana.com",
        }
    }

    /// Returns the USDC mint deployed on this network.
    pub fn usdc_mint(&self) -> Pubkey {
        match self {
            SolanaNetwork::Mainnet => USDC_MINT_MAINNET,
            SolanaNetwork::Devnet | SolanaNetwork::Testnet => USDC_MINT_DEVNET,
        }
    }
}

impl Display for SolanaNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SolanaNetwork {
    type Err = UnknownNetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solana" => Ok(SolanaNetwork::Mainnet),
            "solana-devnet" => Ok(SolanaNetwork::Devnet),
            "solana-testnet" => Ok(SolanaNetwork::Testnet),
            other => Err(UnknownNetworkError(other.to_string())),
        }
    }
}

/// Error returned when a network name is not a known Solana cluster.
#[derive(Debug, thiserror::Error)]
#[error("Unknown Solana network: {0}")]
pub struct UnknownNetworkError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_names_round_trip() {
        for network in [
            SolanaNetwork::Mainnet,
            SolanaNetwork::Devnet,
            SolanaNetwork::Testnet,
        ] {
            let parsed: SolanaNetwork = network.as_str().parse().unwrap();
            assert_eq!(parsed, network);
        }
    }

    #[test]
    fn network_serializes_as_wire_name() {
        let json = serde_json::to_string(&SolanaNetwork::Devnet).unwrap();
        assert_eq!(json, "\"solana-devnet\"");
    }

    #[test]
    fn unknown_network_is_rejected() {
        assert!("base-sepolia".parse::<SolanaNetwork>().is_err());
    }
}
