//! Ledger account identifiers and RPC access.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use solana_pubkey::Pubkey;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

pub mod rpc;

pub use rpc::RpcClientLike;

/// A Solana account address.
///
/// This is a wrapper around [`Pubkey`] that serializes as a base58-encoded
/// string, the representation used in x402 protocol messages.
///
/// # Example
///
/// ```
/// use x402_solana_pay::chain::Address;
/// use std::str::FromStr;
///
/// let addr = Address::from_str("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").unwrap();
/// assert_eq!(addr.to_string(), "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
/// ```
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Address(Pubkey);

impl Address {
    /// Creates a new address from a [`Pubkey`].
    pub const fn new(pubkey: Pubkey) -> Self {
        Self(pubkey)
    }

    pub fn pubkey(&self) -> &Pubkey {
        &self.0
    }

    /// Returns whether `s` decodes as a well-formed Solana account key.
    ///
    /// Decode failures of any kind report `false`; this never panics or
    /// propagates an error.
    pub fn is_valid(s: &str) -> bool {
        Pubkey::from_str(s).is_ok()
    }
}

impl From<Pubkey> for Address {
    fn from(pubkey: Pubkey) -> Self {
        Self(pubkey)
    }
}

impl From<Address> for Pubkey {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let base58_string = self.0.to_string();
        serializer.serialize_str(&base58_string)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let pubkey = Pubkey::from_str(&s)
            .map_err(|_| serde::de::Error::custom("Failed to decode Solana address"))?;
        Ok(Self(pubkey))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pubkey = Pubkey::from_str(s).map_err(|_| AddressParseError(s.to_string()))?;
        Ok(Self(pubkey))
    }
}

/// Error returned when a string is not a valid Solana address.
#[derive(Debug, thiserror::Error)]
#[error("Failed to decode Solana address: {0}")]
pub struct AddressParseError(pub String);
