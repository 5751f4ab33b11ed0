//! Wire format types for the x402 payment protocol.
//!
//! These are the interoperability contract with facilitators: every struct
//! here serializes to the exact camelCase JSON shape a compliant facilitator
//! accepts. [`VerifyResponse`] and [`SettleResponse`] are modeled as enums so
//! the invalid arms cannot be constructed without a reason, with hand-written
//! serde producing the flat `{isValid, ...}` / `{success, ...}` wire shapes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

use crate::chain::Address;
use crate::networks::{SolanaNetwork, USDC_DECIMALS};

/// Version marker for x402 protocol version 1.
///
/// Serializes as the integer `1` and rejects any other value on input.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct X402Version1;

impl X402Version1 {
    pub const VALUE: u8 = 1;
}

impl From<X402Version1> for u8 {
    fn from(_: X402Version1) -> Self {
        X402Version1::VALUE
    }
}

impl Serialize for X402Version1 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(Self::VALUE)
    }
}

impl<'de> Deserialize<'de> for X402Version1 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let num = u8::deserialize(deserializer)?;
        if num == Self::VALUE {
            Ok(X402Version1)
        } else {
            Err(serde::de::Error::custom(format!(
                "expected version {}, got {}",
                Self::VALUE,
                num
            )))
        }
    }
}

impl Display for X402Version1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::VALUE)
    }
}

/// Payment scheme negotiated between client and facilitator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentScheme {
    Exact,
    Dynamic,
}

impl PaymentScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentScheme::Exact => "exact",
            PaymentScheme::Dynamic => "dynamic",
        }
    }
}

impl Display for PaymentScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(PaymentScheme::Exact),
            "dynamic" => Ok(PaymentScheme::Dynamic),
            other => Err(format!("Unknown payment scheme: {other}")),
        }
    }
}

/// Known extension fields of a payment requirement, with an escape hatch
/// for forward-compatible keys this crate does not interpret.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementExtra {
    /// Account that pays network fees on behalf of the payer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_payer: Option<Address>,
    /// Unknown extension keys, preserved verbatim.
    #[serde(flatten)]
    pub unknown: serde_json::Map<String, serde_json::Value>,
}

/// Payment terms set by the seller.
///
/// Immutable once constructed. `max_amount_required` is always expressed in
/// atomic units; human-decimal amounts stop at the [`crate::amount`] boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirement {
    /// The payment scheme.
    pub scheme: PaymentScheme,
    /// The Solana network the payment settles on.
    pub network: SolanaNetwork,
    /// The maximum amount required, in atomic units as a decimal string.
    pub max_amount_required: String,
    /// The resource URI being paid for.
    pub resource: String,
    /// Human-readable description of the resource.
    pub description: String,
    /// MIME type of the resource.
    pub mime_type: String,
    /// Optional JSON schema for the resource output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,
    /// The recipient address.
    pub pay_to: Address,
    /// Advisory payment validity window for the facilitator, in seconds.
    pub max_timeout_seconds: u64,
    /// The SPL token mint being transferred.
    pub asset: Address,
    /// Known extension fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<RequirementExtra>,
}

/// Scheme-specific payload: a base64-encoded partially-signed transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactSolanaPayload {
    pub transaction: String,
}

/// A signed payment authorization wrapped with protocol metadata.
///
/// Never mutated after creation; each verify/settle pair uses one instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    /// Protocol version (always 1).
    pub x402_version: X402Version1,
    /// The payment scheme.
    pub scheme: PaymentScheme,
    /// The network the transaction is bound to.
    pub network: SolanaNetwork,
    /// The signed transaction payload.
    pub payload: ExactSolanaPayload,
}

/// Body of `POST /verify` and `POST /settle` in direct facilitator mode.
///
/// Serialize-only: the client builds these, it never parses them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest<'a> {
    pub payment_payload: &'a PaymentPayload,
    pub payment_requirements: &'a PaymentRequirement,
}

pub type SettleRequest<'a> = VerifyRequest<'a>;

/// Facilitator's answer to a verification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResponse {
    /// The payload matches the requirements and passes all checks.
    Valid { payer: String },
    /// The payload was rejected for the given reason.
    Invalid {
        reason: String,
        payer: Option<String>,
    },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponseWire {
    is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    payer: Option<String>,
    #[serde(default)]
    invalid_reason: Option<String>,
}

impl Serialize for VerifyResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let wire = match self {
            VerifyResponse::Valid { payer } => VerifyResponseWire {
                is_valid: true,
                payer: Some(payer.clone()),
                invalid_reason: None,
            },
            VerifyResponse::Invalid { reason, payer } => VerifyResponseWire {
                is_valid: false,
                payer: payer.clone(),
                invalid_reason: Some(reason.clone()),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for VerifyResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = VerifyResponseWire::deserialize(deserializer)?;
        match wire.is_valid {
            true => {
                let payer = wire
                    .payer
                    .ok_or_else(|| serde::de::Error::missing_field("payer"))?;
                Ok(VerifyResponse::Valid { payer })
            }
            false => {
                let reason = wire
                    .invalid_reason
                    .ok_or_else(|| serde::de::Error::missing_field("invalidReason"))?;
                Ok(VerifyResponse::Invalid {
                    reason,
                    payer: wire.payer,
                })
            }
        }
    }
}

/// Facilitator's answer to a settlement request. Terminal for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleResponse {
    /// Settlement succeeded: the transfer is on chain.
    Success {
        /// The address that paid.
        payer: String,
        /// The on-chain transaction signature.
        transaction: String,
        /// The network where settlement occurred.
        network: String,
    },
    /// Settlement failed.
    Error {
        /// The reason for failure.
        reason: String,
        /// The network where settlement was attempted.
        network: String,
    },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettleResponseWire {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transaction: Option<String>,
    network: String,
}

impl Serialize for SettleResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let wire = match self {
            SettleResponse::Success {
                payer,
                transaction,
                network,
            } => SettleResponseWire {
                success: true,
                error_reason: None,
                payer: Some(payer.clone()),
                transaction: Some(transaction.clone()),
                network: network.clone(),
            },
            SettleResponse::Error { reason, network } => SettleResponseWire {
                success: false,
                error_reason: Some(reason.clone()),
                payer: None,
                transaction: None,
                network: network.clone(),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SettleResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = SettleResponseWire::deserialize(deserializer)?;
        match wire.success {
            true => Ok(SettleResponse::Success {
                payer: wire.payer.unwrap_or_default(),
                transaction: wire
                    .transaction
                    .ok_or_else(|| serde::de::Error::missing_field("transaction"))?,
                network: wire.network,
            }),
            false => {
                let reason = wire
                    .error_reason
                    .ok_or_else(|| serde::de::Error::missing_field("errorReason"))?;
                Ok(SettleResponse::Error {
                    reason,
                    network: wire.network,
                })
            }
        }
    }
}

/// One payment kind a facilitator supports, from `GET /supported`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedKind {
    pub x402_version: u8,
    pub scheme: String,
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

/// Response body of `GET /supported`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportedResponse {
    pub kinds: Vec<SupportedKind>,
}

/// Query parameters for `GET /discovery/resources`.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryParams {
    /// Filter by resource type.
    pub resource_type: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Pagination block of a discovery response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryPagination {
    pub limit: u32,
    pub offset: u32,
    pub total: u32,
}

/// Response body of `GET /discovery/resources`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResponse {
    pub x402_version: u8,
    pub items: Vec<PaymentRequirement>,
    pub pagination: DiscoveryPagination,
}

/// Caller-supplied description of the token being paid with.
///
/// `decimals` governs every atomic-amount conversion for this asset and must
/// be consistent between transaction building and verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub mint: Address,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TokenInfo {
    /// USDC deployment on the given network.
    pub fn usdc(network: SolanaNetwork) -> Self {
        Self {
            mint: Address::new(network.usdc_mint()),
            symbol: "USDC".to_string(),
            decimals: USDC_DECIMALS,
            name: Some("USD Coin".to_string()),
        }
    }
}
