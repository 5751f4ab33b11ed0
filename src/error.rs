//! Error taxonomy for the payment flow.

use solana_client::client_error::ClientError;

use crate::amount::{AmountError, MoneyAmountParseError};
use crate::chain::AddressParseError;
use crate::facilitator::FacilitatorError;
use crate::payload::PayloadCodecError;
use crate::transaction::BuildError;
use crate::wallet::WalletError;

/// Everything that can go wrong between a payment request and a settled
/// transaction. Each variant maps to one failure the caller can act on.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The flow already ran to a terminal state; build a new one to retry.
    #[error("Payment flow already used")]
    AlreadyUsed,
    /// The requested amount cannot be converted to atomic units.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    /// The recipient address is not a valid public key.
    #[error("Invalid recipient address: {0}")]
    InvalidAddress(String),
    /// No token was supplied and none could be inferred for the network.
    #[error("Unsupported asset: no token configured for this payment")]
    UnsupportedAsset,
    /// The payer wallet holds no token account for the asset.
    #[error("No token account for this asset: fund the wallet first")]
    NoTokenAccount,
    /// The asset's mint account is missing or undecodable.
    #[error("Mint lookup failed: {0}")]
    MintLookupFailed(String),
    /// The ledger RPC could not be reached or returned an error.
    #[error("Ledger unavailable")]
    LedgerUnavailable(#[source] ClientError),
    /// The transaction could not be assembled.
    #[error("Cannot assemble transaction: {0}")]
    MalformedTransaction(String),
    /// No wallet account is connected.
    #[error("Wallet is not connected")]
    WalletDisconnected,
    /// The wallet refused to sign.
    #[error("Signature declined: {0}")]
    SignatureDeclined(String),
    /// The facilitator rejected the payment during verification.
    #[error("Payment verification failed: {0}")]
    VerificationFailed(String),
    /// The facilitator failed to settle a verified payment.
    #[error("Payment settlement failed: {0}")]
    SettlementFailed(String),
    /// Transport-level facilitator failure.
    #[error(transparent)]
    Facilitator(#[from] FacilitatorError),
    /// The signed transaction could not be encoded for transport.
    #[error(transparent)]
    Payload(#[from] PayloadCodecError),
}

impl From<BuildError> for PaymentError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::NoTokenAccount => PaymentError::NoTokenAccount,
            BuildError::MintLookupFailed(msg) => PaymentError::MintLookupFailed(msg),
            BuildError::LedgerUnavailable(err) => PaymentError::LedgerUnavailable(err),
            BuildError::Assemble(msg) => PaymentError::MalformedTransaction(msg),
        }
    }
}

impl From<WalletError> for PaymentError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Disconnected => PaymentError::WalletDisconnected,
            WalletError::SignatureDeclined(msg) => PaymentError::SignatureDeclined(msg),
        }
    }
}

impl From<AmountError> for PaymentError {
    fn from(err: AmountError) -> Self {
        PaymentError::InvalidAmount(err.to_string())
    }
}

impl From<MoneyAmountParseError> for PaymentError {
    fn from(err: MoneyAmountParseError) -> Self {
        PaymentError::InvalidAmount(err.to_string())
    }
}

impl From<AddressParseError> for PaymentError {
    fn from(err: AddressParseError) -> Self {
        PaymentError::InvalidAddress(err.to_string())
    }
}
