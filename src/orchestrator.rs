//! The payment flow state machine.
//!
//! One [`PaymentFlow`] carries one payment from request to receipt:
//!
//! ```text
//! Idle -> Building -> AwaitingSignature -> Verifying -> Settling -> Succeeded
//!                                                                \-> Failed
//! ```
//!
//! Settlement is never attempted before verification passes, and a flow that
//! reached a terminal state cannot be reused. Retrying means building a new
//! flow.

use std::str::FromStr;

use crate::chain::{Address, RpcClientLike};
use crate::error::PaymentError;
use crate::facilitator::Facilitator;
use crate::networks::SolanaNetwork;
use crate::payload::encode_payment_payload;
use crate::proto::{
    PaymentRequirement, PaymentScheme, RequirementExtra, SettleResponse, TokenInfo, VerifyRequest,
    VerifyResponse,
};
use crate::transaction::build_transfer_transaction;
use crate::wallet::Wallet;

/// Facilitator validity window requested for each payment, in seconds.
const MAX_TIMEOUT_SECONDS: u64 = 60;

/// What the caller wants to pay. Amount is a human-decimal string; it is
/// converted to atomic units against the token's decimals.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub recipient: String,
    pub amount: String,
    pub token: Option<TokenInfo>,
    pub description: Option<String>,
    pub resource: Option<String>,
}

/// Proof of a settled payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    /// On-chain transaction signature.
    pub transaction: String,
    /// The address that paid.
    pub payer: String,
    /// The network the payment settled on.
    pub network: SolanaNetwork,
}

/// Where a flow currently stands. Terminal states keep their outcome.
#[derive(Debug, Clone)]
pub enum PaymentState {
    Idle,
    Building,
    AwaitingSignature,
    Verifying,
    Settling,
    Succeeded(PaymentReceipt),
    Failed(String),
}

impl PaymentState {
    fn name(&self) -> &'static str {
        match self {
            PaymentState::Idle => "idle",
            PaymentState::Building => "building",
            PaymentState::AwaitingSignature => "awaiting_signature",
            PaymentState::Verifying => "verifying",
            PaymentState::Settling => "settling",
            PaymentState::Succeeded(_) => "succeeded",
            PaymentState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentState::Succeeded(_) | PaymentState::Failed(_))
    }
}

/// Drives one payment through its collaborators: wallet for signing, ledger
/// RPC for transaction assembly, facilitator for verify and settle.
pub struct PaymentFlow<W, R, F> {
    wallet: W,
    rpc: R,
    facilitator: F,
    network: SolanaNetwork,
    fee_payer: Address,
    state: PaymentState,
}

impl<W, R, F> PaymentFlow<W, R, F>
where
    W: Wallet,
    R: RpcClientLike,
    F: Facilitator,
{
    pub fn new(
        wallet: W,
        rpc: R,
        facilitator: F,
        network: SolanaNetwork,
        fee_payer: Address,
    ) -> Self {
        Self {
            wallet,
            rpc,
            facilitator,
            network,
            fee_payer,
            state: PaymentState::Idle,
        }
    }

    pub fn state(&self) -> &PaymentState {
        &self.state
    }

    fn transition(&mut self, next: PaymentState) {
        tracing::debug!(from = self.state.name(), to = next.name(), "payment state");
        self.state = next;
    }

    /// Runs the full payment: build, sign, verify, settle.
    ///
    /// Single-shot. On any failure the flow lands in [`PaymentState::Failed`]
    /// and the error is returned; a second call is always rejected.
    pub async fn pay(&mut self, request: &PaymentRequest) -> Result<PaymentReceipt, PaymentError> {
        if !matches!(self.state, PaymentState::Idle) {
            return Err(PaymentError::AlreadyUsed);
        }
        match self.pay_inner(request).await {
            Ok(receipt) => {
                tracing::info!(transaction = %receipt.transaction, "payment settled");
                self.transition(PaymentState::Succeeded(receipt.clone()));
                Ok(receipt)
            }
            Err(err) => {
                tracing::warn!(%err, "payment failed");
                self.transition(PaymentState::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    async fn pay_inner(&mut self, request: &PaymentRequest) -> Result<PaymentReceipt, PaymentError> {
        let token = request.token.as_ref().ok_or(PaymentError::UnsupportedAsset)?;
        let recipient = Address::from_str(&request.recipient)?;
        let amount = crate::amount::MoneyAmount::parse(&request.amount)?;
        let atomic = amount.to_atomic(token.decimals)?;
        let atomic_units: u64 = atomic.parse().map_err(|_| {
            PaymentError::InvalidAmount(format!("{atomic} exceeds the representable range"))
        })?;

        self.transition(PaymentState::Building);
        let requirement = PaymentRequirement {
            scheme: PaymentScheme::Exact,
            network: self.network,
            max_amount_required: atomic,
            resource: request.resource.clone().unwrap_or_default(),
            description: request.description.clone().unwrap_or_default(),
            mime_type: "application/json".to_string(),
            output_schema: None,
            pay_to: recipient.clone(),
            max_timeout_seconds: MAX_TIMEOUT_SECONDS,
            asset: token.mint.clone(),
            extra: Some(RequirementExtra {
                fee_payer: Some(self.fee_payer.clone()),
                unknown: Default::default(),
            }),
        };

        let payer = self.wallet.account().ok_or(PaymentError::WalletDisconnected)?;
        let transaction = build_transfer_transaction(
            &self.rpc,
            &payer,
            &recipient,
            atomic_units,
            &token.mint,
            self.fee_payer.pubkey(),
        )
        .await?;

        self.transition(PaymentState::AwaitingSignature);
        let signed = self.wallet.sign_transaction(transaction).await?;
        let payload = encode_payment_payload(&signed, PaymentScheme::Exact, self.network)?;
        let wire_request = VerifyRequest {
            payment_payload: &payload,
            payment_requirements: &requirement,
        };

        self.transition(PaymentState::Verifying);
        match self.facilitator.verify(&wire_request).await? {
            VerifyResponse::Valid { .. } => {}
            VerifyResponse::Invalid { reason, .. } => {
                return Err(PaymentError::VerificationFailed(reason));
            }
        }

        self.transition(PaymentState::Settling);
        match self.facilitator.settle(&wire_request).await? {
            SettleResponse::Success {
                payer, transaction, ..
            } => Ok(PaymentReceipt {
                transaction,
                payer,
                network: self.network,
            }),
            SettleResponse::Error { reason, .. } => Err(PaymentError::SettlementFailed(reason)),
        }
    }
}
