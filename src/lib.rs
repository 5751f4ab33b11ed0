#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Client-side payment engine for the x402 protocol on Solana.
//!
//! This crate drives HTTP 402 micropayments end to end: it assembles an SPL
//! token transfer with a facilitator-sponsored fee payer, has a wallet sign
//! it as token authority, and submits the result through a facilitator's
//! verify-then-settle pipeline.
//!
//! # Overview
//!
//! The x402 protocol enables micropayments over HTTP by leveraging the
//! 402 Payment Required status code. A seller publishes payment requirements;
//! the buyer answers with a signed payment payload, which a facilitator
//! service verifies and settles on chain. This crate is the buyer side of
//! that exchange for Solana SPL tokens.
//!
//! # Modules
//!
//! - [`amount`] - Decimal/atomic amount conversion
//! - [`balance`] - Read-only token and native balance queries
//! - [`chain`] - Address type and ledger RPC abstraction
//! - [`config`] - Engine configuration and backend selection
//! - [`error`] - The payment error taxonomy
//! - [`facilitator`] - HTTP clients for direct and aggregator facilitators
//! - [`networks`] - Supported Solana networks and well-known constants
//! - [`orchestrator`] - The payment flow state machine
//! - [`payload`] - Transaction-to-payload codec
//! - [`proto`] - Wire format types for protocol messages
//! - [`transaction`] - Unsigned transfer transaction assembly
//! - [`wallet`] - Signing abstraction over wallets and keypairs
//!
//! # Example
//!
//! ```ignore
//! use solana_keypair::Keypair;
//! use x402_solana_pay::config::X402Config;
//! use x402_solana_pay::networks::SolanaNetwork;
//! use x402_solana_pay::orchestrator::{PaymentFlow, PaymentRequest};
//! use x402_solana_pay::proto::TokenInfo;
//! use x402_solana_pay::wallet::SignerWallet;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = X402Config::new(SolanaNetwork::Mainnet);
//! let mut flow = PaymentFlow::new(
//!     SignerWallet::new(Keypair::new()),
//!     config.rpc_client(),
//!     config.router()?,
//!     config.network,
//!     config.fee_payer.clone(),
//! );
//! let receipt = flow
//!     .pay(&PaymentRequest {
//!         recipient: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string(),
//!         amount: "0.01".to_string(),
//!         token: Some(TokenInfo::usdc(SolanaNetwork::Mainnet)),
//!         description: None,
//!         resource: None,
//!     })
//!     .await?;
//! println!("settled as {}", receipt.transaction);
//! # Ok(())
//! # }
//! ```

pub mod amount;
pub mod balance;
pub mod chain;
pub mod config;
pub mod error;
pub mod facilitator;
pub mod networks;
pub mod orchestrator;
pub mod payload;
pub mod proto;
pub mod transaction;
pub mod util;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::Address;
pub use config::X402Config;
pub use error::PaymentError;
pub use networks::SolanaNetwork;
pub use orchestrator::{PaymentFlow, PaymentReceipt, PaymentRequest, PaymentState};
pub use proto::TokenInfo;
