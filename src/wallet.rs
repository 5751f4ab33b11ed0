//! Wallet capability: the external account-and-signing collaborator.
//!
//! The payment flow never touches key material. It asks a [`Wallet`] for the
//! current account and hands it an unsigned transaction to sign.
//! [`SignerWallet`] adapts anything implementing [`Signer`] (a `Keypair`, a
//! hardware-backed signer); browser-style adapters implement the trait
//! directly.

use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_signer::Signer;
use solana_transaction::versioned::VersionedTransaction;

/// Errors surfaced by the wallet collaborator.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// The wallet has no connected account.
    #[error("Wallet has no connected account")]
    Disconnected,
    /// The signer rejected or failed to produce a signature.
    #[error("Signature declined: {0}")]
    SignatureDeclined(String),
}

pub trait Wallet {
    /// The currently connected account, if any.
    fn account(&self) -> Option<Pubkey>;

    /// Signs the transaction as token authority, leaving other required
    /// signatures (the fee payer's) in place for downstream co-signing.
    fn sign_transaction(
        &self,
        transaction: VersionedTransaction,
    ) -> impl Future<Output = Result<VersionedTransaction, WalletError>> + Send;
}

/// Adapter exposing any [`Signer`] as a [`Wallet`].
#[derive(Debug, Clone)]
pub struct SignerWallet<S>(S);

impl<S> SignerWallet<S> {
    pub fn new(signer: S) -> Self {
        Self(signer)
    }

    pub fn into_inner(self) -> S {
        self.0
    }
}

impl<S: Signer + Send + Sync> Wallet for SignerWallet<S> {
    fn account(&self) -> Option<Pubkey> {
        Some(self.0.pubkey())
    }

    fn sign_transaction(
        &self,
        transaction: VersionedTransaction,
    ) -> impl Future<Output = Result<VersionedTransaction, WalletError>> + Send {
        let signed = sign_as_authority(&self.0, transaction);
        async move { signed }
    }
}

/// Places this signer's signature into its slot among the transaction's
/// required signers. Does not disturb any other signature slot.
fn sign_as_authority<S: Signer>(
    signer: &S,
    mut tx: VersionedTransaction,
) -> Result<VersionedTransaction, WalletError> {
    let msg_bytes = tx.message.serialize();
    let signature = signer
        .try_sign_message(msg_bytes.as_slice())
        .map_err(|e| WalletError::SignatureDeclined(format!("{e}")))?;

    // Required signatures are the first N account keys
    let num_required = tx.message.header().num_required_signatures as usize;
    let static_keys = tx.message.static_account_keys();
    let pos = static_keys[..num_required.min(static_keys.len())]
        .iter()
        .position(|k| *k == signer.pubkey())
        .ok_or(WalletError::SignatureDeclined(
            "Signer not found in required signers".to_string(),
        ))?;

    if tx.signatures.len() < num_required {
        tx.signatures.resize(num_required, Signature::default());
    }
    tx.signatures[pos] = signature;
    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_instruction::AccountMeta;
    use solana_keypair::Keypair;
    use solana_message::v0::Message as MessageV0;
    use solana_message::{Hash, VersionedMessage};
    use solana_pubkey::pubkey;
    use solana_transaction::Instruction;

    fn two_signer_transaction(fee_payer: Pubkey, authority: Pubkey) -> VersionedTransaction {
        let program = pubkey!("MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr");
        let ix = Instruction::new_with_bytes(
            program,
            b"hi",
            vec![AccountMeta::new_readonly(authority, true)],
        );
        let message = MessageV0::try_compile(&fee_payer, &[ix], &[], Hash::default()).unwrap();
        VersionedTransaction {
            signatures: vec![],
            message: VersionedMessage::V0(message),
        }
    }

    #[tokio::test]
    async fn signer_wallet_places_signature_in_own_slot() {
        let fee_payer = Keypair::new();
        let authority = Keypair::new();
        let tx = two_signer_transaction(fee_payer.pubkey(), authority.pubkey());

        let wallet = SignerWallet::new(authority);
        let signed = wallet.sign_transaction(tx).await.unwrap();

        let num_required = signed.message.header().num_required_signatures as usize;
        assert_eq!(signed.signatures.len(), num_required);
        // Fee payer slot stays empty for the facilitator to co-sign.
        assert_eq!(signed.signatures[0], Signature::default());
        assert_ne!(signed.signatures[1], Signature::default());
    }

    #[tokio::test]
    async fn foreign_signer_is_declined() {
        let fee_payer = Keypair::new();
        let authority = Keypair::new();
        let stranger = Keypair::new();
        let tx = two_signer_transaction(fee_payer.pubkey(), authority.pubkey());

        let wallet = SignerWallet::new(stranger);
        let err = wallet.sign_transaction(tx).await.unwrap_err();
        assert!(matches!(err, WalletError::SignatureDeclined(_)));
    }
}
