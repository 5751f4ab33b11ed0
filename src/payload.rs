//! Serialization of signed transactions into transport payloads.
//!
//! A partially-signed transaction travels to the facilitator as base64 of
//! its bincode encoding, wrapped with protocol metadata. Deterministic, no
//! side effects.

use solana_transaction::versioned::VersionedTransaction;

use crate::networks::SolanaNetwork;
use crate::proto::{ExactSolanaPayload, PaymentPayload, PaymentScheme, X402Version1};
use crate::util::Base64Bytes;

/// Errors raised while encoding or decoding a payment payload.
#[derive(Debug, thiserror::Error)]
pub enum PayloadCodecError {
    #[error("Cannot serialize transaction: {0}")]
    Transaction(#[from] bincode::Error),
    #[error("Transaction is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Wraps a signed transaction into a [`PaymentPayload`].
pub fn encode_payment_payload(
    transaction: &VersionedTransaction,
    scheme: PaymentScheme,
    network: SolanaNetwork,
) -> Result<PaymentPayload, PayloadCodecError> {
    let bytes = bincode::serialize(transaction)?;
    Ok(PaymentPayload {
        x402_version: X402Version1,
        scheme,
        network,
        payload: ExactSolanaPayload {
            transaction: Base64Bytes::encode(bytes).to_string(),
        },
    })
}

/// Recovers the transaction carried by a [`PaymentPayload`].
pub fn decode_transaction(
    payload: &PaymentPayload,
) -> Result<VersionedTransaction, PayloadCodecError> {
    let bytes = Base64Bytes::from(payload.payload.transaction.as_str()).decode()?;
    let transaction = bincode::deserialize(&bytes)?;
    Ok(transaction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_keypair::Keypair;
    use solana_message::v0::Message as MessageV0;
    use solana_message::{Hash, VersionedMessage};
    use solana_signer::Signer;
    use solana_transaction::Instruction;

    fn sample_transaction() -> VersionedTransaction {
        let fee_payer = Keypair::new().pubkey();
        let program = crate::transaction::SYSTEM_PROGRAM_PUBKEY;
        let ix = Instruction::new_with_bytes(program, &[1, 2, 3], vec![]);
        let message = MessageV0::try_compile(&fee_payer, &[ix], &[], Hash::default()).unwrap();
        VersionedTransaction {
            signatures: vec![],
            message: VersionedMessage::V0(message),
        }
    }

    #[test]
    fn encode_wraps_protocol_metadata() {
        let tx = sample_transaction();
        let payload =
            encode_payment_payload(&tx, PaymentScheme::Exact, SolanaNetwork::Devnet).unwrap();
        assert_eq!(payload.scheme, PaymentScheme::Exact);
        assert_eq!(payload.network, SolanaNetwork::Devnet);
        assert!(!payload.payload.transaction.is_empty());

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["x402Version"], 1);
        assert_eq!(json["scheme"], "exact");
        assert_eq!(json["network"], "solana-devnet");
    }

    #[test]
    fn decode_recovers_the_transaction() {
        let tx = sample_transaction();
        let payload =
            encode_payment_payload(&tx, PaymentScheme::Exact, SolanaNetwork::Mainnet).unwrap();
        let decoded = decode_transaction(&payload).unwrap();
        assert_eq!(decoded, tx);
    }

    #[test]
    fn corrupted_base64_is_an_error() {
        let tx = sample_transaction();
        let mut payload =
            encode_payment_payload(&tx, PaymentScheme::Exact, SolanaNetwork::Mainnet).unwrap();
        payload.payload.transaction = "not base64!!".to_string();
        assert!(decode_transaction(&payload).is_err());
    }
}
