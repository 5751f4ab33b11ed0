//! Read-only RPC access to the Solana ledger.
//!
//! [`RpcClientLike`] is the seam between this crate and the ledger: payment
//! code is generic over it, and tests substitute an in-memory implementation.

use solana_account::Account;
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_commitment_config::CommitmentConfig;
use solana_message::Hash;
use solana_pubkey::Pubkey;
use std::sync::Arc;

pub trait RpcClientLike {
    /// Fetches an account, returning `None` when it does not exist.
    fn get_account(
        &self,
        pubkey: &Pubkey,
    ) -> impl Future<Output = Result<Option<Account>, ClientError>> + Send;

    /// Fetches the latest blockhash for transaction anchoring.
    fn get_latest_blockhash(&self) -> impl Future<Output = Result<Hash, ClientError>> + Send;

    /// Fetches the native (lamport) balance of an account.
    fn get_balance(&self, pubkey: &Pubkey) -> impl Future<Output = Result<u64, ClientError>> + Send;
}

impl RpcClientLike for RpcClient {
    fn get_account(
        &self,
        pubkey: &Pubkey,
    ) -> impl Future<Output = Result<Option<Account>, ClientError>> + Send {
        async move {
            let response = self
                .get_account_with_commitment(pubkey, CommitmentConfig::confirmed())
                .await?;
            Ok(response.value)
        }
    }

    fn get_latest_blockhash(&self) -> impl Future<Output = Result<Hash, ClientError>> + Send {
        RpcClient::get_latest_blockhash(self)
    }

    fn get_balance(
        &self,
        pubkey: &Pubkey,
    ) -> impl Future<Output = Result<u64, ClientError>> + Send {
        RpcClient::get_balance(self, pubkey)
    }
}

impl<T: RpcClientLike + Sync + Send> RpcClientLike for Arc<T> {
    fn get_account(
        &self,
        pubkey: &Pubkey,
    ) -> impl Future<Output = Result<Option<Account>, ClientError>> + Send {
        self.as_ref().get_account(pubkey)
    }

    fn get_latest_blockhash(&self) -> impl Future<Output = Result<Hash, ClientError>> + Send {
        self.as_ref().get_latest_blockhash()
    }

    fn get_balance(
        &self,
        pubkey: &Pubkey,
    ) -> impl Future<Output = Result<u64, ClientError>> + Send {
        self.as_ref().get_balance(pubkey)
    }
}
