//! Read-only balance queries.
//!
//! Balance reads are advisory: a UI shows them, nothing settles on them. A
//! failed read therefore never aborts a flow. It comes back as a zero balance
//! with the error attached for display.

use solana_pubkey::Pubkey;

use crate::amount::to_decimal;
use crate::chain::{Address, RpcClientLike};
use crate::proto::TokenInfo;
use crate::transaction::{Mint, derive_associated_token_account, fetch_mint};
use spl_token::solana_program::program_pack::Pack;
use spl_token_2022::extension::StateWithExtensions;

/// Decimals used when formatting native SOL balances.
const NATIVE_DECIMALS: u8 = 9;

/// Why a balance read failed. Carried inside [`Balance`], never returned as
/// a hard error.
#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(#[from] solana_client::client_error::ClientError),
    #[error("Mint lookup failed: {0}")]
    MintLookupFailed(String),
    #[error("Token account is undecodable: {0}")]
    UndecodableAccount(String),
}

/// A balance snapshot. On failure `atomic` is zero, `formatted` is `"0"` and
/// `error` explains why.
#[derive(Debug)]
pub struct Balance {
    /// Raw amount in atomic units.
    pub atomic: u64,
    /// Human-decimal rendering.
    pub formatted: String,
    /// Set when the read failed and the zeros above are placeholders.
    pub error: Option<BalanceError>,
}

impl Balance {
    fn zero(error: BalanceError) -> Self {
        Self {
            atomic: 0,
            formatted: "0".to_string(),
            error: Some(error),
        }
    }

    fn of(atomic: u64, decimals: u8) -> Self {
        // Formatting an in-range u64 cannot fail.
        let formatted =
            to_decimal(&atomic.to_string(), decimals).unwrap_or_else(|_| "0".to_string());
        Self {
            atomic,
            formatted,
            error: None,
        }
    }
}

/// Reads the owner's balance of `token`, in the token's atomic units.
///
/// A missing associated token account reads as a genuine zero, not an error.
pub async fn token_balance<R: RpcClientLike>(
    rpc: &R,
    owner: &Pubkey,
    token: &TokenInfo,
) -> Balance {
    let mint_info = match fetch_mint(rpc, token.mint.pubkey()).await {
        Ok(mint_info) => mint_info,
        Err(err) => {
            tracing::warn!(mint = %token.mint, %err, "balance read failed");
            return Balance::zero(BalanceError::MintLookupFailed(err.to_string()));
        }
    };
    let ata =
        derive_associated_token_account(owner, token.mint.pubkey(), &mint_info.token_program());

    let account = match rpc.get_account(&ata).await {
        Ok(account) => account,
        Err(err) => {
            tracing::warn!(mint = %token.mint, %err, "balance read failed");
            return Balance::zero(BalanceError::LedgerUnavailable(err));
        }
    };
    let Some(account) = account else {
        return Balance::of(0, token.decimals);
    };

    // Token-2022 accounts carry TLV extensions past the base layout, so a
    // plain Pack unpack would reject them on length.
    let amount = match mint_info {
        Mint::Token { .. } => {
            spl_token::state::Account::unpack(&account.data).map(|state| state.amount)
        }
        Mint::Token2022 { .. } => {
            StateWithExtensions::<spl_token_2022::state::Account>::unpack(&account.data)
                .map(|state| state.base.amount)
        }
    };
    match amount {
        Ok(amount) => Balance::of(amount, token.decimals),
        Err(err) => Balance::zero(BalanceError::UndecodableAccount(err.to_string())),
    }
}

/// Reads the owner's native SOL balance in lamports.
pub async fn native_balance<R: RpcClientLike>(rpc: &R, owner: &Address) -> Balance {
    match rpc.get_balance(owner.pubkey()).await {
        Ok(lamports) => Balance::of(lamports, NATIVE_DECIMALS),
        Err(err) => {
            tracing::warn!(%owner, %err, "native balance read failed");
            Balance::zero(BalanceError::LedgerUnavailable(err))
        }
    }
}
