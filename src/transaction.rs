//! Assembly of unsigned SPL token transfer transactions.
//!
//! The instruction list is fixed: compute-budget limit and price at positions
//! 0 and 1 (facilitator fee-payer infrastructure depends on those positions),
//! then an optional create-ATA instruction for the recipient, then the
//! checked transfer. The transaction's fee payer is the facilitator, not the
//! user: the user signs only as token authority.

use solana_account::Account;
use solana_client::client_error::ClientError;
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_instruction::AccountMeta;
use solana_message::v0::Message as MessageV0;
use solana_message::VersionedMessage;
use solana_pubkey::{Pubkey, pubkey};
use solana_transaction::Instruction;
use solana_transaction::versioned::VersionedTransaction;
use spl_token::solana_program::program_pack::Pack;

use crate::chain::{Address, RpcClientLike};

/// Associated token account program.
pub const ATA_PROGRAM_PUBKEY: Pubkey = pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// System program, referenced by the create-ATA instruction.
pub const SYSTEM_PROGRAM_PUBKEY: Pubkey = pubkey!("11111111111111111111111111111111");

/// Compute unit ceiling: enough for a checked transfer plus ATA creation.
pub const COMPUTE_UNIT_LIMIT: u32 = 40_000;

/// Minimal priority fee, in micro-lamports per compute unit.
pub const COMPUTE_UNIT_PRICE: u64 = 1;

/// Errors raised while assembling a transfer transaction.
///
/// None of these are retried here; they propagate to the caller.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The payer has no funded token account for the asset.
    #[error("No token account for this asset: fund the wallet first")]
    NoTokenAccount,
    /// The mint account is missing or cannot be decoded.
    #[error("Mint lookup failed: {0}")]
    MintLookupFailed(String),
    /// The ledger RPC collaborator failed.
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(#[from] ClientError),
    /// Instruction or message assembly failed.
    #[error("Cannot assemble transaction: {0}")]
    Assemble(String),
}

/// Mint metadata resolved from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mint {
    Token { decimals: u8 },
    Token2022 { decimals: u8 },
}

impl Mint {
    pub fn token_program(&self) -> Pubkey {
        match self {
            Mint::Token { .. } => spl_token::id(),
            Mint::Token2022 { .. } => spl_token_2022::id(),
        }
    }

    pub fn decimals(&self) -> u8 {
        match self {
            Mint::Token { decimals } | Mint::Token2022 { decimals } => *decimals,
        }
    }
}

/// Resolves the token program variant and decimals for a mint.
///
/// The variant is decided by the mint account's owner; an unrecognized owner
/// falls back to the legacy token program.
pub async fn fetch_mint<R: RpcClientLike>(rpc: &R, mint: &Pubkey) -> Result<Mint, BuildError> {
    let account = rpc
        .get_account(mint)
        .await?
        .ok_or_else(|| BuildError::MintLookupFailed(format!("mint account {mint} not found")))?;
    if account.owner == spl_token_2022::id() {
        let state = spl_token_2022::state::Mint::unpack(&account.data)
            .map_err(|e| BuildError::MintLookupFailed(format!("cannot unpack mint {mint}: {e}")))?;
        Ok(Mint::Token2022 {
            decimals: state.decimals,
        })
    } else {
        let state = spl_token::state::Mint::unpack(&account.data)
            .map_err(|e| BuildError::MintLookupFailed(format!("cannot unpack mint {mint}: {e}")))?;
        Ok(Mint::Token {
            decimals: state.decimals,
        })
    }
}

/// Derives the associated token account for `(owner, mint)` under the given
/// token program.
pub fn derive_associated_token_account(
    owner: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
) -> Pubkey {
    let (ata, _) = Pubkey::find_program_address(
        &[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
        &ATA_PROGRAM_PUBKEY,
    );
    ata
}

/// Create-ATA instruction for the recipient, funded by the fee payer so a
/// third party covers the rent instead of the user.
fn create_ata_instruction(
    fee_payer: &Pubkey,
    ata: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
) -> Instruction {
    Instruction::new_with_bytes(
        ATA_PROGRAM_PUBKEY,
        // Create discriminator
        &[0],
        vec![
            AccountMeta::new(*fee_payer, true),
            AccountMeta::new(*ata, false),
            AccountMeta::new_readonly(*owner, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_PUBKEY, false),
            AccountMeta::new_readonly(*token_program, false),
        ],
    )
}

fn account_exists(account: Option<Account>) -> bool {
    account.is_some()
}

/// Builds an unsigned transfer of `amount` atomic units of `mint` from
/// `payer` to `recipient`, with `fee_payer` designated as the transaction's
/// fee payer.
///
/// The payer's associated token account must already exist; it is never
/// created here. The recipient's is created on the fly, rent on the fee
/// payer.
pub async fn build_transfer_transaction<R: RpcClientLike>(
    rpc: &R,
    payer: &Pubkey,
    recipient: &Address,
    amount: u64,
    mint: &Address,
    fee_payer: &Pubkey,
) -> Result<VersionedTransaction, BuildError> {
    let mint_info = fetch_mint(rpc, mint.pubkey()).await?;
    let token_program = mint_info.token_program();

    let source_ata = derive_associated_token_account(payer, mint.pubkey(), &token_program);
    let destination_ata =
        derive_associated_token_account(recipient.pubkey(), mint.pubkey(), &token_program);

    if !account_exists(rpc.get_account(&source_ata).await?) {
        return Err(BuildError::NoTokenAccount);
    }

    // Compute-budget instructions MUST occupy positions 0 and 1.
    let mut instructions = vec![
        ComputeBudgetInstruction::set_compute_unit_limit(COMPUTE_UNIT_LIMIT),
        ComputeBudgetInstruction::set_compute_unit_price(COMPUTE_UNIT_PRICE),
    ];

    if !account_exists(rpc.get_account(&destination_ata).await?) {
        instructions.push(create_ata_instruction(
            fee_payer,
            &destination_ata,
            recipient.pubkey(),
            mint.pubkey(),
            &token_program,
        ));
    }

    let transfer = match mint_info {
        Mint::Token { decimals } => spl_token::instruction::transfer_checked(
            &token_program,
            &source_ata,
            mint.pubkey(),
            &destination_ata,
            payer,
            &[],
            amount,
            decimals,
        )
        .map_err(|e| BuildError::Assemble(format!("{e}")))?,
        Mint::Token2022 { decimals } => spl_token_2022::instruction::transfer_checked(
            &token_program,
            &source_ata,
            mint.pubkey(),
            &destination_ata,
            payer,
            &[],
            amount,
            decimals,
        )
        .map_err(|e| BuildError::Assemble(format!("{e}")))?,
    };
    instructions.push(transfer);

    let recent_blockhash = rpc.get_latest_blockhash().await?;
    let message = MessageV0::try_compile(fee_payer, &instructions, &[], recent_blockhash)
        .map_err(|e| BuildError::Assemble(format!("{e:?}")))?;

    tracing::debug!(
        %mint,
        %recipient,
        amount,
        instructions = instructions.len(),
        "built unsigned transfer transaction"
    );

    Ok(VersionedTransaction {
        signatures: vec![],
        message: VersionedMessage::V0(message),
    })
}
