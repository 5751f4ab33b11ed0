//! In-memory ledger double for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use solana_account::Account;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_message::Hash;
use solana_pubkey::Pubkey;
use spl_token::solana_program::program_option::COption;
use spl_token::solana_program::program_pack::Pack;
use spl_token_2022::extension::immutable_owner::ImmutableOwner;
use spl_token_2022::extension::{
    BaseStateWithExtensionsMut, ExtensionType, StateWithExtensionsMut,
};

use crate::chain::RpcClientLike;

/// A canned set of accounts served over the [`RpcClientLike`] interface.
///
/// Built once per test with the `with_*` constructors; every RPC hit after
/// that resolves from the map. `offline()` turns the whole ledger into an
/// error source.
pub struct MockLedger {
    accounts: HashMap<Pubkey, Account>,
    lamports: HashMap<Pubkey, u64>,
    offline: bool,
    blockhash_reads: AtomicUsize,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
            lamports: HashMap::new(),
            offline: false,
            blockhash_reads: AtomicUsize::new(0),
        }
    }

    /// Registers a mint account with the given decimals, owned by the legacy
    /// token program or token-2022.
    pub fn with_mint(mut self, mint: &Pubkey, decimals: u8, token_2022: bool) -> Self {
        let (owner, data) = if token_2022 {
            let state = spl_token_2022::state::Mint {
                mint_authority: COption::None,
                supply: 0,
                decimals,
                is_initialized: true,
                freeze_authority: COption::None,
            };
            let mut data = vec![0u8; spl_token_2022::state::Mint::LEN];
            spl_token_2022::state::Mint::pack(state, &mut data).unwrap();
            (spl_token_2022::id(), data)
        } else {
            let state = spl_token::state::Mint {
                mint_authority: COption::None,
                supply: 0,
                decimals,
                is_initialized: true,
                freeze_authority: COption::None,
            };
            let mut data = vec![0u8; spl_token::state::Mint::LEN];
            spl_token::state::Mint::pack(state, &mut data).unwrap();
            (spl_token::id(), data)
        };
        self.accounts.insert(
            *mint,
            Account {
                lamports: 1,
                data,
                owner,
                executable: false,
                rent_epoch: 0,
            },
        );
        self
    }

    /// Registers an empty token account at `address`.
    pub fn with_token_account(self, address: Pubkey) -> Self {
        self.with_funded_token_account(address, 0)
    }

    /// Registers a token account at `address` holding `amount` atomic units.
    pub fn with_funded_token_account(mut self, address: Pubkey, amount: u64) -> Self {
        let state = spl_token::state::Account {
            mint: Pubkey::default(),
            owner: Pubkey::default(),
            amount,
            delegate: COption::None,
            state: spl_token::state::AccountState::Initialized,
            is_native: COption::None,
            delegated_amount: 0,
            close_authority: COption::None,
        };
        let mut data = vec![0u8; spl_token::state::Account::LEN];
        spl_token::state::Account::pack(state, &mut data).unwrap();
        self.accounts.insert(
            address,
            Account {
                lamports: 1,
                data,
                owner: spl_token::id(),
                executable: false,
                rent_epoch: 0,
            },
        );
        self
    }

    /// Registers a token-2022 account at `address` holding `amount` atomic
    /// units, with the ImmutableOwner extension every associated account of
    /// that program carries.
    pub fn with_funded_token_2022_account(mut self, address: Pubkey, amount: u64) -> Self {
        let len = ExtensionType::try_calculate_account_len::<spl_token_2022::state::Account>(&[
            ExtensionType::ImmutableOwner,
        ])
        .unwrap();
        let mut data = vec![0u8; len];
        let mut state =
            StateWithExtensionsMut::<spl_token_2022::state::Account>::unpack_uninitialized(
                &mut data,
            )
            .unwrap();
        state.init_extension::<ImmutableOwner>(true).unwrap();
        state.base = spl_token_2022::state::Account {
            mint: Pubkey::default(),
            owner: Pubkey::default(),
            amount,
            delegate: COption::None,
            state: spl_token_2022::state::AccountState::Initialized,
            is_native: COption::None,
            delegated_amount: 0,
            close_authority: COption::None,
        };
        state.pack_base();
        state.init_account_type().unwrap();
        self.accounts.insert(
            address,
            Account {
                lamports: 1,
                data,
                owner: spl_token_2022::id(),
                executable: false,
                rent_epoch: 0,
            },
        );
        self
    }

    /// Sets the native balance reported for `address`.
    pub fn with_lamports(mut self, address: Pubkey, lamports: u64) -> Self {
        self.lamports.insert(address, lamports);
        self
    }

    /// Makes every RPC call fail.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    /// Number of blockhash fetches observed so far.
    pub fn blockhash_reads(&self) -> usize {
        self.blockhash_reads.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), ClientError> {
        if self.offline {
            Err(ClientError::from(ClientErrorKind::Custom(
                "mock ledger offline".to_string(),
            )))
        } else {
            Ok(())
        }
    }
}

impl RpcClientLike for MockLedger {
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, ClientError> {
        self.check_online()?;
        Ok(self.accounts.get(pubkey).cloned())
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, ClientError> {
        self.check_online()?;
        self.blockhash_reads.fetch_add(1, Ordering::SeqCst);
        Ok(Hash::default())
    }

    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, ClientError> {
        self.check_online()?;
        Ok(self.lamports.get(pubkey).copied().unwrap_or(0))
    }
}
