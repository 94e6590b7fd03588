//! Account store trait and the in-memory implementation.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{
    errors::{AccountError, AccountResult},
    models::{Account, FreeChipsClaim},
};
use crate::game::{
    constants::STARTING_CHIPS,
    entities::{Chips, PlayerId},
};

/// Trait for player account operations
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look up the account for a session token, creating it with the
    /// starting balance on first sight
    async fn get_or_create_account(
        &self,
        session_token: &str,
        display_name: &str,
    ) -> AccountResult<Account>;

    /// Find account by session token
    async fn find_by_token(&self, session_token: &str) -> AccountResult<Option<Account>>;

    /// Find account by player ID
    async fn find_by_id(&self, player_id: PlayerId) -> AccountResult<Option<Account>>;

    /// Add chips to an account, returning the new balance
    async fn credit_balance(&self, player_id: PlayerId, amount: Chips) -> AccountResult<Chips>;

    /// Overwrite the stored balance with the table's chip count
    async fn sync_balance(&self, player_id: PlayerId, balance: Chips) -> AccountResult<()>;

    /// Top a short account back up to the free chips level
    async fn claim_free_chips(&self, session_token: &str) -> AccountResult<FreeChipsClaim>;
}

#[derive(Debug, Default)]
struct Accounts {
    by_id: HashMap<PlayerId, Account>,
    by_token: HashMap<String, PlayerId>,
    next_id: PlayerId,
}

/// Account store kept in process memory
#[derive(Debug)]
pub struct InMemoryAccountStore {
    accounts: RwLock<Accounts>,
    starting_chips: Chips,
    free_chips_cooldown: Duration,
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::with_free_chips_cooldown(Duration::hours(1))
    }

    pub fn with_free_chips_cooldown(free_chips_cooldown: Duration) -> Self {
        Self {
            accounts: RwLock::new(Accounts::default()),
            starting_chips: STARTING_CHIPS,
            free_chips_cooldown,
        }
    }

    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.by_id.len()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn get_or_create_account(
        &self,
        session_token: &str,
        display_name: &str,
    ) -> AccountResult<Account> {
        if session_token.trim().is_empty() {
            return Err(AccountError::InvalidSession);
        }

        let mut accounts = self.accounts.write().await;
        if let Some(id) = accounts.by_token.get(session_token).copied() {
            return accounts
                .by_id
                .get(&id)
                .cloned()
                .ok_or(AccountError::AccountNotFound(id));
        }

        accounts.next_id += 1;
        let id = accounts.next_id;
        let now = Utc::now();
        let account = Account {
            id,
            session_token: session_token.to_string(),
            display_name: display_name.to_string(),
            balance: self.starting_chips,
            created_at: now,
            updated_at: now,
            last_free_chips_at: None,
        };
        accounts.by_token.insert(session_token.to_string(), id);
        accounts.by_id.insert(id, account.clone());
        log::info!("Created account {} for '{}'", id, display_name);
        Ok(account)
    }

    async fn find_by_token(&self, session_token: &str) -> AccountResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .by_token
            .get(session_token)
            .and_then(|id| accounts.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, player_id: PlayerId) -> AccountResult<Option<Account>> {
        Ok(self.accounts.read().await.by_id.get(&player_id).cloned())
    }

    async fn credit_balance(&self, player_id: PlayerId, amount: Chips) -> AccountResult<Chips> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .by_id
            .get_mut(&player_id)
            .ok_or(AccountError::AccountNotFound(player_id))?;
        account.balance = account.balance.saturating_add(amount);
        account.updated_at = Utc::now();
        Ok(account.balance)
    }

    async fn sync_balance(&self, player_id: PlayerId, balance: Chips) -> AccountResult<()> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .by_id
            .get_mut(&player_id)
            .ok_or(AccountError::AccountNotFound(player_id))?;
        account.balance = balance;
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn claim_free_chips(&self, session_token: &str) -> AccountResult<FreeChipsClaim> {
        let mut accounts = self.accounts.write().await;
        let id = accounts
            .by_token
            .get(session_token)
            .copied()
            .ok_or(AccountError::InvalidSession)?;
        let account = accounts
            .by_id
            .get_mut(&id)
            .ok_or(AccountError::AccountNotFound(id))?;

        if account.balance >= self.starting_chips {
            return Err(AccountError::BalanceTooHigh(account.balance));
        }

        let now = Utc::now();
        if let Some(last) = account.last_free_chips_at {
            let next_claim_at = last + self.free_chips_cooldown;
            if now < next_claim_at {
                return Err(AccountError::FreeChipsUnavailable(next_claim_at));
            }
        }

        let amount = self.starting_chips - account.balance;
        account.balance = self.starting_chips;
        account.last_free_chips_at = Some(now);
        account.updated_at = now;
        log::info!("Player {} claimed {} free chips", id, amount);

        Ok(FreeChipsClaim {
            player_id: id,
            amount,
            balance: account.balance,
            claimed_at: now,
            next_claim_at: now + self.free_chips_cooldown,
        })
    }
}
