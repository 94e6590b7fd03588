//! Table manager for spawning and managing multiple table actors.

use super::{
    actor::{TableActor, TableHandle},
    config::{ConfigError, RegistryConfig, TableConfig, TableTier},
    messages::{Notification, TableMessage, TableResponse},
};
use crate::{
    accounts::{Account, AccountStore, FreeChipsClaim},
    game::{
        GameError,
        entities::{BettingAction, DecisionKind, Phase, PlayerId, TableId, TableSnapshot},
    },
    records::HandRecordStore,
};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
    time::Duration,
};
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};

/// Notification buffer handed out by [`TableManager::subscribe`]
const SUBSCRIBER_CAPACITY: usize = 64;

/// Table metadata for discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMetadata {
    pub id: TableId,
    pub name: String,
    pub tier: TableTier,
    pub player_count: usize,
    pub max_players: usize,
    pub phase: Phase,
}

/// A running table as the registry knows it
#[derive(Debug, Clone)]
struct TableEntry {
    handle: TableHandle,
    name: String,
    tier: TableTier,
    max_players: usize,
}

/// Table manager for managing multiple table instances
pub struct TableManager {
    config: RegistryConfig,

    accounts: Arc<dyn AccountStore>,

    records: Arc<dyn HandRecordStore>,

    /// Active table handles
    tables: Arc<RwLock<HashMap<TableId, TableEntry>>>,

    /// Which table each seated player is at
    seating: Arc<RwLock<HashMap<PlayerId, TableId>>>,

    /// Tables created so far per tier, for naming
    tier_counts: Arc<RwLock<HashMap<TableTier, u64>>>,

    /// Held from the seating lookup until the seat is recorded, so an
    /// account is never seated at two tables
    join_lock: Mutex<()>,

    next_table_id: AtomicI64,
}

impl TableManager {
    /// Create a new table manager
    ///
    /// # Arguments
    ///
    /// * `config` - Settings applied to every table
    /// * `accounts` - Account store
    /// * `records` - Hand history store
    ///
    /// # Errors
    ///
    /// * `ConfigError::Invalid` - The settings would produce invalid tables
    pub fn new(
        config: RegistryConfig,
        accounts: Arc<dyn AccountStore>,
        records: Arc<dyn HandRecordStore>,
    ) -> Result<Self, ConfigError> {
        let manager = Self {
            config,
            accounts,
            records,
            tables: Arc::new(RwLock::new(HashMap::new())),
            seating: Arc::new(RwLock::new(HashMap::new())),
            tier_counts: Arc::new(RwLock::new(HashMap::new())),
            join_lock: Mutex::new(()),
            next_table_id: AtomicI64::new(1),
        };
        manager.table_config(TableTier::Beginner, 1).validate()?;
        Ok(manager)
    }

    fn table_config(&self, tier: TableTier, number: u64) -> TableConfig {
        TableConfig {
            name: tier.table_name(number),
            tier,
            max_players: self.config.max_players,
            ante: tier.ante(),
            timers: self.config.timers.clone(),
            auto_tick: self.config.auto_tick,
            tick_interval: Duration::from_millis(self.config.tick_interval_ms),
        }
    }

    /// Create a table for `tier` and spawn its actor
    pub async fn create_table(&self, tier: TableTier) -> TableId {
        let table_id = self.next_table_id.fetch_add(1, Ordering::SeqCst);
        let number = {
            let mut counts = self.tier_counts.write().await;
            let count = counts.entry(tier).or_insert(0);
            *count += 1;
            *count
        };
        let config = self.table_config(tier, number);

        // Hand history is best-effort, so a table still opens without it
        let game_id = match self.records.create_game(table_id, &config.name).await {
            Ok(game_id) => game_id,
            Err(e) => {
                log::warn!("Table {}: Failed to create game record: {}", table_id, e);
                0
            }
        };

        let name = config.name.clone();
        let max_players = config.max_players;

        // Create and spawn table actor
        let (actor, handle) = TableActor::new(
            table_id,
            game_id,
            config,
            Arc::clone(&self.accounts),
            Arc::clone(&self.records),
        );

        let mut tables = self.tables.write().await;
        tables.insert(
            table_id,
            TableEntry {
                handle,
                name,
                tier,
                max_players,
            },
        );
        drop(tables);

        tokio::spawn(async move {
            actor.run().await;
        });

        log::info!("Created and spawned table {}", table_id);

        table_id
    }

    /// Get a table handle
    pub async fn get_table(&self, table_id: TableId) -> Option<TableHandle> {
        let tables = self.tables.read().await;
        tables.get(&table_id).map(|entry| entry.handle.clone())
    }

    /// Seat a player at a table of their tier, creating one if needed
    ///
    /// A player who is already seated gets their current table back.
    ///
    /// # Errors
    ///
    /// * `GameError::InvalidSession` - Empty session token
    pub async fn join_table(
        &self,
        session_token: &str,
        display_name: &str,
    ) -> Result<TableSnapshot, GameError> {
        let account = self
            .accounts
            .get_or_create_account(session_token, display_name)
            .await?;

        let _joining = self.join_lock.lock().await;
        if let Some(table_id) = self.table_of(account.id).await {
            match self.snapshot(table_id, Some(account.id)).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(_) => self.forget_table(table_id).await,
            }
        }

        let tier = TableTier::for_balance(account.balance);
        for table_id in self.candidates(tier).await {
            match self.seat_at(table_id, &account).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(GameError::TableFull | GameError::TableClosed | GameError::TableNotFound) => {
                    log::debug!("Table {} unavailable for player {}", table_id, account.id);
                }
                Err(e) => return Err(e),
            }
        }

        let table_id = self.create_table(tier).await;
        self.seat_at(table_id, &account).await
    }

    /// Open tables of `tier`, lowest id first
    async fn candidates(&self, tier: TableTier) -> Vec<TableId> {
        let tables = self.tables.read().await;
        let mut ids: Vec<TableId> = tables
            .iter()
            .filter(|(_, entry)| entry.tier == tier && !entry.handle.is_closed())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    async fn seat_at(
        &self,
        table_id: TableId,
        account: &Account,
    ) -> Result<TableSnapshot, GameError> {
        let snapshot = self
            .request(table_id, |response| TableMessage::JoinTable {
                player_id: account.id,
                name: account.display_name.clone(),
                chips: account.balance,
                response,
            })
            .await?;
        self.seating.write().await.insert(account.id, table_id);
        Ok(snapshot)
    }

    /// Take a player off their table. Their chips go back to their account.
    pub async fn leave_table(&self, session_token: &str) -> Result<TableSnapshot, GameError> {
        let (player_id, table_id) = self.seated_player(session_token).await?;
        let result = self
            .request(table_id, |response| TableMessage::LeaveTable {
                player_id,
                response,
            })
            .await;

        match &result {
            Ok(snapshot) => {
                self.seating.write().await.remove(&player_id);
                if snapshot.players.is_empty() {
                    self.forget_table(table_id).await;
                }
            }
            Err(GameError::PlayerNotAtTable) => {
                self.seating.write().await.remove(&player_id);
            }
            Err(_) => {}
        }
        result
    }

    pub async fn submit_betting_action(
        &self,
        session_token: &str,
        action: BettingAction,
    ) -> Result<TableSnapshot, GameError> {
        let (player_id, table_id) = self.seated_player(session_token).await?;
        self.request(table_id, |response| TableMessage::BettingAction {
            player_id,
            action,
            response,
        })
        .await
    }

    pub async fn submit_classification_action(
        &self,
        session_token: &str,
        kind: DecisionKind,
        card_idx: usize,
    ) -> Result<TableSnapshot, GameError> {
        let (player_id, table_id) = self.seated_player(session_token).await?;
        self.request(table_id, |response| TableMessage::ClassificationAction {
            player_id,
            kind,
            card_idx,
            response,
        })
        .await
    }

    pub async fn send_chat(
        &self,
        session_token: &str,
        message: &str,
    ) -> Result<TableSnapshot, GameError> {
        let (player_id, table_id) = self.seated_player(session_token).await?;
        let message = message.to_string();
        self.request(table_id, |response| TableMessage::SendChat {
            player_id,
            message,
            response,
        })
        .await
    }

    /// Count a table's countdown down by one tick by hand
    pub async fn tick(&self, table_id: TableId) -> Result<TableSnapshot, GameError> {
        let handle = self
            .get_table(table_id)
            .await
            .ok_or(GameError::TableNotFound)?;
        handle
            .send(TableMessage::TimerTick { generation: None })
            .await?;
        self.snapshot(table_id, None).await
    }

    /// Get the table as seen by `viewer`
    pub async fn snapshot(
        &self,
        table_id: TableId,
        viewer: Option<PlayerId>,
    ) -> Result<TableSnapshot, GameError> {
        self.request(table_id, |response| TableMessage::GetSnapshot {
            player_id: viewer,
            response,
        })
        .await
    }

    /// Receive notifications from the player's table
    pub async fn subscribe(
        &self,
        session_token: &str,
    ) -> Result<mpsc::Receiver<Notification>, GameError> {
        let (player_id, table_id) = self.seated_player(session_token).await?;
        let handle = self
            .get_table(table_id)
            .await
            .ok_or(GameError::TableNotFound)?;
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_CAPACITY);
        handle
            .send(TableMessage::Subscribe { player_id, sender })
            .await?;
        Ok(receiver)
    }

    pub async fn unsubscribe(&self, session_token: &str) -> Result<(), GameError> {
        let (player_id, table_id) = self.seated_player(session_token).await?;
        if let Some(handle) = self.get_table(table_id).await {
            handle.send(TableMessage::Unsubscribe { player_id }).await?;
        }
        Ok(())
    }

    /// Top up a short account. Only possible away from the tables, since a
    /// seated player's balance is held by their table.
    pub async fn claim_free_chips(&self, session_token: &str) -> Result<FreeChipsClaim, GameError> {
        if self.seated_player(session_token).await.is_ok() {
            return Err(GameError::AccountStore(
                "cannot claim free chips while seated".to_string(),
            ));
        }
        Ok(self.accounts.claim_free_chips(session_token).await?)
    }

    /// List all active tables
    pub async fn list_tables(&self) -> Vec<TableMetadata> {
        let entries: Vec<(TableId, TableEntry)> = {
            let tables = self.tables.read().await;
            tables.iter().map(|(id, e)| (*id, e.clone())).collect()
        };

        let mut metadata_list = Vec::with_capacity(entries.len());
        for (table_id, entry) in entries {
            let Ok(snapshot) = self.snapshot(table_id, None).await else {
                continue;
            };
            metadata_list.push(TableMetadata {
                id: table_id,
                name: entry.name,
                tier: entry.tier,
                player_count: snapshot.players.len(),
                max_players: entry.max_players,
                phase: snapshot.phase,
            });
        }
        metadata_list.sort_by_key(|metadata| metadata.id);
        metadata_list
    }

    /// Get active table count
    pub async fn active_table_count(&self) -> usize {
        let tables = self.tables.read().await;
        tables.len()
    }

    async fn table_of(&self, player_id: PlayerId) -> Option<TableId> {
        self.seating.read().await.get(&player_id).copied()
    }

    async fn seated_player(&self, session_token: &str) -> Result<(PlayerId, TableId), GameError> {
        if session_token.trim().is_empty() {
            return Err(GameError::InvalidSession);
        }
        let account = self
            .accounts
            .find_by_token(session_token)
            .await?
            .ok_or(GameError::InvalidSession)?;
        let table_id = self
            .table_of(account.id)
            .await
            .ok_or(GameError::PlayerNotAtTable)?;
        Ok((account.id, table_id))
    }

    /// Drop a table that closed, along with any seating that points at it
    async fn forget_table(&self, table_id: TableId) {
        if self.tables.write().await.remove(&table_id).is_some() {
            log::info!("Removed table {} from registry", table_id);
        }
        self.seating
            .write()
            .await
            .retain(|_, seated_at| *seated_at != table_id);
    }

    /// Send a request to a table and wait for its answer
    async fn request<F>(&self, table_id: TableId, message: F) -> Result<TableSnapshot, GameError>
    where
        F: FnOnce(oneshot::Sender<TableResponse>) -> TableMessage,
    {
        let handle = self
            .get_table(table_id)
            .await
            .ok_or(GameError::TableNotFound)?;

        let (tx, rx) = oneshot::channel();
        handle.send(message(tx)).await?;

        rx.await
            .map_err(|_| GameError::TableClosed)?
            .into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accounts::InMemoryAccountStore, records::InMemoryHandRecordStore,
        table::config::PhaseTimers,
    };

    fn manager() -> (TableManager, Arc<InMemoryAccountStore>) {
        let accounts = Arc::new(InMemoryAccountStore::new());
        let records = Arc::new(InMemoryHandRecordStore::new());
        let config = RegistryConfig {
            timers: PhaseTimers::uniform(5),
            auto_tick: false,
            ..RegistryConfig::default()
        };
        let manager = TableManager::new(
            config,
            Arc::clone(&accounts) as Arc<dyn AccountStore>,
            records,
        )
        .unwrap();
        (manager, accounts)
    }

    // === Registry Tests ===

    #[tokio::test]
    async fn test_join_creates_beginner_table() {
        let (manager, _) = manager();
        let snapshot = manager.join_table("tok-a", "alice").await.unwrap();
        assert_eq!(snapshot.name, "Beginner Table #1");
        assert_eq!(manager.active_table_count().await, 1);
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let (manager, _) = manager();
        let first = manager.join_table("tok-a", "alice").await.unwrap();
        let second = manager.join_table("tok-a", "alice").await.unwrap();
        assert_eq!(first.table_id, second.table_id);
        assert_eq!(second.players.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_joins_seat_account_once() {
        let (manager, _) = manager();
        let (a, b, c) = tokio::join!(
            manager.join_table("tok-a", "alice"),
            manager.join_table("tok-a", "alice"),
            manager.join_table("tok-a", "alice"),
        );
        let table_id = a.unwrap().table_id;
        assert_eq!(b.unwrap().table_id, table_id);
        assert_eq!(c.unwrap().table_id, table_id);

        let tables = manager.list_tables().await;
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].player_count, 1);
    }

    #[tokio::test]
    async fn test_full_table_spills_to_new_table() {
        let (manager, _) = manager();
        for i in 0..6 {
            manager
                .join_table(&format!("tok-{i}"), &format!("p{i}"))
                .await
                .unwrap();
        }
        let tables = manager.list_tables().await;
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].player_count, 5);
        assert_eq!(tables[1].player_count, 1);
        assert_eq!(tables[1].name, "Beginner Table #2");
    }

    #[tokio::test]
    async fn test_tier_from_balance() {
        let (manager, accounts) = manager();
        let account = accounts
            .get_or_create_account("rich", "rich")
            .await
            .unwrap();
        accounts.sync_balance(account.id, 2500).await.unwrap();
        let snapshot = manager.join_table("rich", "rich").await.unwrap();
        assert_eq!(snapshot.name, "Expert Table #1");
        let tables = manager.list_tables().await;
        assert_eq!(tables[0].tier, TableTier::Expert);
    }

    #[tokio::test]
    async fn test_last_leave_removes_table() {
        let (manager, _) = manager();
        manager.join_table("tok-a", "alice").await.unwrap();
        manager.leave_table("tok-a").await.unwrap();
        assert_eq!(manager.active_table_count().await, 0);
        assert_eq!(
            manager.leave_table("tok-a").await.unwrap_err(),
            GameError::PlayerNotAtTable
        );
    }

    #[tokio::test]
    async fn test_actions_need_a_session() {
        let (manager, _) = manager();
        assert_eq!(
            manager
                .submit_betting_action("", BettingAction::Check)
                .await
                .unwrap_err(),
            GameError::InvalidSession
        );
        assert_eq!(
            manager.send_chat("ghost", "hi").await.unwrap_err(),
            GameError::InvalidSession
        );
        assert_eq!(manager.join_table("", "x").await.unwrap_err(), GameError::InvalidSession);
        assert_eq!(manager.tick(99).await.unwrap_err(), GameError::TableNotFound);
    }

    #[tokio::test]
    async fn test_chat_goes_to_seated_table() {
        let (manager, accounts) = manager();
        accounts.get_or_create_account("tok-b", "bob").await.unwrap();
        assert_eq!(
            manager.send_chat("tok-b", "hi").await.unwrap_err(),
            GameError::PlayerNotAtTable
        );

        let joined = manager.join_table("tok-a", "alice").await.unwrap();
        let snapshot = manager.send_chat("tok-a", "hi").await.unwrap();
        assert_eq!(snapshot.table_id, joined.table_id);
    }

    #[tokio::test]
    async fn test_free_chips_only_when_away() {
        let (manager, accounts) = manager();
        manager.join_table("tok-a", "alice").await.unwrap();
        assert!(manager.claim_free_chips("tok-a").await.is_err());

        manager.leave_table("tok-a").await.unwrap();
        let account = accounts.find_by_token("tok-a").await.unwrap().unwrap();
        accounts.sync_balance(account.id, 40).await.unwrap();
        let claim = manager.claim_free_chips("tok-a").await.unwrap();
        assert_eq!(claim.amount, 60);
    }
}
