//! Table actor implementation with async message handling.

use super::{
    config::TableConfig,
    messages::{ChatMessage, Notification, TableMessage, TableResponse},
    timer::{TickOutcome, TimerSupervisor},
};
use crate::{
    accounts::AccountStore,
    game::{
        GameError, GameEvent, GameSettings, TableSession,
        entities::{
            BettingAction, Chips, DecisionKind, GameId, HandId, PlayerId, TableId, TableSnapshot,
        },
    },
    records::HandRecordStore,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Table actor handle for sending messages
#[derive(Clone, Debug)]
pub struct TableHandle {
    sender: mpsc::Sender<TableMessage>,
    table_id: TableId,
}

impl TableHandle {
    /// Create a new table handle
    pub fn new(sender: mpsc::Sender<TableMessage>, table_id: TableId) -> Self {
        Self { sender, table_id }
    }

    /// Get table ID
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Send a message to the table
    pub async fn send(&self, message: TableMessage) -> Result<(), GameError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| GameError::TableClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Table actor running a single Three Card Tango table
pub struct TableActor {
    /// Table ID
    id: TableId,

    /// Table configuration
    config: TableConfig,

    /// Game state (FSM)
    session: TableSession,

    /// Message inbox
    inbox: mpsc::Receiver<TableMessage>,

    /// Handed to timer tasks so they never keep the table alive
    self_sender: mpsc::WeakSender<TableMessage>,

    timer: TimerSupervisor,

    accounts: Arc<dyn AccountStore>,

    records: Arc<dyn HandRecordStore>,

    /// Hand record for the hand in progress
    current_hand: Option<HandId>,

    /// Subscribers for table notifications
    subscribers: HashMap<PlayerId, mpsc::Sender<Notification>>,

    /// Is table closed
    is_closed: bool,
}

impl TableActor {
    /// Create a new table actor
    ///
    /// # Arguments
    ///
    /// * `id` - Table ID
    /// * `game_id` - Game record the table files its hands under
    /// * `config` - Table configuration
    /// * `accounts` - Account store balances are synced to
    /// * `records` - Hand history store
    ///
    /// # Returns
    ///
    /// * `(TableActor, TableHandle)` - Actor and handle for sending messages
    pub fn new(
        id: TableId,
        game_id: GameId,
        config: TableConfig,
        accounts: Arc<dyn AccountStore>,
        records: Arc<dyn HandRecordStore>,
    ) -> (Self, TableHandle) {
        let (sender, inbox) = mpsc::channel(100);

        let settings = GameSettings::new(config.ante, config.max_players);
        let session = TableSession::new(id, game_id, settings);
        let timer = TimerSupervisor::new(config.tick_interval, config.auto_tick);

        let actor = Self {
            id,
            config,
            session,
            inbox,
            self_sender: sender.downgrade(),
            timer,
            accounts,
            records,
            current_hand: None,
            subscribers: HashMap::new(),
            is_closed: false,
        };

        let handle = TableHandle::new(sender, id);

        (actor, handle)
    }

    /// Run the table actor event loop
    pub async fn run(mut self) {
        log::info!("Table {} '{}' starting", self.id, self.config.name);

        while let Some(message) = self.inbox.recv().await {
            self.handle_message(message).await;

            if self.is_closed {
                break;
            }
        }

        self.timer.disarm();
        log::info!("Table {} '{}' closed", self.id, self.config.name);
    }

    /// Handle a table message
    async fn handle_message(&mut self, message: TableMessage) {
        match message {
            TableMessage::JoinTable {
                player_id,
                name,
                chips,
                response,
            } => {
                let result = self.handle_join(player_id, &name, chips).await;
                let _ = response.send(result.into());
            }

            TableMessage::LeaveTable {
                player_id,
                response,
            } => {
                let result = self.handle_leave(player_id).await;
                let _ = response.send(result.into());
            }

            TableMessage::BettingAction {
                player_id,
                action,
                response,
            } => {
                let result = self.handle_betting_action(player_id, action).await;
                let _ = response.send(result.into());
            }

            TableMessage::ClassificationAction {
                player_id,
                kind,
                card_idx,
                response,
            } => {
                let result = self
                    .handle_classification_action(player_id, kind, card_idx)
                    .await;
                let _ = response.send(result.into());
            }

            TableMessage::SendChat {
                player_id,
                message,
                response,
            } => {
                let result = self.handle_chat(player_id, &message).await;
                let _ = response.send(result.into());
            }

            TableMessage::GetSnapshot {
                player_id,
                response,
            } => {
                let _ = response.send(TableResponse::Success(Box::new(self.snapshot(player_id))));
            }

            TableMessage::TimerTick { generation } => {
                self.handle_tick(generation).await;
            }

            TableMessage::Subscribe { player_id, sender } => {
                let snapshot = Notification::Snapshot(Box::new(self.snapshot(Some(player_id))));
                if sender.try_send(snapshot).is_ok() {
                    self.subscribers.insert(player_id, sender);
                }
                log::debug!(
                    "Player {} subscribed to table {} notifications",
                    player_id,
                    self.id
                );
            }

            TableMessage::Unsubscribe { player_id } => {
                self.subscribers.remove(&player_id);
                log::debug!(
                    "Player {} unsubscribed from table {} notifications",
                    player_id,
                    self.id
                );
            }
        }
    }

    fn snapshot(&self, viewer: Option<PlayerId>) -> TableSnapshot {
        let mut snapshot = self.session.snapshot(viewer);
        snapshot.name.clone_from(&self.config.name);
        snapshot
    }

    /// Broadcast a notification to all subscribers
    fn notify(&mut self, notification: Notification) {
        let table_id = self.id;
        deliver(&mut self.subscribers, table_id, |_| notification.clone());
    }

    /// Send every subscriber the table as they are allowed to see it
    fn broadcast_snapshots(&mut self) {
        let session = &self.session;
        let name = &self.config.name;
        deliver(&mut self.subscribers, self.id, |player_id| {
            let mut snapshot = session.snapshot(Some(player_id));
            snapshot.name.clone_from(name);
            Notification::Snapshot(Box::new(snapshot))
        });
    }

    /// Handle join table request
    async fn handle_join(
        &mut self,
        player_id: PlayerId,
        name: &str,
        chips: Chips,
    ) -> Result<TableSnapshot, GameError> {
        if self.is_closed {
            return Err(GameError::TableClosed);
        }
        let already_seated = self.session.data().player(player_id).is_some();
        let seat = self.session.seat_player(player_id, name, chips)?;
        if !already_seated {
            log::info!(
                "Player {} ({}) joined table {} in seat {} with {} chips",
                player_id,
                name,
                self.id,
                seat,
                chips
            );
            self.notify(Notification::PlayerJoined {
                player_id,
                name: name.to_string(),
            });
        }
        self.after_change().await;
        Ok(self.snapshot(Some(player_id)))
    }

    /// Handle leave table request
    async fn handle_leave(&mut self, player_id: PlayerId) -> Result<TableSnapshot, GameError> {
        let player = self.session.unseat_player(player_id)?;
        log::info!(
            "Player {} left table {} with {} chips",
            player_id,
            self.id,
            player.chips
        );

        if let Err(e) = self.accounts.sync_balance(player_id, player.chips).await {
            log::warn!(
                "Table {}: Failed to sync balance for player {}: {}",
                self.id,
                player_id,
                e
            );
        }

        self.subscribers.remove(&player_id);
        self.notify(Notification::PlayerLeft { player_id });
        self.after_change().await;

        if self.session.data().players.is_empty() {
            log::info!("Table {}: Last player left, closing", self.id);
            self.is_closed = true;
        }

        Ok(self.snapshot(Some(player_id)))
    }

    async fn handle_betting_action(
        &mut self,
        player_id: PlayerId,
        action: BettingAction,
    ) -> Result<TableSnapshot, GameError> {
        self.session.apply_betting_action(player_id, action)?;
        self.after_change().await;
        Ok(self.snapshot(Some(player_id)))
    }

    async fn handle_classification_action(
        &mut self,
        player_id: PlayerId,
        kind: DecisionKind,
        card_idx: usize,
    ) -> Result<TableSnapshot, GameError> {
        self.session
            .apply_classification_action(player_id, kind, card_idx)?;
        self.after_change().await;
        Ok(self.snapshot(Some(player_id)))
    }

    async fn handle_chat(
        &mut self,
        player_id: PlayerId,
        message: &str,
    ) -> Result<TableSnapshot, GameError> {
        let message = self.session.validate_chat(player_id, message)?;
        let name = self
            .session
            .data()
            .player(player_id)
            .map(|player| player.name.to_string())
            .unwrap_or_default();

        let sent_at = match self
            .records
            .record_chat(self.session.data().game_id, player_id, &message)
            .await
        {
            Ok(record) => record.sent_at,
            Err(e) => {
                log::warn!("Table {}: Failed to record chat: {}", self.id, e);
                chrono::Utc::now()
            }
        };

        self.notify(Notification::Chat(ChatMessage {
            player_id,
            name,
            message,
            sent_at,
        }));
        Ok(self.snapshot(Some(player_id)))
    }

    /// Count the armed countdown down by one
    async fn handle_tick(&mut self, generation: Option<u64>) {
        match self.timer.tick(generation) {
            TickOutcome::Stale => {
                log::trace!("Table {}: Ignoring stale tick", self.id);
            }
            TickOutcome::Running { phase, remaining } => {
                self.session.set_countdown(remaining);
                self.notify(Notification::TimerTick { phase, remaining });
            }
            TickOutcome::Expired { phase } => {
                self.session.set_countdown(0);
                self.notify(Notification::TimerTick {
                    phase,
                    remaining: 0,
                });
                match self.session.on_timer_expired(phase) {
                    Ok(next) => {
                        log::debug!("Table {}: {} timed out, now {}", self.id, phase, next);
                    }
                    Err(GameError::StaleTimerNoop) => {}
                    Err(e) => {
                        log::warn!("Table {}: Timeout handling failed: {}", self.id, e);
                    }
                }
                self.after_change().await;
            }
        }
    }

    /// Persist what happened, re-arm the timer and tell the subscribers
    async fn after_change(&mut self) {
        self.process_events().await;
        self.sync_timer();
        self.broadcast_snapshots();
    }

    /// Arm a countdown when the table entered a new timed phase or turn
    fn sync_timer(&mut self) {
        let key = self.session.timer_key();
        if key == self.timer.armed_key() {
            return;
        }
        match key {
            Some(key) => {
                let secs = self.config.timers.duration_for(key.phase).unwrap_or(0);
                self.timer.arm(key, secs, self.self_sender.clone());
                self.session.set_countdown(secs);
            }
            None => {
                self.timer.disarm();
                self.session.set_countdown(0);
            }
        }
    }

    /// Drain game events into the hand record store. Failures are logged
    /// and play goes on.
    async fn process_events(&mut self) {
        let events = self.session.drain_events();
        if events.is_empty() {
            return;
        }
        log::debug!("Table {} generated {} events", self.id, events.len());

        for event in events {
            log::trace!("Table {}: {}", self.id, event);
            match event {
                GameEvent::HandStarted { hand_number } => {
                    self.start_hand_record(hand_number).await;
                }
                GameEvent::CardsDealt { player_id, cards } => {
                    if let Some(hand_id) = self.current_hand
                        && let Err(e) = self
                            .records
                            .record_player_cards(hand_id, player_id, &cards)
                            .await
                    {
                        self.record_failed("cards", &e);
                    }
                }
                GameEvent::DecisionMade {
                    player_id,
                    kind,
                    card,
                } => {
                    if let Some(hand_id) = self.current_hand
                        && let Err(e) = self
                            .records
                            .record_decision(hand_id, player_id, kind, card)
                            .await
                    {
                        self.record_failed("decision", &e);
                    }
                }
                GameEvent::TurnCardDealt { player_id, card } => {
                    if let Some(hand_id) = self.current_hand
                        && let Err(e) = self
                            .records
                            .record_turn_card(hand_id, player_id, card)
                            .await
                    {
                        self.record_failed("turn card", &e);
                    }
                }
                GameEvent::BoardRevealed { community, dealer } => {
                    if let Some(hand_id) = self.current_hand
                        && let Err(e) = self
                            .records
                            .record_board(hand_id, &community, &dealer)
                            .await
                    {
                        self.record_failed("board", &e);
                    }
                }
                GameEvent::ShowdownResolved { winners, results } => {
                    if let Some(hand_id) = self.current_hand
                        && let Err(e) = self
                            .records
                            .record_showdown_result(hand_id, &results)
                            .await
                    {
                        self.record_failed("showdown", &e);
                    }
                    self.notify(Notification::Winners(winners));
                }
                GameEvent::HandEnded { balances } => {
                    self.current_hand = None;
                    for (player_id, chips) in balances {
                        if let Err(e) = self.accounts.sync_balance(player_id, chips).await {
                            log::warn!(
                                "Table {}: Failed to sync balance for player {}: {}",
                                self.id,
                                player_id,
                                e
                            );
                        }
                    }
                }
                _ => {}
            }
        }
    }

    async fn start_hand_record(&mut self, hand_number: u64) {
        let game_id = self.session.data().game_id;
        match self.records.create_hand_record(game_id, hand_number).await {
            Ok(hand_id) => {
                self.current_hand = Some(hand_id);
                self.session.set_hand_id(hand_id);
            }
            Err(e) => {
                self.current_hand = None;
                log::warn!(
                    "Table {}: Failed to create record for hand #{}: {}",
                    self.id,
                    hand_number,
                    e
                );
            }
        }
    }

    fn record_failed(&self, what: &str, err: &crate::records::RecordError) {
        log::warn!("Table {}: Failed to record {}: {}", self.id, what, err);
    }
}

fn deliver<F>(
    subscribers: &mut HashMap<PlayerId, mpsc::Sender<Notification>>,
    table_id: TableId,
    mut notification_for: F,
) where
    F: FnMut(PlayerId) -> Notification,
{
    subscribers.retain(|player_id, sender| {
        match sender.try_send(notification_for(*player_id)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!(
                    "Table {}: Subscriber {} channel full, dropping notification",
                    table_id,
                    player_id
                );
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                log::debug!(
                    "Table {}: Subscriber {} disconnected, removing",
                    table_id,
                    player_id
                );
                false
            }
        }
    });
}
