//! Hand record store trait and the in-memory implementation.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{
    errors::{RecordError, RecordResult},
    models::{ChatRecord, GameRecord, HandPlayerRecord, HandRecord},
};
use crate::game::entities::{
    Card, DecisionKind, GameId, HandId, HandResult, PlayerId, TableId,
};

/// Trait for hand history operations
#[async_trait]
pub trait HandRecordStore: Send + Sync {
    /// Create the game record backing a new table
    async fn create_game(&self, table_id: TableId, name: &str) -> RecordResult<GameId>;

    /// Create a record for a new hand
    async fn create_hand_record(&self, game_id: GameId, hand_number: u64) -> RecordResult<HandId>;

    /// Store a player's hole cards
    async fn record_player_cards(
        &self,
        hand_id: HandId,
        player_id: PlayerId,
        cards: &[Card],
    ) -> RecordResult<()>;

    /// Store the card a player killed or kicked
    async fn record_decision(
        &self,
        hand_id: HandId,
        player_id: PlayerId,
        kind: DecisionKind,
        card: Card,
    ) -> RecordResult<()>;

    async fn record_turn_card(
        &self,
        hand_id: HandId,
        player_id: PlayerId,
        card: Card,
    ) -> RecordResult<()>;

    /// Store the community cards and the part the dealer supplied
    async fn record_board(
        &self,
        hand_id: HandId,
        community: &[Card],
        dealer: &[Card],
    ) -> RecordResult<()>;

    /// Store how every player finished the hand
    async fn record_showdown_result(
        &self,
        hand_id: HandId,
        results: &[HandResult],
    ) -> RecordResult<()>;

    async fn record_chat(
        &self,
        game_id: GameId,
        player_id: PlayerId,
        message: &str,
    ) -> RecordResult<ChatRecord>;
}

#[derive(Debug, Default)]
struct Records {
    games: HashMap<GameId, GameRecord>,
    hands: HashMap<HandId, HandRecord>,
    chat: Vec<ChatRecord>,
    next_game_id: GameId,
    next_hand_id: HandId,
}

impl Records {
    fn hand_mut(&mut self, hand_id: HandId) -> RecordResult<&mut HandRecord> {
        self.hands
            .get_mut(&hand_id)
            .ok_or(RecordError::HandNotFound(hand_id))
    }
}

fn player_entry(hand: &mut HandRecord, player_id: PlayerId) -> &mut HandPlayerRecord {
    let idx = match hand.players.iter().position(|p| p.player_id == player_id) {
        Some(idx) => idx,
        None => {
            hand.players.push(HandPlayerRecord {
                player_id,
                ..HandPlayerRecord::default()
            });
            hand.players.len() - 1
        }
    };
    &mut hand.players[idx]
}

/// Hand history kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryHandRecordStore {
    records: RwLock<Records>,
}

impl InMemoryHandRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn game(&self, game_id: GameId) -> Option<GameRecord> {
        self.records.read().await.games.get(&game_id).cloned()
    }

    pub async fn hand(&self, hand_id: HandId) -> Option<HandRecord> {
        self.records.read().await.hands.get(&hand_id).cloned()
    }

    /// Hands of a game in the order they were played
    pub async fn hands_for_game(&self, game_id: GameId) -> Vec<HandRecord> {
        let records = self.records.read().await;
        let mut hands: Vec<HandRecord> = records
            .hands
            .values()
            .filter(|hand| hand.game_id == game_id)
            .cloned()
            .collect();
        hands.sort_by_key(|hand| hand.hand_number);
        hands
    }

    pub async fn chat_log(&self, game_id: GameId) -> Vec<ChatRecord> {
        self.records
            .read()
            .await
            .chat
            .iter()
            .filter(|chat| chat.game_id == game_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HandRecordStore for InMemoryHandRecordStore {
    async fn create_game(&self, table_id: TableId, name: &str) -> RecordResult<GameId> {
        let mut records = self.records.write().await;
        records.next_game_id += 1;
        let id = records.next_game_id;
        records.games.insert(
            id,
            GameRecord {
                id,
                table_id,
                name: name.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn create_hand_record(&self, game_id: GameId, hand_number: u64) -> RecordResult<HandId> {
        let mut records = self.records.write().await;
        if !records.games.contains_key(&game_id) {
            return Err(RecordError::GameNotFound(game_id));
        }
        records.next_hand_id += 1;
        let id = records.next_hand_id;
        records.hands.insert(
            id,
            HandRecord {
                id,
                game_id,
                hand_number,
                players: Vec::new(),
                community_cards: Vec::new(),
                dealer_cards: Vec::new(),
                started_at: Utc::now(),
                completed_at: None,
            },
        );
        Ok(id)
    }

    async fn record_player_cards(
        &self,
        hand_id: HandId,
        player_id: PlayerId,
        cards: &[Card],
    ) -> RecordResult<()> {
        let mut records = self.records.write().await;
        let hand = records.hand_mut(hand_id)?;
        player_entry(hand, player_id).cards = cards.to_vec();
        Ok(())
    }

    async fn record_decision(
        &self,
        hand_id: HandId,
        player_id: PlayerId,
        kind: DecisionKind,
        card: Card,
    ) -> RecordResult<()> {
        let mut records = self.records.write().await;
        let hand = records.hand_mut(hand_id)?;
        let entry = player_entry(hand, player_id);
        match kind {
            DecisionKind::Kill => entry.kill_card = Some(card),
            DecisionKind::Kick => entry.kick_card = Some(card),
        }
        Ok(())
    }

    async fn record_turn_card(
        &self,
        hand_id: HandId,
        player_id: PlayerId,
        card: Card,
    ) -> RecordResult<()> {
        let mut records = self.records.write().await;
        let hand = records.hand_mut(hand_id)?;
        player_entry(hand, player_id).turn_card = Some(card);
        Ok(())
    }

    async fn record_board(
        &self,
        hand_id: HandId,
        community: &[Card],
        dealer: &[Card],
    ) -> RecordResult<()> {
        let mut records = self.records.write().await;
        let hand = records.hand_mut(hand_id)?;
        hand.community_cards = community.to_vec();
        hand.dealer_cards = dealer.to_vec();
        Ok(())
    }

    async fn record_showdown_result(
        &self,
        hand_id: HandId,
        results: &[HandResult],
    ) -> RecordResult<()> {
        let mut records = self.records.write().await;
        let hand = records.hand_mut(hand_id)?;
        for result in results {
            let entry = player_entry(hand, result.player_id);
            entry.final_hand = result.final_hand.clone();
            entry.strength = result.strength;
            entry.bet_amount = result.bet_amount;
            entry.amount_won = result.amount_won;
            entry.is_winner = result.is_winner();
            entry.folded = result.folded;
        }
        hand.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn record_chat(
        &self,
        game_id: GameId,
        player_id: PlayerId,
        message: &str,
    ) -> RecordResult<ChatRecord> {
        let mut records = self.records.write().await;
        if !records.games.contains_key(&game_id) {
            return Err(RecordError::GameNotFound(game_id));
        }
        let chat = ChatRecord {
            game_id,
            player_id,
            message: message.to_string(),
            sent_at: Utc::now(),
        };
        records.chat.push(chat.clone());
        Ok(chat)
    }
}
