//! Hand history models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::entities::{
    Card, Chips, GameId, HandId, HandStrength, PlayerId, TableId,
};

/// One game per table lifetime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    pub table_id: TableId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Everything that happened to one player during one hand
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandPlayerRecord {
    pub player_id: PlayerId,
    /// Hole cards as dealt
    pub cards: Vec<Card>,
    pub kill_card: Option<Card>,
    pub kick_card: Option<Card>,
    pub turn_card: Option<Card>,
    pub final_hand: Vec<Card>,
    pub strength: Option<HandStrength>,
    /// Total committed over the hand
    pub bet_amount: Chips,
    pub amount_won: Chips,
    pub is_winner: bool,
    pub folded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandRecord {
    pub id: HandId,
    pub game_id: GameId,
    pub hand_number: u64,
    pub players: Vec<HandPlayerRecord>,
    pub community_cards: Vec<Card>,
    /// Board cards that came from the deck rather than a player
    pub dealer_cards: Vec<Card>,
    pub started_at: DateTime<Utc>,
    /// Set once the showdown result is stored
    pub completed_at: Option<DateTime<Utc>>,
}

impl HandRecord {
    pub fn player(&self, player_id: PlayerId) -> Option<&HandPlayerRecord> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    pub fn winners(&self) -> impl Iterator<Item = &HandPlayerRecord> {
        self.players.iter().filter(|p| p.is_winner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}
