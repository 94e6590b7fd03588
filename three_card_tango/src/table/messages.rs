//! Table actor message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::game::{
    GameError,
    entities::{BettingAction, Chips, DecisionKind, Phase, PlayerId, TableSnapshot, Winner},
};

/// Messages that can be sent to a TableActor
#[derive(Debug)]
pub enum TableMessage {
    /// Join table request
    JoinTable {
        player_id: PlayerId,
        name: String,
        chips: Chips,
        response: oneshot::Sender<TableResponse>,
    },

    /// Leave table request
    LeaveTable {
        player_id: PlayerId,
        response: oneshot::Sender<TableResponse>,
    },

    /// Check, bet or fold
    BettingAction {
        player_id: PlayerId,
        action: BettingAction,
        response: oneshot::Sender<TableResponse>,
    },

    /// Kill or kick a card
    ClassificationAction {
        player_id: PlayerId,
        kind: DecisionKind,
        card_idx: usize,
        response: oneshot::Sender<TableResponse>,
    },

    /// Send chat message
    SendChat {
        player_id: PlayerId,
        message: String,
        response: oneshot::Sender<TableResponse>,
    },

    /// Get the table as seen by a player (or by an observer with `None`)
    GetSnapshot {
        player_id: Option<PlayerId>,
        response: oneshot::Sender<TableResponse>,
    },

    /// Countdown tick. Ticks from the table's own timer carry the generation
    /// they were armed with; manual ticks carry none.
    TimerTick { generation: Option<u64> },

    /// Subscribe to table notifications
    Subscribe {
        player_id: PlayerId,
        sender: mpsc::Sender<Notification>,
    },

    /// Unsubscribe from table notifications
    Unsubscribe { player_id: PlayerId },
}

/// Notification pushed to subscribers when the table changes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Notification {
    /// The table as seen by the subscriber
    Snapshot(Box<TableSnapshot>),
    /// Seconds left in the current phase
    TimerTick { phase: Phase, remaining: u32 },
    /// Who won the hand that just ended
    Winners(Vec<Winner>),
    Chat(ChatMessage),
    PlayerJoined { player_id: PlayerId, name: String },
    PlayerLeft { player_id: PlayerId },
}

/// A chat line as broadcast to the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub player_id: PlayerId,
    pub name: String,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

/// Response from table operations
#[derive(Debug, Clone)]
pub enum TableResponse {
    /// Operation succeeded; carries the table as seen by the requester
    Success(Box<TableSnapshot>),

    /// Operation failed
    Error(GameError),
}

impl TableResponse {
    /// Check if response is success
    pub fn is_success(&self) -> bool {
        matches!(self, TableResponse::Success(_))
    }

    /// Get error message if response is error
    pub fn error_message(&self) -> Option<String> {
        match self {
            TableResponse::Error(err) => Some(err.to_string()),
            TableResponse::Success(_) => None,
        }
    }

    pub fn snapshot(&self) -> Option<&TableSnapshot> {
        match self {
            TableResponse::Success(snapshot) => Some(snapshot),
            TableResponse::Error(_) => None,
        }
    }

    pub fn into_result(self) -> Result<TableSnapshot, GameError> {
        match self {
            TableResponse::Success(snapshot) => Ok(*snapshot),
            TableResponse::Error(err) => Err(err),
        }
    }
}

impl From<Result<TableSnapshot, GameError>> for TableResponse {
    fn from(value: Result<TableSnapshot, GameError>) -> Self {
        match value {
            Ok(snapshot) => TableResponse::Success(Box::new(snapshot)),
            Err(err) => TableResponse::Error(err),
        }
    }
}
