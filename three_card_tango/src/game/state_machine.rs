//! Shared table data, errors, events, and the traits every phase implements.
//!
//! Phase-specific behaviour lives next to the coordinator it belongs to:
//! betting in `betting.rs`, kill/kick decisions in `classification.rs`, and
//! pot resolution in `showdown.rs`.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt};
use thiserror::Error;

use super::constants::{DEFAULT_ANTE, MAX_PLAYERS, MIN_PLAYERS};
use super::entities::{
    BettingAction, Card, Chips, DecisionKind, Deck, GameId, HandId, HandResult, Phase, Player,
    PlayerId, PlayerStatus, PlayerView, SeatIndex, SidePot, TableId, TableSnapshot, Username,
    Winner,
};
use super::states::PhaseMarker;

/// Errors returned to the player whose request failed
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("invalid session")]
    InvalidSession,
    #[error("table is full")]
    TableFull,
    #[error("not your turn")]
    NotPlayersTurn,
    #[error("card index {index} out of range for {available} cards")]
    InvalidCardIndex { index: usize, available: usize },
    #[error("illegal bet of ${amount}")]
    InvalidBetAmount { amount: Chips },
    #[error("can't do that during {phase}")]
    WrongPhaseForAction { phase: Phase },
    #[error("deck exhausted: needed {requested}, {remaining} left")]
    InsufficientCards { requested: usize, remaining: usize },
    #[error("stale timer")]
    StaleTimerNoop,
    #[error("not seated at this table")]
    PlayerNotAtTable,
    #[error("already acted")]
    AlreadyActed,
    #[error("chat is disabled during a hand")]
    ChatDisabled,
    #[error("empty chat message")]
    EmptyChatMessage,
    #[error("table not found")]
    TableNotFound,
    #[error("table is closed")]
    TableClosed,
    #[error("account store error: {0}")]
    AccountStore(String),
}

/// Events that occur during play. The table actor drains them after every
/// mutation to persist hand records and notify subscribers.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum GameEvent {
    PlayerSeated { player_id: PlayerId, seat_idx: SeatIndex },
    PlayerLeft { player_id: PlayerId, chips: Chips },
    PhaseChanged(Phase),
    HandStarted { hand_number: u64 },
    CardsDealt { player_id: PlayerId, cards: Vec<Card> },
    DecisionMade { player_id: PlayerId, kind: DecisionKind, card: Card },
    TurnCardDealt { player_id: PlayerId, card: Card },
    BoardRevealed { community: Vec<Card>, dealer: Vec<Card> },
    PlayerActed { player_id: PlayerId, label: String },
    PotAwarded { player_id: PlayerId, amount: Chips },
    ShowdownResolved { winners: Vec<Winner>, results: Vec<HandResult> },
    HandAborted { reason: String },
    HandEnded { balances: Vec<(PlayerId, Chips)> },
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::PlayerSeated { player_id, seat_idx } => {
                format!("player {player_id} took seat {seat_idx}")
            }
            Self::PlayerLeft { player_id, chips } => {
                format!("player {player_id} left with ${chips}")
            }
            Self::PhaseChanged(phase) => format!("phase changed to {phase}"),
            Self::HandStarted { hand_number } => format!("hand #{hand_number} started"),
            Self::CardsDealt { player_id, cards } => {
                format!("dealt {} cards to player {player_id}", cards.len())
            }
            Self::DecisionMade {
                player_id, kind, ..
            } => format!("player {player_id} chose a {kind} card"),
            Self::TurnCardDealt { player_id, .. } => {
                format!("dealt a turn card to player {player_id}")
            }
            Self::BoardRevealed { community, dealer } => format!(
                "board revealed with {} cards ({} from the dealer)",
                community.len(),
                dealer.len()
            ),
            Self::PlayerActed { player_id, label } => format!("player {player_id}: {label}"),
            Self::PotAwarded { player_id, amount } => format!("player {player_id} won ${amount}"),
            Self::ShowdownResolved { winners, .. } => {
                format!("showdown resolved with {} winner(s)", winners.len())
            }
            Self::HandAborted { reason } => format!("hand aborted: {reason}"),
            Self::HandEnded { .. } => "hand ended".to_string(),
        };
        write!(f, "{repr}")
    }
}

/// Game configuration settings
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GameSettings {
    /// Forced bet collected from every player at the start of a hand.
    /// Zero skips the ante phase.
    pub ante: Chips,
    pub max_players: usize,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::new(DEFAULT_ANTE, MAX_PLAYERS)
    }
}

impl GameSettings {
    #[must_use]
    pub const fn new(ante: Chips, max_players: usize) -> Self {
        Self { ante, max_players }
    }
}

/// Mutable table data shared across all phases
#[derive(Debug)]
pub struct TableData {
    pub table_id: TableId,
    /// Game record the table's hands are filed under.
    pub game_id: GameId,
    /// Seated players in seat order, which is also turn order.
    pub players: Vec<Player>,
    /// Rebuilt and reshuffled between hands.
    pub(crate) deck: Deck,
    /// Every chip put in this hand, including chips of players who left.
    pub pot: Chips,
    /// Layers of the pot with restricted eligibility. Filled at showdown
    /// when a contender is all-in; their sum never exceeds `pot`.
    pub side_pots: Vec<SidePot>,
    pub community_cards: Vec<Card>,
    /// Board cards that came from the deck rather than from kicks.
    pub dealer_cards: Vec<Card>,
    pub current_player_idx: usize,
    /// Highest round contribution at the table.
    pub current_bet: Chips,
    /// Seconds left on the armed timer, kept for snapshots.
    pub countdown: u32,
    pub chat_enabled: bool,
    pub hand_number: u64,
    pub hand_id: Option<HandId>,
    pub winners: Vec<Winner>,
    /// Bumped whenever the player on the clock changes, so a per-turn
    /// timer can tell turns apart.
    pub(crate) action_seq: u64,
    /// Set when dealing fails mid-hand.
    pub(crate) aborted: bool,
    pub(crate) events: VecDeque<GameEvent>,
    pub(crate) settings: GameSettings,
}

impl TableData {
    #[must_use]
    pub fn new(table_id: TableId, game_id: GameId, settings: GameSettings) -> Self {
        Self {
            table_id,
            game_id,
            players: Vec::with_capacity(settings.max_players),
            deck: Deck::new(),
            pot: 0,
            side_pots: Vec::new(),
            community_cards: Vec::with_capacity(5),
            dealer_cards: Vec::new(),
            current_player_idx: 0,
            current_bet: 0,
            countdown: 0,
            chat_enabled: true,
            hand_number: 0,
            hand_id: None,
            winners: Vec::new(),
            action_seq: 0,
            aborted: false,
            events: VecDeque::new(),
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn player_idx(&self, player_id: PlayerId) -> Result<usize, GameError> {
        self.players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or(GameError::PlayerNotAtTable)
    }

    #[must_use]
    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    #[must_use]
    pub fn num_contenders(&self) -> usize {
        self.players.iter().filter(|p| p.is_contender()).count()
    }

    /// Seated players able to pay into a new hand.
    #[must_use]
    pub fn num_funded_players(&self) -> usize {
        self.players.iter().filter(|p| p.chips > 0).count()
    }

    #[must_use]
    pub fn has_enough_players(&self) -> bool {
        self.num_funded_players() >= MIN_PLAYERS
    }

    /// First player at or after `start` (wrapping) who can still act.
    #[must_use]
    pub fn next_actor_from(&self, start: usize) -> Option<usize> {
        let n = self.players.len();
        (0..n)
            .map(|offset| (start + offset) % n)
            .find(|&idx| self.players[idx].can_act())
    }

    pub(crate) fn push_event(&mut self, event: GameEvent) {
        self.events.push_back(event);
    }

    /// Clear everything left over from the previous hand.
    pub(crate) fn clear_hand(&mut self) {
        for player in &mut self.players {
            player.reset();
        }
        self.pot = 0;
        self.side_pots.clear();
        self.community_cards.clear();
        self.dealer_cards.clear();
        self.current_bet = 0;
        self.current_player_idx = 0;
        self.hand_id = None;
        self.winners.clear();
        self.aborted = false;
    }

    /// Open a new hand. Chat stays closed until it ends.
    pub(crate) fn begin_hand(&mut self) {
        self.clear_hand();
        self.hand_number += 1;
        self.chat_enabled = false;
        self.action_seq += 1;
        log::info!("Table {}: starting hand #{}", self.table_id, self.hand_number);
        self.push_event(GameEvent::HandStarted {
            hand_number: self.hand_number,
        });
    }

    /// Mark the hand as unplayable. The next step refunds it.
    pub(crate) fn abort(&mut self, err: &GameError) {
        log::warn!("Table {}: aborting hand #{}: {err}", self.table_id, self.hand_number);
        self.aborted = true;
        self.push_event(GameEvent::HandAborted {
            reason: err.to_string(),
        });
    }

    /// Replace the deck with a fresh shuffled one.
    pub(crate) fn rebuild_deck(&mut self) {
        self.deck = Deck::shuffled();
    }

    /// Seat a player in the lowest free seat. Players joining once cards are
    /// out sit the rest of the hand out.
    pub fn seat_player(
        &mut self,
        player_id: PlayerId,
        name: Username,
        chips: Chips,
        phase: Phase,
    ) -> Result<SeatIndex, GameError> {
        if let Some(player) = self.player(player_id) {
            return Ok(player.seat_idx);
        }
        if self.players.len() >= self.settings.max_players {
            return Err(GameError::TableFull);
        }
        let seat_idx = (0..self.settings.max_players)
            .find(|seat| self.players.iter().all(|p| p.seat_idx != *seat))
            .ok_or(GameError::TableFull)?;

        let mut player = Player::new(player_id, name, chips, seat_idx);
        if chips == 0 || !matches!(phase, Phase::Waiting | Phase::Ante | Phase::End) {
            player.status = PlayerStatus::Folded;
        }
        let insert_idx = self
            .players
            .iter()
            .position(|p| p.seat_idx > seat_idx)
            .unwrap_or(self.players.len());
        self.players.insert(insert_idx, player);
        if self.players.len() > 1 && insert_idx <= self.current_player_idx {
            self.current_player_idx += 1;
        }
        self.push_event(GameEvent::PlayerSeated {
            player_id,
            seat_idx,
        });
        Ok(seat_idx)
    }

    /// Remove a player. Chips they already put in stay in the pot. If they
    /// held the turn it passes to the next seat that can act.
    pub fn remove_player(&mut self, player_id: PlayerId, phase: Phase) -> Result<Player, GameError> {
        let idx = self.player_idx(player_id)?;
        let player = self.players.remove(idx);
        if self.players.is_empty() {
            self.current_player_idx = 0;
        } else if idx < self.current_player_idx {
            self.current_player_idx -= 1;
        } else if idx == self.current_player_idx {
            self.current_player_idx = idx % self.players.len();
            if phase.is_betting() {
                if let Some(next) = self.next_actor_from(self.current_player_idx) {
                    self.current_player_idx = next;
                }
                self.action_seq += 1;
            }
        }
        self.push_event(GameEvent::PlayerLeft {
            player_id,
            chips: player.chips,
        });
        Ok(player)
    }

    /// Build the view of the table for `viewer`. Private cards are only
    /// shown to their owner until the hand is resolved.
    #[must_use]
    pub fn snapshot(&self, phase: Phase, viewer: Option<PlayerId>) -> TableSnapshot {
        let board_visible = !self.community_cards.is_empty();
        let players = self
            .players
            .iter()
            .map(|p| {
                let is_owner = viewer == Some(p.id);
                let revealed = is_owner || (phase.reveals_hands() && p.is_contender());
                PlayerView {
                    id: p.id,
                    name: p.name.clone(),
                    seat_idx: p.seat_idx,
                    chips: p.chips,
                    status: p.status,
                    cards: if revealed { p.cards.clone() } else { Vec::new() },
                    card_count: p.cards.len(),
                    decisions: is_owner.then_some(p.decisions),
                    tango_card: p.tango_card.filter(|_| is_owner || board_visible),
                    turn_card: p.turn_card.filter(|_| revealed),
                    round_contribution: p.round_contribution,
                    hand_contribution: p.hand_contribution,
                    last_action: p.last_action.clone(),
                    strength: p.strength.filter(|_| phase.reveals_hands()),
                }
            })
            .collect();
        let current_player_id = if phase.is_betting() {
            self.players.get(self.current_player_idx).map(|p| p.id)
        } else {
            None
        };
        TableSnapshot {
            table_id: self.table_id,
            game_id: self.game_id,
            name: String::new(),
            phase,
            hand_number: self.hand_number,
            hand_id: self.hand_id,
            players,
            pot: self.pot,
            side_pots: self.side_pots.clone(),
            community_cards: self.community_cards.clone(),
            current_player_id,
            current_bet: self.current_bet,
            ante: self.settings.ante,
            countdown: self.countdown,
            chat_enabled: self.chat_enabled,
            winners: self.winners.clone(),
        }
    }
}

/// Trait for reading table data and draining events in any phase
#[enum_dispatch]
pub trait TableStateManagement {
    fn data(&self) -> &TableData;

    fn data_mut(&mut self) -> &mut TableData;

    fn drain_events(&mut self) -> VecDeque<GameEvent>;

    fn phase(&self) -> Phase;

    /// Get the table as seen by `viewer`
    ///
    /// # Important
    /// This function's return value should be used - ignoring it wastes computation
    #[must_use]
    fn snapshot(&self, viewer: Option<PlayerId>) -> TableSnapshot;
}

/// Trait for player actions whose legality depends on the phase
#[enum_dispatch]
pub trait PhaseActions: TableStateManagement {
    fn take_betting_action(
        &mut self,
        _player_id: PlayerId,
        _action: BettingAction,
    ) -> Result<(), GameError> {
        Err(GameError::WrongPhaseForAction {
            phase: self.phase(),
        })
    }

    fn take_classification_action(
        &mut self,
        _player_id: PlayerId,
        _kind: DecisionKind,
        _card_idx: usize,
    ) -> Result<(), GameError> {
        Err(GameError::WrongPhaseForAction {
            phase: self.phase(),
        })
    }

    /// Whether the phase's work is done and the table may move on.
    fn is_ready_for_next_phase(&self) -> bool;

    /// Stand in for players who let the phase timer run out.
    fn apply_timeout_defaults(&mut self) {}
}

/// A Three Card Tango table in phase `T`.
///
/// The phase type decides which actions are legal; moving between phases
/// consumes the game and applies the next phase's entry effects.
#[derive(Debug)]
pub struct Game<T> {
    pub data: TableData,
    pub state: T,
}

impl<T> Game<T> {
    pub(crate) fn into_state<U>(self, state: U) -> Game<U> {
        Game {
            data: self.data,
            state,
        }
    }
}

impl<T: PhaseMarker> TableStateManagement for Game<T> {
    fn data(&self) -> &TableData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut TableData {
        &mut self.data
    }

    fn drain_events(&mut self) -> VecDeque<GameEvent> {
        std::mem::take(&mut self.data.events)
    }

    fn phase(&self) -> Phase {
        T::PHASE
    }

    fn snapshot(&self, viewer: Option<PlayerId>) -> TableSnapshot {
        self.data.snapshot(T::PHASE, viewer)
    }
}
