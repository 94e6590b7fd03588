use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::{GameError, constants};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Club,
    Diamond,
    Heart,
    Spade,
}

impl Suit {
    pub const ALL: [Self; 4] = [Self::Heart, Self::Diamond, Self::Club, Self::Spade];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Diamond => "♦",
            Self::Heart => "♥",
            Self::Spade => "♠",
        };
        write!(f, "{repr}")
    }
}

/// Placeholder for card values.
pub type Value = u8;

/// A card is a tuple of a value (two=2u8 ... ace=14u8) and a suit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Value, pub Suit);

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.0 {
            14 => "A",
            11 => "J",
            12 => "Q",
            13 => "K",
            v => &v.to_string(),
        };
        let repr = format!("{value}/{}", self.1);
        write!(f, "{repr:>4}")
    }
}

/// Poker hand categories, weakest first. The discriminant is the
/// category weight used by [`HandStrength`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandCategory {
    HighCard = 1,
    OnePair = 2,
    TwoPair = 3,
    ThreeOfAKind = 4,
    Straight = 5,
    Flush = 6,
    FullHouse = 7,
    FourOfAKind = 8,
    StraightFlush = 9,
    RoyalFlush = 10,
}

impl HandCategory {
    #[must_use]
    pub fn weight(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub fn from_weight(weight: u32) -> Option<Self> {
        let category = match weight {
            1 => Self::HighCard,
            2 => Self::OnePair,
            3 => Self::TwoPair,
            4 => Self::ThreeOfAKind,
            5 => Self::Straight,
            6 => Self::Flush,
            7 => Self::FullHouse,
            8 => Self::FourOfAKind,
            9 => Self::StraightFlush,
            10 => Self::RoyalFlush,
            _ => return None,
        };
        Some(category)
    }
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::HighCard => "hi",
            Self::OnePair => "1p",
            Self::TwoPair => "2p",
            Self::ThreeOfAKind => "3k",
            Self::Straight => "s8",
            Self::Flush => "fs",
            Self::FullHouse => "fh",
            Self::FourOfAKind => "4k",
            Self::StraightFlush => "sf",
            Self::RoyalFlush => "rf",
        };
        write!(f, "{repr}")
    }
}

/// Totally ordered hand score: `category * 1_000_000 + tiebreak`, where the
/// tiebreak packs up to five card values as base-15 digits.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct HandStrength(pub u32);

impl HandStrength {
    pub const CATEGORY_SCALE: u32 = 1_000_000;

    #[must_use]
    pub fn category(&self) -> Option<HandCategory> {
        HandCategory::from_weight(self.0 / Self::CATEGORY_SCALE)
    }
}

impl fmt::Display for HandStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.category() {
            Some(category) => write!(f, "{category} ({})", self.0),
            None => write!(f, "?? ({})", self.0),
        }
    }
}

/// A table's deck. Cards are consumed from the end of the sequence.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// All 52 cards in construction order.
    #[must_use]
    pub fn new() -> Self {
        let mut cards = Vec::with_capacity(52);
        for suit in Suit::ALL {
            for value in 2u8..=14 {
                cards.push(Card(value, suit));
            }
        }
        Self { cards }
    }

    #[must_use]
    pub fn shuffled() -> Self {
        let mut deck = Self::new();
        deck.shuffle();
        deck
    }

    /// A deck whose first deals follow `deal_order`. Cards not listed are
    /// left underneath in construction order.
    #[must_use]
    pub fn stacked(deal_order: &[Card]) -> Self {
        let mut cards: Vec<Card> = Self::new()
            .cards
            .into_iter()
            .filter(|card| !deal_order.contains(card))
            .collect();
        cards.extend(deal_order.iter().rev().copied());
        Self { cards }
    }

    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::rng());
    }

    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    /// Remove and return the last `n` cards, last card first.
    pub fn deal(&mut self, n: usize) -> Result<Vec<Card>, GameError> {
        if n > self.cards.len() {
            return Err(GameError::InsufficientCards {
                requested: n,
                remaining: self.cards.len(),
            });
        }
        let split = self.cards.len() - n;
        let mut dealt = self.cards.split_off(split);
        dealt.reverse();
        Ok(dealt)
    }

    pub fn deal_card(&mut self) -> Result<Card, GameError> {
        self.cards.pop().ok_or(GameError::InsufficientCards {
            requested: 1,
            remaining: 0,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

/// Type alias for whole chips. Every bet, stack, and pot is a whole number
/// of chips.
pub type Chips = u32;

pub type PlayerId = i64;
pub type TableId = i64;
pub type GameId = i64;
pub type HandId = i64;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Username(String);

impl Username {
    pub fn new(s: &str) -> Self {
        let mut username: String = s
            .trim()
            .chars()
            .map(|c| if c.is_ascii_whitespace() { '_' } else { c })
            .collect();
        if let Some((idx, _)) = username.char_indices().nth(constants::MAX_USER_INPUT_LENGTH) {
            username.truncate(idx);
        }
        Self(username)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<String> for Username {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

/// Type alias for seat positions at a table.
pub type SeatIndex = usize;

/// Phases of a hand, in play order.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Waiting,
    Ante,
    CardDraw,
    ChooseTrash,
    ChooseTango,
    PreKickBetting,
    TurnDraw,
    PostTurnBetting,
    BoardReveal,
    FinalBetting,
    Showdown,
    End,
}

impl Phase {
    #[must_use]
    pub fn is_betting(self) -> bool {
        matches!(
            self,
            Self::PreKickBetting | Self::PostTurnBetting | Self::FinalBetting
        )
    }

    /// Phases between the ante and the showdown, inclusive of the ante.
    #[must_use]
    pub fn is_hand_in_progress(self) -> bool {
        !matches!(self, Self::Waiting | Self::Showdown | Self::End)
    }

    /// Everyone's cards are face up once the hand is resolved.
    #[must_use]
    pub fn reveals_hands(self) -> bool {
        matches!(self, Self::Showdown | Self::End)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::Ante => "ante",
            Self::CardDraw => "card_draw",
            Self::ChooseTrash => "choose_trash",
            Self::ChooseTango => "choose_tango",
            Self::PreKickBetting => "pre_kick_betting",
            Self::TurnDraw => "turn_draw",
            Self::PostTurnBetting => "post_turn_betting",
            Self::BoardReveal => "board_reveal",
            Self::FinalBetting => "final_betting",
            Self::Showdown => "showdown",
            Self::End => "end",
        };
        write!(f, "{repr}")
    }
}

/// Classification decisions a player makes about their private cards.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    /// Discard a card for the rest of the hand.
    Kill,
    /// Put a card face up on the board for everyone.
    Kick,
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Kill => "kill",
            Self::Kick => "kick",
        };
        write!(f, "{repr}")
    }
}

/// Card indices chosen during classification, relative to the hand the
/// player held when choosing.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Decisions {
    pub kill: Option<usize>,
    pub kick: Option<usize>,
}

impl Decisions {
    #[must_use]
    pub fn get(&self, kind: DecisionKind) -> Option<usize> {
        match kind {
            DecisionKind::Kill => self.kill,
            DecisionKind::Kick => self.kick,
        }
    }

    pub fn set(&mut self, kind: DecisionKind, card_idx: usize) {
        match kind {
            DecisionKind::Kill => self.kill = Some(card_idx),
            DecisionKind::Kick => self.kick = Some(card_idx),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BettingAction {
    Check,
    /// Chips added to the pot by this action.
    Bet(Chips),
    Fold,
}

impl fmt::Display for BettingAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Check => write!(f, "check"),
            Self::Bet(amount) => write!(f, "bet ${amount}"),
            Self::Fold => write!(f, "fold"),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    // Player is in the hand and has not acted this round.
    Active,
    // Player forfeited the hand (or is sitting it out).
    Folded,
    // Player checked this round.
    Checked,
    // Player put chips in this round.
    Betted,
    // Player put in their whole stack.
    AllIn,
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Active => "active",
            Self::Folded => "folded",
            Self::Checked => "checked",
            Self::Betted => "betted",
            Self::AllIn => "all-in",
        };
        write!(f, "{repr:7}")
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: Username,
    pub chips: Chips,
    pub seat_idx: SeatIndex,
    pub status: PlayerStatus,
    /// Private cards still in hand.
    pub cards: Vec<Card>,
    pub decisions: Decisions,
    /// The kicked card once classification is over.
    pub tango_card: Option<Card>,
    pub turn_card: Option<Card>,
    /// Chips put in during the current betting round.
    pub round_contribution: Chips,
    /// Chips put in during the whole hand.
    pub hand_contribution: Chips,
    pub last_action: Option<String>,
    pub acted_this_round: bool,
    /// The best five cards found at showdown.
    pub final_hand: Vec<Card>,
    pub strength: Option<HandStrength>,
}

impl Player {
    #[must_use]
    pub fn new(id: PlayerId, name: Username, chips: Chips, seat_idx: SeatIndex) -> Self {
        Self {
            id,
            name,
            chips,
            seat_idx,
            status: PlayerStatus::Active,
            cards: Vec::with_capacity(constants::HOLE_CARDS),
            decisions: Decisions::default(),
            tango_card: None,
            turn_card: None,
            round_contribution: 0,
            hand_contribution: 0,
            last_action: None,
            acted_this_round: false,
            final_hand: Vec::new(),
            strength: None,
        }
    }

    /// Clear everything tied to the previous hand. Players without chips sit
    /// the next hand out.
    pub fn reset(&mut self) {
        self.status = if self.chips > 0 {
            PlayerStatus::Active
        } else {
            PlayerStatus::Folded
        };
        self.cards.clear();
        self.decisions = Decisions::default();
        self.tango_card = None;
        self.turn_card = None;
        self.round_contribution = 0;
        self.hand_contribution = 0;
        self.last_action = None;
        self.acted_this_round = false;
        self.final_hand.clear();
        self.strength = None;
    }

    /// Prepare for a fresh betting round.
    pub fn start_round(&mut self) {
        self.round_contribution = 0;
        self.acted_this_round = false;
        if matches!(self.status, PlayerStatus::Checked | PlayerStatus::Betted) {
            self.status = PlayerStatus::Active;
        }
    }

    /// Move `amount` chips from the stack into the pot contributions.
    /// Returns whether the player is now all-in.
    pub fn commit(&mut self, amount: Chips) -> bool {
        let amount = amount.min(self.chips);
        self.chips -= amount;
        self.round_contribution += amount;
        self.hand_contribution += amount;
        if self.chips == 0 {
            self.status = PlayerStatus::AllIn;
            true
        } else {
            self.status = PlayerStatus::Betted;
            false
        }
    }

    pub fn fold(&mut self) {
        self.status = PlayerStatus::Folded;
        self.last_action = Some("fold".to_string());
        self.acted_this_round = true;
    }

    #[must_use]
    pub fn is_folded(&self) -> bool {
        self.status == PlayerStatus::Folded
    }

    #[must_use]
    pub fn is_all_in(&self) -> bool {
        self.status == PlayerStatus::AllIn
    }

    /// Still competing for the pot.
    #[must_use]
    pub fn is_contender(&self) -> bool {
        !self.is_folded()
    }

    /// Still able to take betting actions.
    #[must_use]
    pub fn can_act(&self) -> bool {
        !self.is_folded() && !self.is_all_in()
    }

    /// Chips needed to match `current_bet` this round.
    #[must_use]
    pub fn owes(&self, current_bet: Chips) -> Chips {
        current_bet.saturating_sub(self.round_contribution)
    }

    /// Private card, turn card, and board, as evaluated at showdown.
    #[must_use]
    pub fn showdown_cards(&self, community: &[Card]) -> Vec<Card> {
        let mut cards = self.cards.clone();
        cards.extend(self.turn_card);
        cards.extend_from_slice(community);
        cards
    }
}

/// A layer of the pot that only some players can win.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SidePot {
    pub amount: Chips,
    pub eligible: Vec<PlayerId>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Winner {
    pub player_id: PlayerId,
    pub name: Username,
    pub amount: Chips,
    /// `None` when the pot was won uncontested.
    pub strength: Option<HandStrength>,
}

/// How a player finished a hand, as stored by the hand record store.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HandResult {
    pub player_id: PlayerId,
    pub final_hand: Vec<Card>,
    pub strength: Option<HandStrength>,
    pub bet_amount: Chips,
    pub amount_won: Chips,
    pub folded: bool,
}

impl HandResult {
    #[must_use]
    pub fn is_winner(&self) -> bool {
        self.amount_won > 0
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: Username,
    pub seat_idx: SeatIndex,
    pub chips: Chips,
    pub status: PlayerStatus,
    /// Empty unless the viewer owns the cards or the hand is over.
    pub cards: Vec<Card>,
    pub card_count: usize,
    /// Only visible to the owner.
    pub decisions: Option<Decisions>,
    pub tango_card: Option<Card>,
    pub turn_card: Option<Card>,
    pub round_contribution: Chips,
    pub hand_contribution: Chips,
    pub last_action: Option<String>,
    pub strength: Option<HandStrength>,
}

/// Everything a client needs to render a table.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TableSnapshot {
    pub table_id: TableId,
    pub game_id: GameId,
    /// Display name, filled in by the table that owns the session.
    pub name: String,
    pub phase: Phase,
    pub hand_number: u64,
    pub hand_id: Option<HandId>,
    pub players: Vec<PlayerView>,
    pub pot: Chips,
    pub side_pots: Vec<SidePot>,
    pub community_cards: Vec<Card>,
    pub current_player_id: Option<PlayerId>,
    pub current_bet: Chips,
    pub ante: Chips,
    pub countdown: u32,
    pub chat_enabled: bool,
    pub winners: Vec<Winner>,
}

impl TableSnapshot {
    #[must_use]
    pub fn player(&self, player_id: PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.id == player_id)
    }

    /// Chips on the table: stacks plus the pot.
    #[must_use]
    pub fn total_chips(&self) -> Chips {
        self.players.iter().map(|p| p.chips).sum::<Chips>() + self.pot
    }
}
