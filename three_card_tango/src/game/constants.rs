//! Table and hand constants.

use super::entities::Chips;

/// Display names and chat messages are clipped to keep snapshots small.
pub const MAX_USER_INPUT_LENGTH: usize = 32;

/// Longest chat message accepted, in characters.
pub const MAX_CHAT_MESSAGE_LENGTH: usize = 280;

/// A table seats at most five players. With three private cards each,
/// a full table can always contribute a five-card board.
pub const MAX_PLAYERS: usize = 5;

/// Minimum number of seated players with chips before a hand starts.
pub const MIN_PLAYERS: usize = 2;

/// Private cards dealt to each player at the start of a hand.
pub const HOLE_CARDS: usize = 3;

/// Cards on the board at showdown.
pub const COMMUNITY_CARDS: usize = 5;

/// Cards every contender holds at showdown: one private card,
/// the turn card, and the board.
pub const SHOWDOWN_CARDS: usize = 7;

pub const DEFAULT_ANTE: Chips = 10;

/// Balance given to a brand new account.
pub const STARTING_CHIPS: Chips = 100;
