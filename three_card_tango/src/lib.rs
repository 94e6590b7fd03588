//! # Three Card Tango
//!
//! Server core for Three Card Tango, a stud-poker variant for two to five
//! players built on a type-safe finite state machine (FSM).
//!
//! Every player is dealt three cards, kills one and kicks one. Kicked cards
//! become the shared board, topped up from the deck to five cards. Each
//! player also gets a private turn card, and the best five of their seven
//! cards wins at showdown. Three betting rounds run between those steps.
//!
//! ## Architecture
//!
//! A hand moves through twelve phases, each its own state type:
//!
//! - **Waiting**: Fewer than two funded players
//! - **Ante**: Forced bets
//! - **CardDraw**: Three hole cards each
//! - **ChooseTrash / ChooseTango**: Kill one card, then kick one
//! - **PreKickBetting / PostTurnBetting / FinalBetting**: Betting rounds
//! - **TurnDraw**: One private card each
//! - **BoardReveal**: Kicked cards become the board
//! - **Showdown / End**: Pot distribution and the pause before the next hand
//!
//! ## Core Modules
//!
//! - [`game`]: State machine, entities, hand evaluation and pot arithmetic
//! - [`table`]: Table actors, countdowns and the table registry
//! - [`accounts`]: Player balances behind the [`AccountStore`] trait
//! - [`records`]: Hand history behind the [`HandRecordStore`] trait
//!
//! ## Example
//!
//! ```
//! use three_card_tango::{GameSettings, TableSession, entities::Phase};
//!
//! let mut session = TableSession::new(1, 1, GameSettings::default());
//! session.seat_player(1, "alice", 100).unwrap();
//! session.seat_player(2, "bob", 100).unwrap();
//! assert_eq!(session.phase(), Phase::Ante);
//! ```

/// Player accounts and free chips.
pub mod accounts;
pub use accounts::{AccountError, AccountStore, InMemoryAccountStore};

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    GameError, GameEvent, GameSettings, TableSession, TangoState,
    constants::{self, MAX_PLAYERS, MIN_PLAYERS},
    entities, functional,
};

/// Hand history persistence.
pub mod records;
pub use records::{HandRecordStore, InMemoryHandRecordStore, RecordError};

/// Table actors and the table registry.
pub mod table;
pub use table::{RegistryConfig, TableConfig, TableManager, TableTier};
