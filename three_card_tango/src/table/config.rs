//! Table configuration models.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::{
    constants::{MAX_PLAYERS, STARTING_CHIPS},
    entities::{Chips, Phase},
};

/// Balance brackets used to group players of similar means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableTier {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl std::fmt::Display for TableTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableTier::Beginner => write!(f, "Beginner"),
            TableTier::Intermediate => write!(f, "Intermediate"),
            TableTier::Advanced => write!(f, "Advanced"),
            TableTier::Expert => write!(f, "Expert"),
        }
    }
}

impl TableTier {
    /// Highest tier first, so the first threshold a balance reaches wins.
    const DESCENDING: [Self; 4] = [
        TableTier::Expert,
        TableTier::Advanced,
        TableTier::Intermediate,
        TableTier::Beginner,
    ];

    /// Minimum balance for the tier
    pub fn threshold(self) -> Chips {
        match self {
            TableTier::Beginner => STARTING_CHIPS,
            TableTier::Intermediate => 500,
            TableTier::Advanced => 1000,
            TableTier::Expert => 2000,
        }
    }

    /// Tier for a player holding `balance` chips
    pub fn for_balance(balance: Chips) -> Self {
        Self::DESCENDING
            .into_iter()
            .find(|tier| balance >= tier.threshold())
            .unwrap_or(TableTier::Beginner)
    }

    /// Default ante for tables of this tier
    pub fn ante(self) -> Chips {
        self.threshold() / 10
    }

    pub fn table_name(self, number: u64) -> String {
        format!("{self} Table #{number}")
    }
}

/// Countdown length for every timed phase, in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTimers {
    pub ante: u32,
    pub card_draw: u32,
    pub choose_trash: u32,
    pub choose_tango: u32,
    /// Per turn, not per round
    pub betting: u32,
    pub turn_draw: u32,
    pub board_reveal: u32,
    /// Pause between the end of a hand and the next ante
    pub next_hand: u32,
}

impl Default for PhaseTimers {
    fn default() -> Self {
        Self {
            ante: 15,
            card_draw: 3,
            choose_trash: 30,
            choose_tango: 30,
            betting: 30,
            turn_draw: 10,
            board_reveal: 10,
            next_hand: 10,
        }
    }
}

impl PhaseTimers {
    /// Load timers from `TANGO_TIMER_*` environment variables, falling back
    /// to the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ante: parse_env_or("TANGO_TIMER_ANTE", defaults.ante),
            card_draw: parse_env_or("TANGO_TIMER_CARD_DRAW", defaults.card_draw),
            choose_trash: parse_env_or("TANGO_TIMER_CHOOSE_TRASH", defaults.choose_trash),
            choose_tango: parse_env_or("TANGO_TIMER_CHOOSE_TANGO", defaults.choose_tango),
            betting: parse_env_or("TANGO_TIMER_BETTING", defaults.betting),
            turn_draw: parse_env_or("TANGO_TIMER_TURN_DRAW", defaults.turn_draw),
            board_reveal: parse_env_or("TANGO_TIMER_BOARD_REVEAL", defaults.board_reveal),
            next_hand: parse_env_or("TANGO_TIMER_NEXT_HAND", defaults.next_hand),
        }
    }

    /// Every timed phase set to `secs`
    pub fn uniform(secs: u32) -> Self {
        Self {
            ante: secs,
            card_draw: secs,
            choose_trash: secs,
            choose_tango: secs,
            betting: secs,
            turn_draw: secs,
            board_reveal: secs,
            next_hand: secs,
        }
    }

    /// Countdown for `phase`. `None` for phases that wait on players alone.
    pub fn duration_for(&self, phase: Phase) -> Option<u32> {
        let secs = match phase {
            Phase::Waiting | Phase::Showdown => return None,
            Phase::Ante => self.ante,
            Phase::CardDraw => self.card_draw,
            Phase::ChooseTrash => self.choose_trash,
            Phase::ChooseTango => self.choose_tango,
            Phase::PreKickBetting | Phase::PostTurnBetting | Phase::FinalBetting => self.betting,
            Phase::TurnDraw => self.turn_draw,
            Phase::BoardReveal => self.board_reveal,
            Phase::End => self.next_hand,
        };
        Some(secs)
    }
}

/// Settings shared by every table the registry creates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub timers: PhaseTimers,
    /// Whether tables run their own countdowns. Without it the table only
    /// moves on explicit ticks.
    pub auto_tick: bool,
    pub tick_interval_ms: u64,
    pub max_players: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            timers: PhaseTimers::default(),
            auto_tick: true,
            tick_interval_ms: 1000,
            max_players: MAX_PLAYERS,
        }
    }
}

impl RegistryConfig {
    /// Load registry settings from the environment
    ///
    /// `TANGO_DISABLE_TIMERS` turns automatic countdowns off. Manual ticks
    /// still work.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timers: PhaseTimers::from_env(),
            auto_tick: !parse_env_or("TANGO_DISABLE_TIMERS", false),
            tick_interval_ms: parse_env_or("TANGO_TICK_INTERVAL_MS", defaults.tick_interval_ms),
            max_players: parse_env_or("TANGO_MAX_PLAYERS", defaults.max_players),
        }
    }
}

/// Table configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name
    pub name: String,

    /// Balance bracket the table serves
    pub tier: TableTier,

    /// Maximum number of players (default: 5)
    pub max_players: usize,

    /// Ante collected on the first hand after the table stops waiting
    pub ante: Chips,

    /// Countdown per phase
    pub timers: PhaseTimers,

    /// Whether the table runs its own countdowns
    pub auto_tick: bool,

    /// Time between countdown ticks
    pub tick_interval: Duration,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::for_tier(TableTier::Beginner)
    }
}

impl TableConfig {
    /// Default configuration for a table of `tier`
    pub fn for_tier(tier: TableTier) -> Self {
        Self {
            name: tier.table_name(1),
            tier,
            max_players: MAX_PLAYERS,
            ante: tier.ante(),
            timers: PhaseTimers::default(),
            auto_tick: true,
            tick_interval: Duration::from_secs(1),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_players == 0 || self.max_players > MAX_PLAYERS {
            return Err(ConfigError::Invalid {
                var: "max_players".to_string(),
                reason: format!("Must be between 1 and {MAX_PLAYERS}"),
            });
        }

        if self.auto_tick && self.tick_interval.is_zero() {
            return Err(ConfigError::Invalid {
                var: "tick_interval".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
