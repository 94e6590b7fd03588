//! Account data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::entities::{Chips, PlayerId};

/// A player's account, looked up by session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: PlayerId,
    pub session_token: String,
    pub display_name: String,
    pub balance: Chips,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_free_chips_at: Option<DateTime<Utc>>,
}

/// Free chips claim model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeChipsClaim {
    pub player_id: PlayerId,
    /// Chips added by the claim
    pub amount: Chips,
    pub balance: Chips,
    pub claimed_at: DateTime<Utc>,
    pub next_claim_at: DateTime<Utc>,
}
