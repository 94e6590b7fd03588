//! Account error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::game::{GameError, entities::{Chips, PlayerId}};

/// Account errors
#[derive(Debug, Error)]
pub enum AccountError {
    /// Empty or unknown session token
    #[error("invalid session")]
    InvalidSession,

    /// Account not found
    #[error("account not found for player {0}")]
    AccountNotFound(PlayerId),

    /// Free chips were claimed too recently
    #[error("free chips not available until {0}")]
    FreeChipsUnavailable(DateTime<Utc>),

    /// Balance is already at or above the free chips level
    #[error("balance of {0} is too high for free chips")]
    BalanceTooHigh(Chips),

    /// Backing store failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl AccountError {
    /// Get a client-safe error message that doesn't leak player IDs
    pub fn client_message(&self) -> String {
        match self {
            AccountError::AccountNotFound(_) => "account not found".to_string(),
            AccountError::Storage(_) => "internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<AccountError> for GameError {
    fn from(value: AccountError) -> Self {
        match value {
            AccountError::InvalidSession => GameError::InvalidSession,
            other => GameError::AccountStore(other.client_message()),
        }
    }
}

/// Result type for account operations
pub type AccountResult<T> = Result<T, AccountError>;
