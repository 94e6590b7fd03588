//! Table module providing multi-table support with async actor model.
//!
//! This module implements:
//! - TableActor: Async actor owning a single table's game session
//! - TableManager: Registry assigning players to tables by balance tier
//! - TimerSupervisor: Generation-tagged phase countdowns
//! - Message-based communication with tokio channels
//!
//! ## Architecture
//!
//! Each table runs in a separate Tokio task with an mpsc message inbox.
//! Player requests, manual ticks and the table's own countdown ticks all
//! arrive through that inbox, so the actor is the single writer of its
//! session. The TableManager spawns actors on demand and drops them when
//! the last player leaves.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use three_card_tango::{
//!     accounts::InMemoryAccountStore,
//!     records::InMemoryHandRecordStore,
//!     table::{RegistryConfig, TableManager},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TableManager::new(
//!         RegistryConfig::default(),
//!         Arc::new(InMemoryAccountStore::new()),
//!         Arc::new(InMemoryHandRecordStore::new()),
//!     )?;
//!
//!     let snapshot = manager.join_table("session-token", "alice").await?;
//!     println!("{} is in {}", snapshot.name, snapshot.phase);
//!     Ok(())
//! }
//! ```

pub mod actor;
pub mod config;
pub mod manager;
pub mod messages;
pub mod timer;

pub use actor::{TableActor, TableHandle};
pub use config::{ConfigError, PhaseTimers, RegistryConfig, TableConfig, TableTier};
pub use manager::{TableManager, TableMetadata};
pub use messages::{ChatMessage, Notification, TableMessage, TableResponse};
pub use timer::{TickOutcome, TimerSupervisor};
