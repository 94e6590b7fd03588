//! Three Card Tango game engine - core FSM and game logic.
//!
//! This module provides the per-table game implementation including:
//! - Type-safe finite state machine with one state per phase of a hand
//! - Betting, classification (kill/kick), and showdown coordination
//! - Hand evaluation and side-pot arithmetic
//! - Event generation and per-player snapshots

// Submodules
pub mod constants;
pub mod entities;
pub mod functional;
pub mod states;

mod state_machine;
pub use state_machine::*;

mod betting;
mod classification;
mod showdown;
mod transitions;

mod session;
pub use session::{TableSession, TangoState, TimerKey};
