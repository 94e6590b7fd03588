//! Hand history persistence.
//!
//! Tables write here best-effort: a failed write is logged and play goes on.

pub mod errors;
pub mod models;
pub mod repository;

pub use errors::{RecordError, RecordResult};
pub use models::{ChatRecord, GameRecord, HandPlayerRecord, HandRecord};
pub use repository::{HandRecordStore, InMemoryHandRecordStore};
