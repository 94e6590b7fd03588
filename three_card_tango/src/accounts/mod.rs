//! Player accounts: balances, session lookup and free chips.
//!
//! The table layer only talks to the [`AccountStore`] trait. The bundled
//! [`InMemoryAccountStore`] backs the simulator and the tests.

pub mod errors;
pub mod models;
pub mod store;

pub use errors::{AccountError, AccountResult};
pub use models::{Account, FreeChipsClaim};
pub use store::{AccountStore, InMemoryAccountStore};
