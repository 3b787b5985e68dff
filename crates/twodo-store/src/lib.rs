//! # twodo-store
//!
//! Key-addressed JSON document store used by the progression engine.
//!
//! - **Keys**: [`DocKey`] builds `users/{uid}`, `duos/{duoId}` and
//!   `duos/{duoId}/quests/{questId}`
//! - **Writes**: [`WriteOp`] batches committed all-or-nothing via
//!   [`DocumentStore::commit_batch`], including atomic increments, array
//!   unions and field preconditions (compare-and-swap)
//! - **Backends**: [`MemoryStore`] (tests, with fault injection) and
//!   [`SqliteStore`] (`rusqlite` + `r2d2`, WAL)
//! - **Subscriptions**: per-key [`DocumentChange`] broadcasts, published only
//!   after a successful commit

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod keys;
pub mod memory;
pub mod migrations;
pub mod ops;
pub mod sqlite;
pub mod subscriptions;
pub mod traits;

pub use connection::ConnectionConfig;
pub use errors::{Result, StoreError};
pub use keys::DocKey;
pub use memory::{FaultKind, MemoryStore};
pub use ops::WriteOp;
pub use sqlite::SqliteStore;
pub use subscriptions::DocumentChange;
pub use traits::DocumentStore;
