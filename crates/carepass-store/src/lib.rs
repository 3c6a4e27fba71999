//! # Carepass Store
//!
//! Storage abstraction for the Carepass relay. Provides a trait-based
//! interface for ephemeral payload persistence with SQLite and in-memory
//! implementations, plus the background sweeper that removes expired
//! entries.
//!
//! The relay talks to storage only through the [`EphemeralStore`] trait.
//! [`SqliteStore`] is the durable backend; [`MemoryStore`] serves tests
//! and single-process deployments.
//!
//! Every entry carries an absolute expiry timestamp, and reads consult
//! the injected clock before answering, so an expired bundle is never
//! observable as [`Lookup::Found`] even when the sweeper has not run yet.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use carepass_core::clock::SystemClock;
//! use carepass_store::{EphemeralStore, SqliteStore, Sweeper};
//!
//! async fn example() {
//!     let store = Arc::new(SqliteStore::open("relay.db", SystemClock::shared()).unwrap());
//!     // SqliteStore::open_memory is the throwaway equivalent.
//!
//!     let sweeper = Sweeper::spawn(Arc::clone(&store), Duration::from_secs(60));
//!     // ... serve requests ...
//!     sweeper.shutdown().await;
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Lazy expiry**: Reads report `Expired` for dead entries; the sweeper
//!   deletes them later
//! - **Atomic claim**: `take_bundle` removes the row in the same critical
//!   section that reads it, so concurrent redeemers see one winner
//! - **Grant audit trail**: Expired grants flip to `EXPIRED` and are kept;
//!   only bundle rows and revocation markers are deleted by the sweeper

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod sweep;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use sweep::Sweeper;
pub use traits::{EphemeralStore, InsertOutcome, Lookup, SweepReport};
