//! # Carepass Relay
//!
//! The unified API for Carepass - temporary, consent-gated sharing of
//! medical records between devices that never talk to each other.
//!
//! ## Overview
//!
//! The relay is the only thing both sides can reach. It provides:
//!
//! - **Record bundles**: One record published under a short `REC-` code,
//!   gone two hours later
//! - **Access grants**: A profile-plus-timeline snapshot under a `PAT-`
//!   code with a patient-chosen validity window
//! - **Bearer tokens**: Signed, revocable session tokens per device role
//! - **Sweeping**: A background task that removes whatever expired
//!
//! ## Key Concepts
//!
//! - **Share code**: Human-relayable capability, e.g. `REC-7KQ2-M4X`.
//!   Holding a live code is the entire authorization to read it.
//! - **Expiry**: Every stored entry carries an absolute deadline; reads
//!   check it before the sweeper ever runs.
//! - **Grant audit trail**: Expired grants flip to `EXPIRED` and stay,
//!   so a repeated read keeps answering "session expired" rather than
//!   "never heard of it".
//!
//! ## Usage
//!
//! ```rust,no_run
//! use carepass_relay::{Relay, RelayConfig};
//! use carepass_relay::core::clock::SystemClock;
//! use carepass_relay::core::types::SubjectRole;
//! use carepass_relay::store::SqliteStore;
//!
//! async fn example() {
//!     let clock = SystemClock::shared();
//!     let store = SqliteStore::open("relay.db", std::sync::Arc::clone(&clock)).unwrap();
//!     let relay = Relay::new(store, clock, RelayConfig::from_env());
//!
//!     let sweeper = relay.spawn_sweeper();
//!
//!     let token = relay
//!         .issue_token(SubjectRole::Patient, "patient-dev-key")
//!         .await
//!         .unwrap();
//!
//!     // let code = relay.publish_bundle(token.as_str(), payload).await.unwrap();
//!     // ... serve ...
//!     sweeper.shutdown().await;
//! }
//! ```
//!
//! ## Re-exports
//!
//! Embedders depend on this crate alone; the component crates are
//! reachable through it:
//!
//! - `carepass_relay::core` - Codes, payload schemas, clock, entities
//! - `carepass_relay::store` - Storage abstraction, SQLite, sweeper
//! - `carepass_relay::auth` - Bearer tokens and revocation
//! - `carepass_relay::vault` - Device-side envelope encryption

pub mod config;
pub mod error;
pub mod relay;
pub mod report;

// Component crates under their short names
pub use carepass_auth as auth;
pub use carepass_core as core;
pub use carepass_store as store;
pub use carepass_vault as vault;

pub use config::{RedemptionPolicy, RelayConfig};
pub use error::{RelayError, Result};
pub use relay::{HealthStatus, Relay};
pub use report::{ReceivedReport, ReportLog, REPORT_CAPACITY};

// The component types an embedder touches directly
pub use carepass_auth::{BearerToken, TokenService, VerifiedToken};
pub use carepass_core::code::{CodePrefix, ShareCode};
pub use carepass_core::payload::{
    AccessGrantPayload, MedicalRecord, PatientProfile, RecordBundlePayload, TelemetryReport,
};
pub use carepass_core::types::SubjectRole;
pub use carepass_store::{EphemeralStore, MemoryStore, SqliteStore, Sweeper};
