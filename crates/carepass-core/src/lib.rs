//! # Carepass Core
//!
//! Pure primitives for Carepass: share codes, clocks, payload schemas, and
//! the entities the relay stores.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over the data shapes the rest of the system exchanges.
//!
//! ## Key Types
//!
//! - [`ShareCode`] - Human-typeable code naming a relayed entity (`REC-7KQM-W4H`)
//! - [`Clock`] - Injected time source; every expiry decision goes through it
//! - [`RelayPayload`] - Tagged union of the payload kinds the relay persists
//! - [`RecordBundle`] / [`AccessGrant`] / [`RevokedTokenMarker`] - Stored entities
//!
//! ## Expiry
//!
//! One rule everywhere: an entity or claim is expired once
//! `now >= expires_at`, with `now` read from the injected [`Clock`].

pub mod clock;
pub mod code;
pub mod entity;
pub mod error;
pub mod payload;
pub mod types;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use code::{CodePrefix, ShareCode, CODE_ALPHABET};
pub use entity::{AccessGrant, GrantStatus, RecordBundle, RevokedTokenMarker};
pub use error::CoreError;
pub use payload::{
    AccessGrantPayload, ClinicalStatus, Condition, LabResult, LabStatus, MedicalRecord, Medication,
    PatientProfile, Prescription, RecordBundlePayload, RecordKind, RelayPayload, ReportKind,
    ReportSeverity, TelemetryReport, TimelineEntry, Vital,
};
pub use types::{SubjectRole, TokenId};
