//! # Carepass Testkit
//!
//! Shared test support for the Carepass workspace: golden vectors that pin
//! the bearer token claims encoding, proptest generators for domain values,
//! and a ready-made relay fixture driven by a manual clock.
//!
//! ## Golden Vectors
//!
//! Other client implementations encode the same claims; the vectors give
//! them bytes to compare against:
//!
//! ```rust
//! use carepass_testkit::vectors::{all_vectors, claims_from_vector};
//!
//! for vector in all_vectors() {
//!     let claims = claims_from_vector(&vector);
//!     assert_eq!(hex::encode(claims.signing_bytes()), vector.expected_claims_hex);
//! }
//! ```
//!
//! ## Generators
//!
//! Strategies for share codes, token ids, and clinical payloads:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use carepass_core::code::ShareCode;
//! use carepass_testkit::generators::share_code;
//!
//! proptest! {
//!     #[test]
//!     fn codes_reparse(code in share_code()) {
//!         prop_assert_eq!(ShareCode::parse(&code.to_string()).unwrap(), code);
//!     }
//! }
//! ```
//!
//! ## Fixtures
//!
//! A relay over a memory store with a manual clock, so tests can jump
//! straight to the interesting timestamps:
//!
//! ```rust,ignore
//! use carepass_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let token = fixture.patient_token().await?;
//! let code = fixture.publish_sample_bundle(token.as_str()).await?;
//! fixture.advance_minutes(121);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{sample_grant, sample_profile, sample_record, sample_report, TestFixture};
pub use generators::{claims_from_params, ClaimsParams};
pub use vectors::{all_vectors, claims_from_vector, verify_all_vectors, GoldenVector};
