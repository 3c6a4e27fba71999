//! # Carepass Vault
//!
//! Device-side envelope encryption for cached medical records.
//!
//! ## Overview
//!
//! Each device holds one random 256-bit key that never leaves it. The
//! record list and patient profile a device caches between sessions are
//! sealed with ChaCha20-Poly1305 under a fresh nonce per write and land
//! on disk as JSON envelopes. Losing or wiping the key makes every blob
//! unreadable, which is the point: logout is key destruction.
//!
//! ## Key Concepts
//!
//! - **DeviceKey**: The per-device symmetric key, persisted as `device.key`
//! - **EncryptedBlob**: Nonce plus ciphertext, the only at-rest form
//! - **Quarantine**: Cache entries that fail decryption are set aside
//!   with a diagnostic note, never silently dropped or half-returned
//!
//! ## Usage
//!
//! ```rust,no_run
//! use carepass_vault::Vault;
//!
//! fn example() -> carepass_vault::Result<()> {
//!     let vault = Vault::open("/var/lib/carepass/device")?;
//!
//!     // let records: Vec<MedicalRecord> = ...;
//!     // vault.store_records(&records)?;
//!     // let cached = vault.load_records()?;
//!
//!     // Logout: destroy the key and every cached blob.
//!     vault.wipe()?;
//!     Ok(())
//! }
//! ```

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod vault;

pub use crypto::{DeviceKey, EncryptionNonce};
pub use envelope::EncryptedBlob;
pub use error::{DecryptionCause, Result, VaultError};
pub use vault::{QuarantinedEntry, Vault};
