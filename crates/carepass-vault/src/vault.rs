//! The device vault: key persistence and the encrypted cache.
//!
//! Layout under the vault root:
//!
//! ```text
//! <root>/device.key        raw 32-byte key, created on first open
//! <root>/records.blob      encrypted record list (JSON envelope)
//! <root>/profile.blob      encrypted patient profile (JSON envelope)
//! <root>/quarantine/       cache entries that failed to decrypt
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use carepass_core::payload::{MedicalRecord, PatientProfile};

use crate::crypto::DeviceKey;
use crate::envelope::EncryptedBlob;
use crate::error::{DecryptionCause, Result, VaultError};

const DEVICE_KEY_FILE: &str = "device.key";
const RECORDS_FILE: &str = "records.blob";
const PROFILE_FILE: &str = "profile.blob";
const QUARANTINE_DIR: &str = "quarantine";

/// A cache entry that failed to decrypt and was set aside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarantinedEntry {
    /// Which cache slot the entry came from ("records" or "profile").
    pub slot: String,
    /// Diagnostic note describing the failure.
    pub note: String,
    /// When the entry was quarantined (milliseconds since epoch).
    pub quarantined_at: i64,
}

/// Device-local encrypted storage rooted at one directory.
///
/// The vault owns the device key. Values pass through
/// [`encrypt_value`](Vault::encrypt_value) before touching disk and are
/// only ever returned fully decrypted or not at all.
pub struct Vault {
    root: PathBuf,
    key: DeviceKey,
    quarantined: Mutex<Vec<QuarantinedEntry>>,
}

impl Vault {
    /// Open the vault at `dir`, creating the directory and generating a
    /// device key if none exists yet.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let root = dir.into();
        fs::create_dir_all(&root)?;

        let key_path = root.join(DEVICE_KEY_FILE);
        let key = match fs::read(&key_path) {
            Ok(bytes) => {
                let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
                    VaultError::Serialization(format!(
                        "device key file is {} bytes, expected 32",
                        bytes.len()
                    ))
                })?;
                DeviceKey::from_bytes(arr)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let key = DeviceKey::generate();
                fs::write(&key_path, key.as_bytes())?;
                tracing::debug!(path = %key_path.display(), "generated new device key");
                key
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            root,
            key,
            quarantined: Mutex::new(Vec::new()),
        })
    }

    /// The directory this vault lives in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ───────────────────── Value Encryption ─────────────────────

    /// Encrypt any serializable value into a blob.
    pub fn encrypt_value<T: Serialize>(&self, value: &T) -> Result<EncryptedBlob> {
        let plaintext =
            serde_json::to_vec(value).map_err(|e| VaultError::Serialization(e.to_string()))?;
        EncryptedBlob::seal(&plaintext, &self.key)
    }

    /// Decrypt a blob back into a typed value.
    ///
    /// A plaintext that decrypts but does not decode as `T` is treated
    /// as a decryption failure; no partial or default value is returned.
    pub fn decrypt_value<T: DeserializeOwned>(&self, blob: &EncryptedBlob) -> Result<T> {
        let plaintext = blob.open(&self.key)?;
        serde_json::from_slice(&plaintext)
            .map_err(|_| VaultError::decryption(DecryptionCause::PlaintextDecode))
    }

    // ───────────────────── Cache Slots ─────────────────────

    /// Persist the record list, replacing any previous cache.
    pub fn store_records(&self, records: &[MedicalRecord]) -> Result<()> {
        self.store_slot(RECORDS_FILE, &records)
    }

    /// Load the cached record list, if any.
    pub fn load_records(&self) -> Result<Option<Vec<MedicalRecord>>> {
        self.load_slot(RECORDS_FILE, "records")
    }

    /// Persist the patient profile, replacing any previous cache.
    pub fn store_profile(&self, profile: &PatientProfile) -> Result<()> {
        self.store_slot(PROFILE_FILE, profile)
    }

    /// Load the cached patient profile, if any.
    pub fn load_profile(&self) -> Result<Option<PatientProfile>> {
        self.load_slot(PROFILE_FILE, "profile")
    }

    fn store_slot<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let blob = self.encrypt_value(value)?;
        fs::write(self.root.join(file), blob.to_json()?)?;
        Ok(())
    }

    /// Load one cache slot.
    ///
    /// A slot that fails to parse or decrypt is moved into the
    /// quarantine directory and reported as an error; the next load
    /// finds the slot empty.
    fn load_slot<T: DeserializeOwned>(&self, file: &str, slot: &str) -> Result<Option<T>> {
        let path = self.root.join(file);
        let raw = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let blob = match EncryptedBlob::from_json(&raw) {
            Ok(blob) => blob,
            Err(err) => {
                self.quarantine(slot, &path, "unreadable envelope")?;
                return Err(err);
            }
        };

        match self.decrypt_value(&blob) {
            Ok(value) => Ok(Some(value)),
            Err(err @ VaultError::Decryption { cause }) => {
                self.quarantine(slot, &path, &format!("{cause:?}"))?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    fn quarantine(&self, slot: &str, path: &Path, note: &str) -> Result<()> {
        let dir = self.root.join(QUARANTINE_DIR);
        fs::create_dir_all(&dir)?;

        let quarantined_at = now_millis();
        fs::rename(path, dir.join(format!("{slot}.{quarantined_at}")))?;
        tracing::warn!(slot, note, "cache entry quarantined");

        self.quarantined.lock().unwrap().push(QuarantinedEntry {
            slot: slot.to_string(),
            note: note.to_string(),
            quarantined_at,
        });
        Ok(())
    }

    /// Entries quarantined since this vault was opened.
    pub fn quarantined(&self) -> Vec<QuarantinedEntry> {
        self.quarantined.lock().unwrap().clone()
    }

    // ───────────────────── Wipe ─────────────────────

    /// Delete the device key and every cache file.
    ///
    /// Consumes the vault. Blobs exported elsewhere become permanently
    /// unreadable once the key is gone.
    pub fn wipe(self) -> Result<()> {
        for file in [DEVICE_KEY_FILE, RECORDS_FILE, PROFILE_FILE] {
            match fs::remove_file(self.root.join(file)) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        let quarantine = self.root.join(QUARANTINE_DIR);
        match fs::remove_dir_all(&quarantine) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::info!(root = %self.root.display(), "vault wiped");
        Ok(())
    }
}

/// Current time in milliseconds since epoch.
fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}
