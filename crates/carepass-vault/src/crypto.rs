//! ChaCha20-Poly1305 primitives for the device vault.
//!
//! One symmetric key per device, one fresh nonce per sealed blob. There
//! is no key agreement and no derivation chain: the key is random,
//! created on first use, and wiped with the vault.

use std::fmt;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{DecryptionCause, Result, VaultError};

/// A 96-bit nonce, unique per sealed blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptionNonce([u8; 12]);

impl EncryptionNonce {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

/// A 256-bit symmetric key held by one device.
///
/// The key never leaves the device it was generated on; wiping it makes
/// every blob it sealed permanently unreadable.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceKey([u8; 32]);

impl DeviceKey {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encrypt under a fresh random nonce, returning the nonce alongside
    /// the ciphertext so the caller can store both.
    pub fn seal(&self, plaintext: &[u8]) -> Result<(EncryptionNonce, Vec<u8>)> {
        let nonce = EncryptionNonce::generate();
        let ciphertext = self
            .cipher()
            .encrypt(&Nonce::from(nonce.0), plaintext)
            .map_err(|e| VaultError::Encryption(e.to_string()))?;
        Ok((nonce, ciphertext))
    }

    /// Decrypt and authenticate. Any tampering, truncation, or wrong key
    /// surfaces as the same opaque decryption failure.
    pub fn open(&self, nonce: &EncryptionNonce, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.cipher()
            .decrypt(&Nonce::from(nonce.0), ciphertext)
            .map_err(|_| VaultError::decryption(DecryptionCause::AuthenticationFailed))
    }

    // The key is exactly 32 bytes, so cipher construction cannot fail.
    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(&Key::from(self.0))
    }
}

// Secret material; Debug shows nothing.
impl fmt::Debug for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeviceKey(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let key = DeviceKey::generate();
        let plaintext = b"blood pressure 120/80";

        let (nonce, ciphertext) = key.seal(plaintext).unwrap();
        assert_ne!(ciphertext, plaintext);
        assert_eq!(key.open(&nonce, &ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn test_each_seal_uses_a_fresh_nonce() {
        let key = DeviceKey::generate();
        let (n1, c1) = key.seal(b"same input").unwrap();
        let (n2, c2) = key.seal(b"same input").unwrap();

        assert_ne!(n1, n2);
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_open_with_wrong_key_fails_closed() {
        let key = DeviceKey::generate();
        let other = DeviceKey::generate();
        let (nonce, ciphertext) = key.seal(b"secret").unwrap();

        assert!(matches!(
            other.open(&nonce, &ciphertext),
            Err(VaultError::Decryption {
                cause: DecryptionCause::AuthenticationFailed
            })
        ));
    }

    #[test]
    fn test_open_with_wrong_nonce_fails_closed() {
        let key = DeviceKey::generate();
        let (_, ciphertext) = key.seal(b"secret").unwrap();

        assert!(key
            .open(&EncryptionNonce::from_bytes([7; 12]), &ciphertext)
            .is_err());
    }

    #[test]
    fn test_device_key_debug_redacted() {
        let key = DeviceKey::from_bytes([0xab; 32]);
        assert_eq!(format!("{key:?}"), "DeviceKey(..)");
    }
}
