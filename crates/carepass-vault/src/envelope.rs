//! Encrypted blob envelope.
//!
//! Everything the vault persists is wrapped in an [`EncryptedBlob`]:
//! a fresh random nonce plus the ciphertext, serialized as JSON with
//! hex-encoded fields wherever it touches disk.

use serde::{Deserialize, Serialize};

use crate::crypto::{DeviceKey, EncryptionNonce};
use crate::error::{DecryptionCause, Result, VaultError};

mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(de::Error::custom)
    }
}

/// An encrypted value at rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    /// Nonce used for this encryption (unique per blob).
    #[serde(with = "hex_bytes")]
    pub nonce: Vec<u8>,

    /// The encrypted data (includes authentication tag).
    #[serde(with = "hex_bytes")]
    pub ciphertext: Vec<u8>,
}

impl EncryptedBlob {
    /// Encrypt plaintext under a fresh random nonce.
    pub fn seal(plaintext: &[u8], key: &DeviceKey) -> Result<Self> {
        let (nonce, ciphertext) = key.seal(plaintext)?;

        Ok(Self {
            nonce: nonce.as_bytes().to_vec(),
            ciphertext,
        })
    }

    /// Decrypt the blob.
    ///
    /// Fails closed: a bad nonce length or tag mismatch yields
    /// [`VaultError::Decryption`], never partial plaintext.
    pub fn open(&self, key: &DeviceKey) -> Result<Vec<u8>> {
        let nonce_arr: [u8; 12] = self
            .nonce
            .as_slice()
            .try_into()
            .map_err(|_| VaultError::decryption(DecryptionCause::NonceLength))?;
        key.open(&EncryptionNonce::from_bytes(nonce_arr), &self.ciphertext)
    }

    /// Serialize to the JSON form stored on disk.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| VaultError::Serialization(e.to_string()))
    }

    /// Parse the JSON form stored on disk.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|_| VaultError::decryption(DecryptionCause::MalformedBlob))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let key = DeviceKey::generate();
        let plaintext = b"cached record list";

        let blob = EncryptedBlob::seal(plaintext, &key).unwrap();
        assert_eq!(blob.open(&key).unwrap(), plaintext);
    }

    #[test]
    fn test_json_roundtrip() {
        let key = DeviceKey::generate();
        let blob = EncryptedBlob::seal(b"test", &key).unwrap();

        let json = blob.to_json().unwrap();
        let recovered = EncryptedBlob::from_json(&json).unwrap();
        assert_eq!(blob, recovered);

        // Fields travel as hex strings, not byte arrays.
        let text = String::from_utf8(json).unwrap();
        assert!(text.contains(&hex::encode(&blob.nonce)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = DeviceKey::generate();
        let mut blob = EncryptedBlob::seal(b"secret", &key).unwrap();
        blob.ciphertext[0] ^= 0x01;

        assert!(matches!(
            blob.open(&key),
            Err(VaultError::Decryption {
                cause: DecryptionCause::AuthenticationFailed
            })
        ));
    }

    #[test]
    fn test_truncated_nonce_fails() {
        let key = DeviceKey::generate();
        let mut blob = EncryptedBlob::seal(b"secret", &key).unwrap();
        blob.nonce.truncate(4);

        assert!(matches!(
            blob.open(&key),
            Err(VaultError::Decryption {
                cause: DecryptionCause::NonceLength
            })
        ));
    }

    #[test]
    fn test_malformed_json_fails() {
        assert!(matches!(
            EncryptedBlob::from_json(b"{not json"),
            Err(VaultError::Decryption {
                cause: DecryptionCause::MalformedBlob
            })
        ));
    }
}
