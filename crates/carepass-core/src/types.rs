//! Identifier and role newtypes shared across the workspace.

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Random identifier minted at token issuance.
///
/// Revocation tracks this identifier rather than the token string, so
/// one logout invalidates the token no matter how it is re-presented.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId(pub [u8; 16]);

impl TokenId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

// Logs show a short prefix, enough to correlate entries without
// echoing the whole identifier.
impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({})", &self.to_hex()[..8])
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex()[..8])
    }
}

/// The role a bearer token vouches for.
///
/// A patient device packages and publishes its own records; a clinician
/// device redeems codes shared with it. Neither side ever talks to the
/// other directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectRole {
    Patient,
    Clinician,
}

impl SubjectRole {
    /// Stable wire discriminant used inside signed claims.
    pub const fn as_u8(&self) -> u8 {
        match self {
            SubjectRole::Patient => 0,
            SubjectRole::Clinician => 1,
        }
    }

    /// Decode a wire discriminant.
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(SubjectRole::Patient),
            1 => Some(SubjectRole::Clinician),
            _ => None,
        }
    }

    /// Human-readable role name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SubjectRole::Patient => "patient",
            SubjectRole::Clinician => "clinician",
        }
    }
}

impl fmt::Display for SubjectRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_id_hex_is_full_width() {
        let id = TokenId::from_bytes([0x42; 16]);
        assert_eq!(id.to_hex(), "42".repeat(16));
    }

    #[test]
    fn test_token_id_generate_unique() {
        let a = TokenId::generate();
        let b = TokenId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_id_debug_is_prefixed() {
        let id = TokenId::from_bytes([0xcd; 16]);
        assert_eq!(format!("{id:?}"), "TokenId(cdcdcdcd)");
        assert_eq!(id.to_string(), "cdcdcdcd");
    }

    #[test]
    fn test_subject_role_discriminant_roundtrip() {
        for role in [SubjectRole::Patient, SubjectRole::Clinician] {
            assert_eq!(SubjectRole::from_u8(role.as_u8()), Some(role));
        }
        assert_eq!(SubjectRole::from_u8(7), None);
    }
}
