//! Canonical CBOR encoding for bearer token claims.
//!
//! Claims are encoded as a CBOR map with integer keys, sorted, smallest
//! integer encoding, definite lengths only. The signature covers these
//! exact bytes, and verification rejects any token whose claims do not
//! re-encode to the bytes it carried.

use ciborium::value::Value;

use carepass_core::types::{SubjectRole, TokenId};

use crate::error::AuthError;

/// Current claims format version.
pub const TOKEN_VERSION: u8 = 1;

/// Claims field keys (integer keys for compact encoding).
///
/// Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const VERSION: u64 = 0;
    pub const ROLE: u64 = 1;
    pub const TOKEN_ID: u64 = 2;
    pub const ISSUED_AT: u64 = 3;
    pub const EXPIRES_AT: u64 = 4;
}

/// The signed content of a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Claims format version.
    pub version: u8,
    /// Role the bearer acts as.
    pub role: SubjectRole,
    /// Random identifier, the unit of revocation.
    pub token_id: TokenId,
    /// Issue timestamp (milliseconds since epoch).
    pub issued_at: i64,
    /// Expiry timestamp (milliseconds since epoch).
    pub expires_at: i64,
}

impl TokenClaims {
    /// Whether the claims are past their expiry at `now`.
    pub fn is_expired(&self, now_millis: i64) -> bool {
        now_millis >= self.expires_at
    }

    /// Encode the claims to the canonical bytes the signature covers.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(48);
        // Map of 5 pairs, keys written in sorted order 0-4.
        encode_uint(&mut buf, 5, 5);
        encode_uint(&mut buf, 0, keys::VERSION);
        encode_uint(&mut buf, 0, u64::from(self.version));
        encode_uint(&mut buf, 0, keys::ROLE);
        encode_uint(&mut buf, 0, u64::from(self.role.as_u8()));
        encode_uint(&mut buf, 0, keys::TOKEN_ID);
        encode_bytes(&mut buf, self.token_id.as_bytes());
        encode_uint(&mut buf, 0, keys::ISSUED_AT);
        encode_int(&mut buf, self.issued_at);
        encode_uint(&mut buf, 0, keys::EXPIRES_AT);
        encode_int(&mut buf, self.expires_at);
        buf
    }

    /// Decode claims from the bytes a token carried.
    ///
    /// Rejects anything that does not re-encode to exactly the input,
    /// so each set of claims has a single valid wire form.
    pub fn from_signing_bytes(bytes: &[u8]) -> Result<Self, AuthError> {
        let cursor = std::io::Cursor::new(bytes);
        let value: Value = ciborium::from_reader(cursor)
            .map_err(|e| AuthError::Malformed(format!("claims decode: {e}")))?;

        let claims = cbor_value_to_claims(&value)?;
        if claims.signing_bytes() != bytes {
            return Err(AuthError::Malformed("non-canonical claims encoding".into()));
        }
        Ok(claims)
    }
}

/// Convert a CBOR Value (map) back to claims.
fn cbor_value_to_claims(value: &Value) -> Result<TokenClaims, AuthError> {
    let map = match value {
        Value::Map(m) => m,
        _ => return Err(AuthError::Malformed("expected claims map".into())),
    };

    // Helper to get a value by integer key
    let get = |key: u64| -> Option<&Value> {
        map.iter()
            .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == i128::from(key)))
            .map(|(_, v)| v)
    };

    let version = match get(keys::VERSION) {
        Some(Value::Integer(i)) => i128::from(*i) as u8,
        _ => return Err(AuthError::Malformed("missing version".into())),
    };

    let role = match get(keys::ROLE) {
        Some(Value::Integer(i)) => {
            let n = i128::from(*i);
            u8::try_from(n)
                .ok()
                .and_then(SubjectRole::from_u8)
                .ok_or_else(|| AuthError::Malformed(format!("invalid role: {n}")))?
        }
        _ => return Err(AuthError::Malformed("missing role".into())),
    };

    let token_id = match get(keys::TOKEN_ID) {
        Some(Value::Bytes(b)) if b.len() == 16 => {
            let mut arr = [0u8; 16];
            arr.copy_from_slice(b);
            TokenId(arr)
        }
        _ => return Err(AuthError::Malformed("invalid token_id".into())),
    };

    let issued_at = match get(keys::ISSUED_AT) {
        Some(Value::Integer(i)) => i128::from(*i) as i64,
        _ => return Err(AuthError::Malformed("missing issued_at".into())),
    };

    let expires_at = match get(keys::EXPIRES_AT) {
        Some(Value::Integer(i)) => i128::from(*i) as i64,
        _ => return Err(AuthError::Malformed("missing expires_at".into())),
    };

    Ok(TokenClaims {
        version,
        role,
        token_id,
        issued_at,
        expires_at,
    })
}

/// Write a CBOR head (major type plus argument) in its shortest form.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    match n {
        0..=23 => buf.push(mt | n as u8),
        24..=0xff => buf.extend_from_slice(&[mt | 24, n as u8]),
        0x100..=0xffff => {
            buf.push(mt | 25);
            buf.extend_from_slice(&(n as u16).to_be_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buf.push(mt | 26);
            buf.extend_from_slice(&(n as u32).to_be_bytes());
        }
        _ => {
            buf.push(mt | 27);
            buf.extend_from_slice(&n.to_be_bytes());
        }
    }
}

/// Encode a signed integer (major types 0 and 1).
fn encode_int(buf: &mut Vec<u8>, n: i64) {
    // CBOR negatives carry -1 - n under major type 1.
    if n < 0 {
        encode_uint(buf, 1, (-1 - n) as u64);
    } else {
        encode_uint(buf, 0, n as u64);
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}
