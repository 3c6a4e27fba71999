//! Pinned claims encodings.
//!
//! These vectors fix the canonical claims bytes, so any client that
//! mints or checks bearer tokens can confirm it produces identical
//! output before its tokens ever reach a relay.

use carepass_auth::{TokenClaims, TOKEN_VERSION};
use carepass_core::types::{SubjectRole, TokenId};

/// One pinned claims encoding.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Label shown in failure output.
    pub name: &'static str,
    /// Role carried in the claims.
    pub role: SubjectRole,
    /// Token identifier bytes.
    pub token_id: [u8; 16],
    /// Issue timestamp (milliseconds since epoch).
    pub issued_at: i64,
    /// Expiry timestamp (milliseconds since epoch).
    pub expires_at: i64,
    /// Expected canonical claims encoding (hex).
    pub expected_claims_hex: &'static str,
}

/// Every pinned vector.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "patient with twelve hour session",
            role: SubjectRole::Patient,
            token_id: [
                0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc,
                0xdd, 0xee, 0xff,
            ],
            issued_at: 1_700_000_000_000,  // 2023-11-14T22:13:20Z
            expires_at: 1_700_043_200_000, // issued_at + 12h
            expected_claims_hex: "a500010100025000112233445566778899aabbccddeeff031b0000018bcfe56800041b0000018bd2789600",
        },
        GoldenVector {
            name: "clinician with small timestamps",
            role: SubjectRole::Clinician,
            token_id: [0x00; 16],
            issued_at: 0,
            expires_at: 1000,
            expected_claims_hex: "a5000101010250000000000000000000000000000000000300041903e8",
        },
        GoldenVector {
            // Expiry is one past the largest four byte integer, so the two
            // timestamps take different CBOR widths.
            name: "patient at the four byte timestamp boundary",
            role: SubjectRole::Patient,
            token_id: [
                0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c,
                0x0d, 0x0e, 0x0f,
            ],
            issued_at: 4_294_967_295,
            expires_at: 4_294_967_296,
            expected_claims_hex: "a5000101000250000102030405060708090a0b0c0d0e0f031affffffff041b0000000100000000",
        },
    ]
}

/// Build the claims a golden vector describes.
pub fn claims_from_vector(vector: &GoldenVector) -> TokenClaims {
    TokenClaims {
        version: TOKEN_VERSION,
        role: vector.role,
        token_id: TokenId::from_bytes(vector.token_id),
        issued_at: vector.issued_at,
        expires_at: vector.expires_at,
    }
}

/// Encode every vector and compare against its pinned hex.
///
/// Returns `(name, matched, actual_hex)` per vector so a harness in
/// another codebase can print exactly where it diverged.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let claims = claims_from_vector(v);
            let encoded = hex::encode(claims.signing_bytes());
            let matches = encoded == v.expected_claims_hex;
            (v.name.to_string(), matches, encoded)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectors_match_expected_bytes() {
        for (name, matches, encoded) in verify_all_vectors() {
            assert!(matches, "vector '{name}' encoded to {encoded}");
        }
    }

    #[test]
    fn test_vectors_are_deterministic() {
        for vector in all_vectors() {
            let b1 = claims_from_vector(&vector).signing_bytes();
            let b2 = claims_from_vector(&vector).signing_bytes();

            assert_eq!(b1, b2, "vector '{}' re-encoded differently", vector.name);
        }
    }

    #[test]
    fn test_vectors_decode_back() {
        for vector in all_vectors() {
            let bytes = hex::decode(vector.expected_claims_hex).unwrap();
            let decoded = TokenClaims::from_signing_bytes(&bytes).unwrap();

            assert_eq!(decoded, claims_from_vector(&vector), "{}", vector.name);
        }
    }
}
