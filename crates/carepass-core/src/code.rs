//! Share codes: short, human-typeable identifiers for relayed entities.
//!
//! A share code has the fixed shape `PREFIX-XXXX-YYY`, e.g. `REC-7KQM-W4H`.
//! The random portion is drawn from a 32-symbol alphabet that excludes the
//! visually confusable characters I, O, 0 and 1, so a code read aloud or
//! typed from a printout survives transcription.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// The 32-symbol code alphabet. Excludes I, O, 0 and 1.
pub const CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of the first random block.
const BLOCK_LEN: usize = 4;

/// Length of the second random block.
const SUFFIX_LEN: usize = 3;

/// Semantic prefix of a share code: what kind of entity it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodePrefix {
    /// A one-way record bundle hand-off (`REC-`).
    Record,
    /// A patient access grant / session (`PAT-`).
    Grant,
    /// A telemetry report (`REP-`).
    Report,
}

impl CodePrefix {
    /// The literal prefix string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CodePrefix::Record => "REC",
            CodePrefix::Grant => "PAT",
            CodePrefix::Report => "REP",
        }
    }

    /// Parse a prefix string.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "REC" => Ok(CodePrefix::Record),
            "PAT" => Ok(CodePrefix::Grant),
            "REP" => Ok(CodePrefix::Report),
            other => Err(CoreError::UnknownPrefix(other.to_string())),
        }
    }
}

impl fmt::Display for CodePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated share code.
///
/// Construction goes through [`ShareCode::generate`] or
/// [`ShareCode::parse`]; both guarantee the fixed shape and alphabet, so a
/// held `ShareCode` is always well-formed.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShareCode(String);

impl ShareCode {
    /// Generate a fresh random code with the given prefix.
    ///
    /// Pure function of the thread-local CSPRNG. Uniqueness among live
    /// codes is the caller's concern: on the (negligible) chance of a
    /// collision with an existing key, regenerate before persisting.
    pub fn generate(prefix: CodePrefix) -> Self {
        let mut rng = rand::thread_rng();
        let mut pick = |n: usize| -> String {
            (0..n)
                .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
                .collect()
        };
        let block = pick(BLOCK_LEN);
        let suffix = pick(SUFFIX_LEN);
        Self(format!("{}-{}-{}", prefix.as_str(), block, suffix))
    }

    /// Parse and validate a code received from outside.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let mut parts = s.split('-');
        let (prefix, block, suffix) = match (parts.next(), parts.next(), parts.next(), parts.next())
        {
            (Some(p), Some(b), Some(x), None) => (p, b, x),
            _ => return Err(CoreError::MalformedCode(s.to_string())),
        };
        CodePrefix::parse(prefix)?;
        if block.len() != BLOCK_LEN || suffix.len() != SUFFIX_LEN {
            return Err(CoreError::MalformedCode(s.to_string()));
        }
        let in_alphabet = |c: char| CODE_ALPHABET.contains(&(c as u8));
        if !block.chars().all(in_alphabet) || !suffix.chars().all(in_alphabet) {
            return Err(CoreError::MalformedCode(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// The prefix of this code.
    pub fn prefix(&self) -> CodePrefix {
        CodePrefix::parse(&self.0[..3]).expect("prefix validated at construction")
    }

    /// The full code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ShareCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShareCode({})", self.0)
    }
}

impl fmt::Display for ShareCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShareCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_shape() {
        for prefix in [CodePrefix::Record, CodePrefix::Grant, CodePrefix::Report] {
            let code = ShareCode::generate(prefix);
            let s = code.as_str();
            assert_eq!(s.len(), 3 + 1 + 4 + 1 + 3);
            assert!(s.starts_with(prefix.as_str()));
            assert_eq!(code.prefix(), prefix);
        }
    }

    #[test]
    fn test_generate_avoids_confusable_characters() {
        for _ in 0..200 {
            let code = ShareCode::generate(CodePrefix::Record);
            let body = &code.as_str()[4..];
            for c in body.chars().filter(|c| *c != '-') {
                assert!(
                    !matches!(c, 'I' | 'O' | '0' | '1'),
                    "confusable character {c} in {code}"
                );
            }
        }
    }

    #[test]
    fn test_parse_roundtrip() {
        let code = ShareCode::generate(CodePrefix::Grant);
        let parsed = ShareCode::parse(code.as_str()).unwrap();
        assert_eq!(code, parsed);
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        for s in [
            "",
            "REC",
            "REC-ABCD",
            "REC-ABCD-EFG-H",
            "XYZ-ABCD-EFG",
            "REC-AB1D-EFG",
            "REC-ABCD-EF0",
            "rec-abcd-efg",
            "REC-ABCDE-FG",
        ] {
            assert!(ShareCode::parse(s).is_err(), "accepted {s:?}");
        }
    }

    #[test]
    fn test_collisions_are_rare() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            seen.insert(ShareCode::generate(CodePrefix::Record));
        }
        // 7 random symbols over 32 characters: 2^35 combinations. A few
        // collisions in 10k draws would indicate a broken RNG.
        assert!(seen.len() > 9_990);
    }
}
