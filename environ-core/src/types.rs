//! Domain types for environ.

use std::fmt;
use std::str::FromStr;

use base64::prelude::{Engine as _, BASE64_URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed name for an environment declared in `environ.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnvironName(pub String);

impl fmt::Display for EnvironName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for EnvironName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EnvironName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// Length of an encoded fingerprint: 32 bytes in unpadded base64url.
pub const FINGERPRINT_LEN: usize = 43;

/// Content fingerprint of an archive: unpadded base64url SHA-256 of its bytes.
///
/// Doubles as the archive's storage key and as the version id written to
/// ref files.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(BASE64_URL_SAFE_NO_PAD.encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Rejected fingerprint text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid fingerprint '{0}': expected 43 base64url characters encoding 32 bytes")]
pub struct InvalidFingerprint(pub String);

impl FromStr for Fingerprint {
    type Err = InvalidFingerprint;

    /// Parses a fingerprint, trimming surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() != FINGERPRINT_LEN {
            return Err(InvalidFingerprint(trimmed.to_string()));
        }
        match BASE64_URL_SAFE_NO_PAD.decode(trimmed) {
            Ok(raw) if raw.len() == 32 => Ok(Self(trimmed.to_string())),
            _ => Err(InvalidFingerprint(trimmed.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(EnvironName::from("prod").to_string(), "prod");
    }

    #[test]
    fn fingerprint_is_43_url_safe_chars() {
        let fp = Fingerprint::of(b"hello");
        assert_eq!(fp.as_str().len(), FINGERPRINT_LEN);
        assert!(fp
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn fingerprint_of_empty_input_is_known_value() {
        // SHA-256("") = e3b0c442...b855
        assert_eq!(
            Fingerprint::of(b"").as_str(),
            "47DEQpj8HBSa-_TImW-5JCeuQeRkm5NMpJWZG3hSuFU"
        );
    }

    #[test]
    fn parse_accepts_own_output_with_whitespace() {
        let fp = Fingerprint::of(b"archive bytes");
        let parsed: Fingerprint = format!("  {fp}\n").parse().expect("parse");
        assert_eq!(parsed, fp);
    }

    #[test]
    fn parse_rejects_wrong_length_and_alphabet() {
        assert!("abc".parse::<Fingerprint>().is_err());
        let padded = format!("{}=", Fingerprint::of(b"x"));
        assert!(padded.parse::<Fingerprint>().is_err());
        let std_alphabet = "+".repeat(FINGERPRINT_LEN);
        assert!(std_alphabet.parse::<Fingerprint>().is_err());
    }
}
