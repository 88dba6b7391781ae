//! SHA-512 digest newtype for NuGet package integrity.
//!
//! NuGet records package hashes as base64 in two places: the
//! `.nupkg.sha512` sidecar written into a restored package cache, and the
//! `packageHash` field of a registry catalog entry. Flatpak source
//! manifests expect the same 512-bit value as 128 lowercase hexadecimal
//! characters. This module converts between the two and validates both.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Length in bytes of a SHA-512 digest.
pub const DIGEST_LEN: usize = 64;

/// Expected length of a hex-encoded SHA-512 digest.
const DIGEST_HEX_LEN: usize = DIGEST_LEN * 2;

/// Errors arising from malformed digest input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigestError {
    /// The input is not valid standard base64.
    #[error("invalid base64 digest: {reason}")]
    InvalidBase64 {
        /// Decoder error message.
        reason: String,
    },

    /// The decoded digest is not 64 bytes long.
    #[error("expected a {DIGEST_LEN}-byte SHA-512 digest, got {actual} bytes")]
    InvalidLength {
        /// Number of bytes actually decoded.
        actual: usize,
    },

    /// A hex digest string is malformed.
    #[error("invalid SHA-512 hex digest: {reason}")]
    InvalidHex {
        /// Description of the validation failure.
        reason: String,
    },
}

/// A validated, lowercase hex-encoded SHA-512 digest.
///
/// # Examples
///
/// ```
/// use nuget_sources_generator::digest::Sha512Digest;
///
/// let encoded = "A".repeat(86) + "==";
/// let digest = Sha512Digest::from_base64(&encoded).expect("64-byte digest");
/// assert_eq!(digest.as_str().len(), 128);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha512Digest(String);

impl Sha512Digest {
    /// Decode a base64-encoded digest as found in `.nupkg.sha512` sidecars
    /// and registry catalog entries.
    ///
    /// Surrounding whitespace is ignored, so a trailing newline in a
    /// sidecar file is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::InvalidBase64`] when the input is not valid
    /// base64 and [`DigestError::InvalidLength`] when it does not decode to
    /// exactly 64 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, DigestError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| DigestError::InvalidBase64 {
                reason: e.to_string(),
            })?;
        Self::from_bytes(&bytes)
    }

    /// Build a digest from raw hash bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::InvalidLength`] unless `bytes` is exactly 64
    /// bytes long.
    ///
    /// # Examples
    ///
    /// ```
    /// use nuget_sources_generator::digest::Sha512Digest;
    ///
    /// let digest = Sha512Digest::from_bytes(&[0xab; 64]).expect("64 bytes");
    /// assert!(digest.as_str().starts_with("abab"));
    /// assert!(Sha512Digest::from_bytes(&[0xab; 10]).is_err());
    /// ```
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DigestError> {
        if bytes.len() != DIGEST_LEN {
            return Err(DigestError::InvalidLength {
                actual: bytes.len(),
            });
        }
        Ok(Self(hex::encode(bytes)))
    }

    /// Return the digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<&str> for Sha512Digest {
    type Error = DigestError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        validate_sha512_hex(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for Sha512Digest {
    type Error = DigestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_sha512_hex(&value)?;
        Ok(Self(value))
    }
}

impl From<Sha512Digest> for String {
    fn from(value: Sha512Digest) -> Self {
        value.0
    }
}

impl AsRef<str> for Sha512Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha512Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate that `value` is a well-formed lowercase hex SHA-512 digest.
fn validate_sha512_hex(value: &str) -> Result<(), DigestError> {
    if value.len() != DIGEST_HEX_LEN {
        return Err(DigestError::InvalidHex {
            reason: format!(
                "expected {DIGEST_HEX_LEN} hex characters, got {}",
                value.len()
            ),
        });
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !c.is_ascii_digit() && !matches!(c, 'a'..='f'))
    {
        return Err(DigestError::InvalidHex {
            reason: format!("unexpected character '{bad}'"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn sample_bytes() -> Vec<u8> {
        (0..64u8).collect()
    }

    #[test]
    fn decodes_base64_to_lowercase_hex() {
        let encoded = STANDARD.encode(sample_bytes());
        let digest = Sha512Digest::from_base64(&encoded).expect("valid digest");
        assert_eq!(digest.as_str().len(), 128);
        assert!(digest.as_str().starts_with("000102030405"));
        assert!(digest.as_str().ends_with("3d3e3f"));
    }

    #[test]
    fn decoding_is_the_inverse_of_encoding() {
        let bytes = sample_bytes();
        let digest = Sha512Digest::from_base64(&STANDARD.encode(&bytes)).expect("valid digest");
        let round_trip = hex::decode(digest.as_str()).expect("hex output");
        assert_eq!(round_trip, bytes);
    }

    #[test]
    fn decoding_is_deterministic() {
        let encoded = STANDARD.encode([0xfe; 64]);
        let first = Sha512Digest::from_base64(&encoded).expect("valid digest");
        let second = Sha512Digest::from_base64(&encoded).expect("valid digest");
        assert_eq!(first, second);
        assert_eq!(first.as_str(), "fe".repeat(64));
    }

    #[test]
    fn tolerates_trailing_newline() {
        let encoded = format!("{}\n", STANDARD.encode(sample_bytes()));
        assert!(Sha512Digest::from_base64(&encoded).is_ok());
    }

    #[rstest]
    #[case::ten_bytes(10)]
    #[case::sha256_sized(32)]
    #[case::one_too_many(65)]
    #[case::empty(0)]
    fn rejects_wrong_decoded_length(#[case] len: usize) {
        let encoded = STANDARD.encode(vec![0u8; len]);
        let err = Sha512Digest::from_base64(&encoded).expect_err("wrong length");
        assert_eq!(err, DigestError::InvalidLength { actual: len });
    }

    #[rstest]
    #[case::not_base64("not base64 at all!")]
    #[case::bad_padding("AAA=A")]
    fn rejects_invalid_base64(#[case] input: &str) {
        let err = Sha512Digest::from_base64(input).expect_err("invalid base64");
        assert!(matches!(err, DigestError::InvalidBase64 { .. }));
    }

    #[rstest]
    #[case::too_short("abcdef".to_owned())]
    #[case::uppercase("A".repeat(128))]
    #[case::non_hex("g".repeat(128))]
    fn hex_constructor_rejects_malformed_values(#[case] input: String) {
        assert!(Sha512Digest::try_from(input).is_err());
    }

    #[test]
    fn hex_constructor_accepts_valid_digest() {
        let hex = "0f".repeat(64);
        let digest = Sha512Digest::try_from(hex.clone()).expect("valid hex");
        assert_eq!(format!("{digest}"), hex);
    }

    proptest! {
        #[test]
        fn any_sha512_decodes_to_lowercase_hex(
            bytes in proptest::collection::vec(any::<u8>(), DIGEST_LEN)
        ) {
            let digest = Sha512Digest::from_base64(&STANDARD.encode(&bytes))
                .expect("64-byte digest");
            prop_assert_eq!(digest.as_str().len(), DIGEST_HEX_LEN);
            prop_assert!(
                digest
                    .as_str()
                    .bytes()
                    .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
            );
            prop_assert_eq!(hex::decode(digest.as_str()).expect("hex output"), bytes);
        }

        #[test]
        fn any_other_length_is_rejected(
            bytes in proptest::collection::vec(any::<u8>(), 0..200)
                .prop_filter("not 64 bytes", |bytes| bytes.len() != DIGEST_LEN)
        ) {
            let err = Sha512Digest::from_base64(&STANDARD.encode(&bytes))
                .expect_err("wrong length");
            prop_assert_eq!(err, DigestError::InvalidLength { actual: bytes.len() });
        }
    }

    #[test]
    fn serialises_as_plain_string() {
        let digest = Sha512Digest::from_bytes(&[1; 64]).expect("valid digest");
        let json = serde_json::to_string(&digest).expect("serialise");
        assert_eq!(json, format!("\"{}\"", "01".repeat(64)));
    }
}
