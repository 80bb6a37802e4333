//! Activation code encoding and strict decoding.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use lpe_core::{CanonicalBytes, CanonicalizationError, LicenseRecord};

use crate::snapshot::ActivationSnapshot;

/// Leading segment of every code produced by this version of the format.
pub const VERSION_TAG: &str = "LPE1";

/// Number of SHA-256 bytes kept as the checksum.
const CHECKSUM_LEN: usize = 8;

/// Why an activation code was rejected. No partial snapshot is ever returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Nothing but whitespace.
    #[error("activation code is empty")]
    Empty,

    /// Whitespace inside the code.
    #[error("activation code contains whitespace")]
    EmbeddedWhitespace,

    /// Not exactly `version.payload.check`.
    #[error("activation code must have 3 dot-separated segments, found {found}")]
    WrongSegmentCount {
        /// Segments present.
        found: usize,
    },

    /// Unknown format version.
    #[error("unsupported activation code version {found:?}")]
    UnsupportedVersion {
        /// Version segment as found.
        found: String,
    },

    /// A segment is not unpadded base64url.
    #[error("activation code {segment} is not valid base64url: {reason}")]
    InvalidBase64 {
        /// `payload` or `checksum`.
        segment: &'static str,
        /// Decoder message.
        reason: String,
    },

    /// The checksum does not match the payload.
    #[error("activation code checksum mismatch")]
    ChecksumMismatch,

    /// The payload is not a well-formed snapshot.
    #[error("activation code payload is invalid: {0}")]
    InvalidPayload(String),

    /// The payload parses but is not in canonical form.
    #[error("activation code payload is not canonical")]
    NonCanonical,

    /// The decoded snapshot could not be re-canonicalized.
    #[error("activation code payload cannot be canonicalized: {0}")]
    Canonicalization(String),
}

/// An encoded activation code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivationCode(String);

impl ActivationCode {
    /// The code text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the code text.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Decode this code.
    ///
    /// # Errors
    ///
    /// See [`decode()`].
    pub fn decode(&self) -> Result<ActivationSnapshot, DecodeError> {
        decode(&self.0)
    }
}

impl std::fmt::Display for ActivationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ActivationCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl ActivationSnapshot {
    /// Encode this snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError` if the snapshot cannot be
    /// canonicalized.
    pub fn encode(&self) -> Result<ActivationCode, CanonicalizationError> {
        let canonical = CanonicalBytes::new(self)?;
        let payload = URL_SAFE_NO_PAD.encode(canonical.as_bytes());
        let check = URL_SAFE_NO_PAD.encode(checksum(canonical.as_bytes()));
        Ok(ActivationCode(format!("{VERSION_TAG}.{payload}.{check}")))
    }
}

/// Encode the activation snapshot of `record`.
///
/// # Errors
///
/// Returns `CanonicalizationError` if the snapshot cannot be canonicalized.
pub fn encode(record: &LicenseRecord) -> Result<ActivationCode, CanonicalizationError> {
    ActivationSnapshot::from_record(record).encode()
}

/// Decode and validate an activation code.
///
/// Surrounding whitespace is ignored; everything else must be exactly what
/// [`encode()`] produces.
///
/// # Errors
///
/// Returns [`DecodeError`] for empty or whitespace-bearing input, a wrong
/// segment count or version, invalid base64, a checksum mismatch, a payload
/// that is not a snapshot (missing, extra, or mistyped fields), or a payload
/// that is not canonically encoded.
pub fn decode(code: &str) -> Result<ActivationSnapshot, DecodeError> {
    match decode_inner(code) {
        Ok(snapshot) => Ok(snapshot),
        Err(e) => {
            tracing::warn!(error = %e, "activation code rejected");
            Err(e)
        }
    }
}

fn decode_inner(code: &str) -> Result<ActivationSnapshot, DecodeError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(DecodeError::Empty);
    }
    if code.chars().any(char::is_whitespace) {
        return Err(DecodeError::EmbeddedWhitespace);
    }

    let parts: Vec<&str> = code.split('.').collect();
    let [version, payload_b64, check_b64] = parts.as_slice() else {
        return Err(DecodeError::WrongSegmentCount { found: parts.len() });
    };
    if *version != VERSION_TAG {
        return Err(DecodeError::UnsupportedVersion {
            found: (*version).to_string(),
        });
    }

    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|e| DecodeError::InvalidBase64 {
            segment: "payload",
            reason: e.to_string(),
        })?;
    let check = URL_SAFE_NO_PAD
        .decode(check_b64)
        .map_err(|e| DecodeError::InvalidBase64 {
            segment: "checksum",
            reason: e.to_string(),
        })?;
    if check.as_slice() != checksum(&payload).as_slice() {
        return Err(DecodeError::ChecksumMismatch);
    }

    let snapshot: ActivationSnapshot = serde_json::from_slice(&payload)
        .map_err(|e| DecodeError::InvalidPayload(e.to_string()))?;
    let canonical = CanonicalBytes::new(&snapshot)
        .map_err(|e| DecodeError::Canonicalization(e.to_string()))?;
    if canonical.as_bytes() != payload.as_slice() {
        return Err(DecodeError::NonCanonical);
    }
    Ok(snapshot)
}

fn checksum(bytes: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(bytes);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpe_core::Timestamp;

    fn record() -> LicenseRecord {
        LicenseRecord::new("ABCD-1234", "subscription")
            .with_features(["sso", "audit", "export"])
            .with_expiration(Timestamp::parse_flexible("2027-01-01").unwrap())
    }

    // Build a code around arbitrary payload bytes with a valid checksum.
    fn forge(payload: &[u8]) -> String {
        format!(
            "{VERSION_TAG}.{}.{}",
            URL_SAFE_NO_PAD.encode(payload),
            URL_SAFE_NO_PAD.encode(checksum(payload))
        )
    }

    #[test]
    fn round_trip() {
        let rec = record();
        let code = encode(&rec).unwrap();
        assert!(code.as_str().starts_with("LPE1."));
        assert_eq!(decode(code.as_str()).unwrap(), ActivationSnapshot::from_record(&rec));
        assert_eq!(code.decode().unwrap().features.len(), 3);
    }

    #[test]
    fn round_trip_without_expiration() {
        let rec = LicenseRecord::new("K-2", "perpetual");
        let snap = decode(encode(&rec).unwrap().as_str()).unwrap();
        assert_eq!(snap.expiration_date, None);
        assert!(snap.features.is_empty());
    }

    #[test]
    fn encoding_is_deterministic() {
        let a = record();
        let mut b = a.clone();
        b.features = ["export", "sso", "audit"]
            .into_iter()
            .map(lpe_core::FeatureId::new)
            .collect();
        b.current_uses = 99;
        assert_eq!(encode(&a).unwrap(), encode(&b).unwrap());
    }

    #[test]
    fn code_is_printable_without_whitespace() {
        let code = encode(&record()).unwrap();
        assert!(code
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')));
    }

    #[test]
    fn surrounding_whitespace_ignored() {
        let code = encode(&record()).unwrap();
        assert!(decode(&format!("  {code}\n")).is_ok());
    }

    #[test]
    fn structural_errors() {
        assert_eq!(decode("   "), Err(DecodeError::Empty));
        let code = encode(&record()).unwrap().into_string();
        let (head, tail) = code.split_at(10);
        assert_eq!(
            decode(&format!("{head} {tail}")),
            Err(DecodeError::EmbeddedWhitespace)
        );
        assert_eq!(
            decode("LPE1.abc"),
            Err(DecodeError::WrongSegmentCount { found: 2 })
        );
        assert_eq!(
            decode(&format!("{code}.x")),
            Err(DecodeError::WrongSegmentCount { found: 4 })
        );
        let v2 = code.replacen("LPE1", "LPE2", 1);
        assert!(matches!(decode(&v2), Err(DecodeError::UnsupportedVersion { .. })));
    }

    #[test]
    fn padded_or_standard_base64_rejected() {
        let code = encode(&record()).unwrap().into_string();
        let padded = format!("{code}=");
        assert!(matches!(decode(&padded), Err(DecodeError::InvalidBase64 { .. })));
        let mut parts: Vec<String> = code.split('.').map(String::from).collect();
        parts[1].push('+');
        assert!(matches!(
            decode(&parts.join(".")),
            Err(DecodeError::InvalidBase64 { .. })
        ));
    }

    #[test]
    fn round_trip_at_timestamp_range_edges() {
        let latest = Timestamp::from_epoch_secs(Timestamp::MAX_EPOCH_SECS).unwrap();
        let earliest = Timestamp::from_epoch_secs(Timestamp::MIN_EPOCH_SECS).unwrap();
        let saturated = latest.plus_days(400);
        for expiration in [latest, earliest, saturated] {
            let rec = record().with_expiration(expiration);
            let snap = decode(encode(&rec).unwrap().as_str()).unwrap();
            assert_eq!(snap, ActivationSnapshot::from_record(&rec));
        }
    }

    #[test]
    fn checksum_mismatch() {
        let a = encode(&record()).unwrap().into_string();
        let b = encode(&LicenseRecord::new("OTHER", "trial")).unwrap().into_string();
        let a_parts: Vec<&str> = a.split('.').collect();
        let b_parts: Vec<&str> = b.split('.').collect();
        let spliced = format!("{}.{}.{}", a_parts[0], a_parts[1], b_parts[2]);
        assert_eq!(decode(&spliced), Err(DecodeError::ChecksumMismatch));
    }

    #[test]
    fn invalid_payloads() {
        assert!(matches!(
            decode(&forge(b"not json")),
            Err(DecodeError::InvalidPayload(_))
        ));
        assert!(matches!(
            decode(&forge(br#"{"id":"6f1c1b1e-8d0a-4c1e-9a53-2f8a3c1d0b77","key":"K"}"#)),
            Err(DecodeError::InvalidPayload(_))
        ));
        assert!(matches!(
            decode(&forge(
                br#"{"expiration_date":null,"features":[],"id":"6f1c1b1e-8d0a-4c1e-9a53-2f8a3c1d0b77","key":"K","max_uses":5}"#
            )),
            Err(DecodeError::InvalidPayload(_))
        ));
    }

    #[test]
    fn non_canonical_payloads() {
        // Keys out of order.
        let unsorted = br#"{"key":"K","id":"6f1c1b1e-8d0a-4c1e-9a53-2f8a3c1d0b77","expiration_date":null,"features":[]}"#;
        assert_eq!(decode(&forge(unsorted)), Err(DecodeError::NonCanonical));
        // Features out of order.
        let features = br#"{"expiration_date":null,"features":["sso","audit"],"id":"6f1c1b1e-8d0a-4c1e-9a53-2f8a3c1d0b77","key":"K"}"#;
        assert_eq!(decode(&forge(features)), Err(DecodeError::NonCanonical));
        // Insignificant whitespace.
        let spaced = br#"{"expiration_date": null,"features":[],"id":"6f1c1b1e-8d0a-4c1e-9a53-2f8a3c1d0b77","key":"K"}"#;
        assert_eq!(decode(&forge(spaced)), Err(DecodeError::NonCanonical));
        // The canonical form itself is accepted.
        let canonical = br#"{"expiration_date":null,"features":["audit","sso"],"id":"6f1c1b1e-8d0a-4c1e-9a53-2f8a3c1d0b77","key":"K"}"#;
        assert!(decode(&forge(canonical)).is_ok());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use lpe_core::{FeatureId, Timestamp};
    use proptest::prelude::*;

    fn record_strategy() -> impl Strategy<Value = LicenseRecord> {
        (
            "[A-Z0-9-]{1,24}",
            proptest::collection::btree_set("[a-z_]{1,12}", 0..6),
            proptest::option::of(Timestamp::MIN_EPOCH_SECS..=Timestamp::MAX_EPOCH_SECS),
        )
            .prop_map(|(key, features, exp)| {
                let mut rec = LicenseRecord::new(key, "subscription");
                rec.features = features.into_iter().map(FeatureId::new).collect();
                rec.expiration_date = exp.and_then(|s| Timestamp::from_epoch_secs(s).ok());
                rec
            })
    }

    const REPLACEMENTS: &[char] = &['A', 'z', '0', '-', '_', '.', '=', '+', '/', ' '];

    proptest! {
        #[test]
        fn decode_inverts_encode(rec in record_strategy()) {
            let code = encode(&rec).unwrap();
            prop_assert_eq!(decode(code.as_str()).unwrap(), ActivationSnapshot::from_record(&rec));
        }

        #[test]
        fn truncation_always_fails(rec in record_strategy(), cut in any::<prop::sample::Index>()) {
            let code = encode(&rec).unwrap().into_string();
            let len = cut.index(code.len());
            prop_assert!(decode(&code[..len]).is_err());
        }

        #[test]
        fn single_character_corruption_always_fails(
            rec in record_strategy(),
            at in any::<prop::sample::Index>(),
            with in prop::sample::select(REPLACEMENTS),
        ) {
            let code = encode(&rec).unwrap().into_string();
            let i = at.index(code.len());
            let original = code.as_bytes()[i] as char;
            prop_assume!(original != with);
            let mut corrupted = code.clone();
            corrupted.replace_range(i..=i, &with.to_string());
            // A leading or trailing space is trimmed, which is not corruption.
            prop_assume!(!(with == ' ' && (i == 0 || i == code.len() - 1)));
            prop_assert!(decode(&corrupted).is_err());
        }
    }
}
