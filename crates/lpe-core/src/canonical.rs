//! # Canonical Serialization
//!
//! `CanonicalBytes` is the only way the workspace produces bytes that must be
//! stable across processes: the payload inside an offline activation code and
//! the digest input of an audit entry.
//!
//! ## Invariants
//!
//! - Object keys are sorted (RFC 8785 / JCS), separators are compact.
//! - Floats are rejected. Counters and quotas are integers; anything
//!   fractional belongs in a text field.
//! - Timestamps arrive pre-normalized as `YYYY-MM-DDTHH:MM:SSZ` strings
//!   because [`crate::Timestamp`] serializes that way.
//! - Sets serialize as sorted arrays because the model uses `BTreeSet`.
//!
//! Two snapshots that are equal as values therefore always encode to the
//! same bytes, independent of the order in which features were added.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization with float rejection.
///
/// The inner buffer is private; the only constructor is
/// [`CanonicalBytes::new()`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::FloatRejected` if the value contains a
    /// non-integer number, or `SerializationFailed` if serde cannot represent
    /// the value as JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the wrapper and return the owned buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Walk a JSON tree and fail on the first number that is not an integer.
fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                return Ok(());
            }
            match n.as_f64() {
                Some(f) => Err(CanonicalizationError::FloatRejected(f)),
                None => Ok(()),
            }
        }
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        Value::Object(map) => map.values().try_for_each(reject_floats),
    }
}
