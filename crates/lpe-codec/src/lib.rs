//! # lpe-codec — Offline Activation Codes
//!
//! Packs the minimal state a disconnected client needs (license id, key,
//! expiration date, feature set) into a single printable string and unpacks
//! it again without any network access.
//!
//! ## Format
//!
//! ```text
//! LPE1.<payload>.<check>
//!
//! payload = base64url(JCS(snapshot)), unpadded
//! check   = base64url(SHA-256(JCS(snapshot))[..8]), unpadded
//! ```
//!
//! Decoding is strict: any deviation from what [`encode()`] would produce for
//! the decoded snapshot is rejected, so `decode(encode(r))` is exactly the
//! snapshot of `r` and every other input is an error.
//!
//! The checksum detects corruption and truncation. It is not a signature:
//! anyone who knows the format can mint a code.

pub mod code;
pub mod snapshot;

pub use code::{decode, encode, ActivationCode, DecodeError, VERSION_TAG};
pub use snapshot::ActivationSnapshot;
