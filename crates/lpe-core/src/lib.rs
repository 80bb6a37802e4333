//! # lpe-core — Foundational Types for the License Policy Engine
//!
//! This crate is the leaf of the workspace DAG. It defines the data model
//! every other crate evaluates, transitions, or encodes: license records,
//! the closed set of typed attribute values, catalog definitions, UTC-only
//! timestamps, and the canonical byte pipeline used for activation codes
//! and audit digests.
//!
//! ## Key Design Principles
//!
//! 1. **Closed value type.** License attributes are an [`AttributeValue`]
//!    (text, number, boolean, date, set). Rule literals are always stored as
//!    text and coerced into the attribute's type at evaluation time, never
//!    pre-parsed.
//!
//! 2. **Newtype identifiers.** `LicenseId`, `RuleId`, `FeatureId`,
//!    `AttributeId`, `OrganizationId` cannot be confused with one another.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] is seconds-precision UTC and
//!    always renders with a `Z` suffix, so the same instant always produces
//!    the same canonical bytes.
//!
//! 4. **`CanonicalBytes` newtype.** Activation payloads and audit digests are
//!    produced only through [`CanonicalBytes::new()`] (RFC 8785 key ordering,
//!    floats rejected).
//!
//! ## Crate Policy
//!
//! - No dependencies on other `lpe-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod catalog;
pub mod digest;
pub mod error;
pub mod identity;
pub mod record;
pub mod temporal;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use catalog::{Catalog, CatalogIssue, CustomAttributeDefinition, Feature};
pub use digest::{sha256_digest, sha256_hex, ContentDigest};
pub use error::{CanonicalizationError, CoreError};
pub use identity::{AttributeId, FeatureId, LicenseId, OrganizationId, RuleId};
pub use record::{LicenseRecord, LicenseState, LicenseType};
pub use temporal::Timestamp;
pub use value::{AttributeType, AttributeValue, ValueKind};
