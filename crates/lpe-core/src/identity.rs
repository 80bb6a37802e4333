//! # Domain Identity Newtypes
//!
//! License and organization identifiers are UUIDs issued by the record
//! store. Rule, feature and custom-attribute identifiers are opaque strings
//! chosen by whoever authors the catalog; they are only ever compared for
//! equality and ordered for deterministic iteration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Unique identifier for a license record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseId(pub Uuid);

/// Unique identifier for the organization a license is pooled under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(pub Uuid);

impl LicenseId {
    /// Generate a new random license identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from the hyphenated UUID form.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| CoreError::InvalidIdentifier(format!("license id {s:?}: {e}")))
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LicenseId {
    fn default() -> Self {
        Self::new()
    }
}

impl OrganizationId {
    /// Generate a new random organization identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from the hyphenated UUID form.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| CoreError::InvalidIdentifier(format!("organization id {s:?}: {e}")))
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrganizationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LicenseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declares a string-backed identifier newtype.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap an identifier string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of an authored rule.
    RuleId
);

string_id!(
    /// Identifier of a product feature referenced by a license's feature set.
    FeatureId
);

string_id!(
    /// Identifier of a custom attribute definition.
    AttributeId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn license_id_parse_roundtrip() {
        let id = LicenseId::new();
        assert_eq!(LicenseId::parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn organization_id_parse() {
        let org = OrganizationId::new();
        assert_eq!(OrganizationId::parse(&format!(" {org} ")).unwrap(), org);
        assert!(OrganizationId::parse("acme").is_err());
    }

    #[test]
    fn license_id_parse_rejects_garbage() {
        assert!(LicenseId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn license_id_serializes_transparently() {
        let id = LicenseId::parse("6f1c1b1e-8d0a-4c1e-9a53-2f8a3c1d0b77").unwrap();
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            r#""6f1c1b1e-8d0a-4c1e-9a53-2f8a3c1d0b77""#
        );
    }

    #[test]
    fn string_ids_borrow_as_str() {
        let mut map = BTreeMap::new();
        map.insert(AttributeId::new("region"), 1);
        assert_eq!(map.get("region"), Some(&1));
        assert_eq!(FeatureId::from("sso").as_str(), "sso");
        assert_eq!(RuleId::new("r-1").to_string(), "r-1");
    }
}
