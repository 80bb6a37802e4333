//! The state carried by an activation code.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

use lpe_core::{AttributeValue, FeatureId, LicenseId, LicenseRecord, Timestamp};
use lpe_rules::{AttributeSource, BuiltinField};

/// What an offline client knows about its license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivationSnapshot {
    /// License identity.
    pub id: LicenseId,
    /// License key.
    pub key: String,
    /// Expiration date; always present in the encoding, `null` when none.
    #[serde(deserialize_with = "strict_optional_timestamp")]
    pub expiration_date: Option<Timestamp>,
    /// Granted features, sorted.
    pub features: BTreeSet<FeatureId>,
}

impl ActivationSnapshot {
    /// The snapshot of `record`. Nothing else (state, counters, offline key,
    /// custom attributes) is carried.
    pub fn from_record(record: &LicenseRecord) -> Self {
        Self {
            id: record.id,
            key: record.key.clone(),
            expiration_date: record.expiration_date,
            features: record.features.clone(),
        }
    }

    /// Whether the expiration date lies strictly before `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expiration_date.is_some_and(|exp| now > exp)
    }

    /// Whether `feature` is granted.
    pub fn grants(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }
}

impl From<&LicenseRecord> for ActivationSnapshot {
    fn from(record: &LicenseRecord) -> Self {
        Self::from_record(record)
    }
}

impl AttributeSource for ActivationSnapshot {
    fn builtin(&self, field: BuiltinField) -> Option<AttributeValue> {
        match field {
            BuiltinField::Id => Some(AttributeValue::text(self.id.to_string())),
            BuiltinField::Key => Some(AttributeValue::text(self.key.as_str())),
            BuiltinField::ExpirationDate => self.expiration_date.map(AttributeValue::Date),
            BuiltinField::Features => Some(AttributeValue::set(
                self.features.iter().map(|f| f.as_str().to_string()),
            )),
            _ => None,
        }
    }

    fn custom(&self, _id: &str) -> Option<&AttributeValue> {
        None
    }
}

// Required key, nullable value, `Z`-suffixed RFC 3339 only.
fn strict_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| Timestamp::parse(&s).map_err(serde::de::Error::custom))
        .transpose()
}
