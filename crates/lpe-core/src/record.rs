//! # License Records
//!
//! The system-of-record shape of a license as the engine sees it. Records
//! are created by an external provisioning step (initial state
//! [`LicenseState::Inactive`]), have their `state` changed only through the
//! lifecycle state machine, and have their usage counters changed only
//! through [`LicenseRecord::record_use()`].
//!
//! Mutating operations take `&self` and return a new record so a failed
//! operation can never leave a half-updated value behind.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::identity::{AttributeId, FeatureId, LicenseId, OrganizationId};
use crate::temporal::Timestamp;
use crate::value::AttributeValue;

// ─── License State ───────────────────────────────────────────────────

/// The lifecycle state of a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseState {
    /// Provisioned but not in use.
    Inactive,
    /// In use.
    Active,
    /// Held by the system, typically after quota or abuse handling.
    Suspended,
    /// The expiration date has passed.
    Expired,
}

impl LicenseState {
    /// Lowercase state name, as used in rule literals.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Expired => "expired",
        }
    }

    /// Whether the license currently grants access.
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for LicenseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── License Type ────────────────────────────────────────────────────

/// The commercial type of a license.
///
/// The well-known tags get their own variants; anything else an operator
/// invents (`enterprise`, `education`, ...) is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LicenseType {
    /// Never expires by plan.
    Perpetual,
    /// Renews periodically.
    Subscription,
    /// Time-limited evaluation.
    Trial,
    /// Operator-defined tag.
    Other(String),
}

impl LicenseType {
    /// The tag as stored and compared by rules.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Perpetual => "perpetual",
            Self::Subscription => "subscription",
            Self::Trial => "trial",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for LicenseType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "perpetual" => Self::Perpetual,
            "subscription" => Self::Subscription,
            "trial" => Self::Trial,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for LicenseType {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<LicenseType> for String {
    fn from(t: LicenseType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for LicenseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── License Record ──────────────────────────────────────────────────

/// A license as loaded from the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseRecord {
    /// Opaque record identity. Fresh when a fixture omits it.
    #[serde(default)]
    pub id: LicenseId,
    /// The customer-facing license key. Unique across the store.
    pub key: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Commercial type tag.
    #[serde(rename = "type")]
    pub license_type: LicenseType,
    /// Current lifecycle state.
    #[serde(default = "initial_state")]
    pub state: LicenseState,
    /// When the license stops being valid, if ever.
    #[serde(default)]
    pub expiration_date: Option<Timestamp>,
    /// Usage ceiling; `None` means unlimited.
    #[serde(default)]
    pub max_uses: Option<u64>,
    /// Uses consumed so far.
    #[serde(default)]
    pub current_uses: u64,
    /// Domain-specific capacity quota (seats, devices, ...).
    #[serde(default)]
    pub capacity: u64,
    /// Domain-specific token quota.
    #[serde(default)]
    pub tokens: u64,
    /// Features granted by this license.
    #[serde(default)]
    pub features: BTreeSet<FeatureId>,
    /// Values for custom attributes, keyed by attribute id.
    #[serde(default)]
    pub custom_attributes: BTreeMap<AttributeId, AttributeValue>,
    /// Secret used only to look the record up for activation-code issuance.
    #[serde(default)]
    pub offline_key: Option<String>,
    /// Organization the license is pooled under.
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    /// Optimistic-concurrency version, bumped by the store on every save.
    #[serde(default)]
    pub version: u64,
}

fn initial_state() -> LicenseState {
    LicenseState::Inactive
}

impl LicenseRecord {
    /// Provision a new, inactive license.
    pub fn new(key: impl Into<String>, license_type: impl Into<LicenseType>) -> Self {
        Self {
            id: LicenseId::new(),
            key: key.into(),
            name: String::new(),
            license_type: license_type.into(),
            state: LicenseState::Inactive,
            expiration_date: None,
            max_uses: None,
            current_uses: 0,
            capacity: 0,
            tokens: 0,
            features: BTreeSet::new(),
            custom_attributes: BTreeMap::new(),
            offline_key: None,
            organization_id: None,
            version: 0,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the expiration date.
    pub fn with_expiration(mut self, expiration: Timestamp) -> Self {
        self.expiration_date = Some(expiration);
        self
    }

    /// Set the usage counters.
    pub fn with_uses(mut self, current_uses: u64, max_uses: Option<u64>) -> Self {
        self.current_uses = current_uses;
        self.max_uses = max_uses;
        self
    }

    /// Set the capacity and token quotas.
    pub fn with_quota(mut self, capacity: u64, tokens: u64) -> Self {
        self.capacity = capacity;
        self.tokens = tokens;
        self
    }

    /// Replace the feature set.
    pub fn with_features<I, F>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FeatureId>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    /// Set one custom attribute value.
    pub fn with_attribute(mut self, id: impl Into<AttributeId>, value: AttributeValue) -> Self {
        self.custom_attributes.insert(id.into(), value);
        self
    }

    /// Set the offline key.
    pub fn with_offline_key(mut self, offline_key: impl Into<String>) -> Self {
        self.offline_key = Some(offline_key.into());
        self
    }

    /// Set the lifecycle state directly. Intended for loading fixtures;
    /// runtime state changes go through the state machine.
    pub fn with_state(mut self, state: LicenseState) -> Self {
        self.state = state;
        self
    }

    /// Check the structural invariants of the record.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidRecord` if the key is empty, the usage
    /// counter exceeds the ceiling, or the offline key equals the license key.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.key.trim().is_empty() {
            return Err(CoreError::InvalidRecord("license key is empty".to_string()));
        }
        if let Some(max) = self.max_uses {
            if self.current_uses > max {
                return Err(CoreError::InvalidRecord(format!(
                    "current_uses {} exceeds max_uses {max}",
                    self.current_uses
                )));
            }
        }
        if self.offline_key.as_deref() == Some(self.key.as_str()) {
            return Err(CoreError::InvalidRecord(
                "offline key must differ from the license key".to_string(),
            ));
        }
        Ok(())
    }

    /// Uses left before the ceiling, or `None` when unlimited.
    pub fn remaining_uses(&self) -> Option<u64> {
        self.max_uses
            .map(|max| max.saturating_sub(self.current_uses))
    }

    /// Return a copy with one more use recorded.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UsageLimitReached` when the ceiling is already met.
    pub fn record_use(&self) -> Result<Self, CoreError> {
        if let Some(max) = self.max_uses {
            if self.current_uses >= max {
                return Err(CoreError::UsageLimitReached {
                    current_uses: self.current_uses,
                    max_uses: max,
                });
            }
        }
        let mut next = self.clone();
        next.current_uses = self.current_uses.saturating_add(1);
        Ok(next)
    }

    /// Whether the expiration date lies strictly before `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expiration_date.is_some_and(|exp| now > exp)
    }
}
