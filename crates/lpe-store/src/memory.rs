//! # In-Memory Stores
//!
//! Cloneable handles over shared maps. Locks are `parking_lot` (not
//! poisonable) and never held across calls into caller code.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use lpe_core::{CustomAttributeDefinition, Feature, LicenseId, LicenseRecord};
use lpe_rules::Rule;

use crate::contracts::{CatalogSource, OfflineLookup, RecordStore, RuleStore};
use crate::error::StoreError;

// -- Licenses -----------------------------------------------------------------

/// License records keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MemoryLicenseStore {
    data: Arc<RwLock<HashMap<LicenseId, LicenseRecord>>>,
}

impl MemoryLicenseStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a license.
    ///
    /// # Errors
    ///
    /// `InvalidRecord` if the record fails validation, `DuplicateKey` if its
    /// id or key is already stored.
    pub fn insert(&self, record: LicenseRecord) -> Result<LicenseRecord, StoreError> {
        record.validate()?;
        let mut guard = self.data.write();
        if guard.contains_key(&record.id) || guard.values().any(|r| r.key == record.key) {
            return Err(StoreError::DuplicateKey(record.key));
        }
        guard.insert(record.id, record.clone());
        Ok(record)
    }

    /// A license by id.
    pub fn get(&self, id: &LicenseId) -> Option<LicenseRecord> {
        self.data.read().get(id).cloned()
    }

    /// A license by its customer-facing key.
    pub fn find_by_key(&self, key: &str) -> Option<LicenseRecord> {
        self.data.read().values().find(|r| r.key == key).cloned()
    }

    /// Every license, ordered by key.
    pub fn list(&self) -> Vec<LicenseRecord> {
        let mut all: Vec<LicenseRecord> = self.data.read().values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }

    /// Number of licenses.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for MemoryLicenseStore {
    fn load_license(&self, id: &LicenseId) -> Result<LicenseRecord, StoreError> {
        self.get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn save_license(
        &self,
        mut record: LicenseRecord,
        expected_version: u64,
    ) -> Result<LicenseRecord, StoreError> {
        record.validate()?;
        let mut guard = self.data.write();
        let actual = guard
            .get(&record.id)
            .map(|current| current.version)
            .ok_or_else(|| StoreError::NotFound(record.id.to_string()))?;
        if actual != expected_version {
            return Err(StoreError::VersionConflict {
                id: record.id,
                expected: expected_version,
                actual,
            });
        }
        if guard
            .values()
            .any(|other| other.id != record.id && other.key == record.key)
        {
            return Err(StoreError::DuplicateKey(record.key));
        }
        record.version = actual.saturating_add(1);
        guard.insert(record.id, record.clone());
        Ok(record)
    }
}

impl OfflineLookup for MemoryLicenseStore {
    fn find_by_offline_key(&self, offline_key: &str) -> Result<LicenseRecord, StoreError> {
        if offline_key.is_empty() {
            return Err(StoreError::NotFound("empty offline key".to_string()));
        }
        self.data
            .read()
            .values()
            .find(|r| r.offline_key.as_deref() == Some(offline_key))
            .cloned()
            .ok_or_else(|| StoreError::NotFound("no license for offline key".to_string()))
    }
}

// -- Rules --------------------------------------------------------------------

/// Rules in authored order.
#[derive(Debug, Clone, Default)]
pub struct MemoryRuleStore {
    rules: Arc<RwLock<Vec<Rule>>>,
}

impl MemoryRuleStore {
    /// A store holding `rules` in the given order.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules: Arc::new(RwLock::new(rules)),
        }
    }

    /// Add a rule, replacing one with the same id in place, otherwise last.
    pub fn upsert(&self, rule: Rule) {
        let mut guard = self.rules.write();
        match guard.iter_mut().find(|r| r.id() == rule.id()) {
            Some(slot) => *slot = rule,
            None => guard.push(rule),
        }
    }

    /// Remove a rule by id.
    pub fn remove(&self, rule_id: &str) -> Option<Rule> {
        let mut guard = self.rules.write();
        let pos = guard.iter().position(|r| r.id().as_str() == rule_id)?;
        Some(guard.remove(pos))
    }
}

impl RuleStore for MemoryRuleStore {
    fn load_rules(&self) -> Vec<Rule> {
        self.rules.read().clone()
    }
}

// -- Catalog ------------------------------------------------------------------

/// Fixed custom attribute definitions and features.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    attributes: Vec<CustomAttributeDefinition>,
    features: Vec<Feature>,
}

impl MemoryCatalog {
    /// A catalog source over the given definitions.
    pub fn new(attributes: Vec<CustomAttributeDefinition>, features: Vec<Feature>) -> Self {
        Self {
            attributes,
            features,
        }
    }
}

impl CatalogSource for MemoryCatalog {
    fn load_custom_attribute_definitions(&self) -> Vec<CustomAttributeDefinition> {
        self.attributes.clone()
    }

    fn load_features(&self) -> Vec<Feature> {
        self.features.clone()
    }
}
