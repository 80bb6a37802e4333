//! Collaborator contracts.
//!
//! All methods are synchronous and take `&self`; implementations provide
//! their own interior synchronization and must be shareable across threads.

use lpe_core::{Catalog, CustomAttributeDefinition, Feature, LicenseId, LicenseRecord};
use lpe_rules::Rule;

use crate::error::StoreError;

/// Load and save license records with optimistic concurrency.
pub trait RecordStore: Send + Sync {
    /// Load one license.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if no license has this id.
    fn load_license(&self, id: &LicenseId) -> Result<LicenseRecord, StoreError>;

    /// Save `record` if the stored version still equals `expected_version`.
    /// Returns the stored record with its version bumped.
    ///
    /// # Errors
    ///
    /// `StoreError::VersionConflict` if the stored version moved on,
    /// `StoreError::NotFound` if the license does not exist.
    fn save_license(
        &self,
        record: LicenseRecord,
        expected_version: u64,
    ) -> Result<LicenseRecord, StoreError>;
}

/// Source of operator-authored rules.
pub trait RuleStore: Send + Sync {
    /// All rules, in authored order.
    fn load_rules(&self) -> Vec<Rule>;
}

/// Source of custom attribute definitions and features.
pub trait CatalogSource: Send + Sync {
    /// All custom attribute definitions.
    fn load_custom_attribute_definitions(&self) -> Vec<CustomAttributeDefinition>;

    /// All features.
    fn load_features(&self) -> Vec<Feature>;

    /// Both, indexed.
    fn load_catalog(&self) -> Catalog {
        Catalog::new(self.load_custom_attribute_definitions(), self.load_features())
    }
}

/// Look licenses up by offline key.
pub trait OfflineLookup: Send + Sync {
    /// The license whose offline key equals `offline_key`.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if none matches.
    fn find_by_offline_key(&self, offline_key: &str) -> Result<LicenseRecord, StoreError>;
}
