//! # Attribute and Feature Catalog
//!
//! Read-only view over the custom attribute definitions and features an
//! operator has authored. The engine uses it to resolve a condition's field
//! reference by id or by name, and to type-check a record's custom values
//! against their declared types. The catalog is never mutated by the core.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::{AttributeId, FeatureId};
use crate::record::LicenseRecord;
use crate::value::{AttributeType, AttributeValue, ValueKind};

/// A product feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    /// Identifier referenced from license feature sets.
    pub id: FeatureId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// The definition of a custom license attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAttributeDefinition {
    /// Identifier used as the key in `LicenseRecord::custom_attributes`.
    pub id: AttributeId,
    /// Display name; conditions may reference the attribute by this name.
    pub name: String,
    /// Declared type values must have.
    #[serde(rename = "type")]
    pub declared_type: AttributeType,
}

impl CustomAttributeDefinition {
    /// Whether `value` has the declared type.
    pub fn accepts(&self, value: &AttributeValue) -> bool {
        value.kind() == self.declared_type.value_kind()
    }
}

/// A problem found when checking a record against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogIssue {
    /// The record carries a value for an attribute the catalog does not define.
    UnknownAttribute(AttributeId),
    /// The record's value does not have the declared type.
    TypeMismatch {
        /// Attribute whose value is mistyped.
        attribute: AttributeId,
        /// Type from the definition.
        declared: AttributeType,
        /// Kind of the stored value.
        actual: ValueKind,
    },
    /// The record grants a feature the catalog does not define.
    UnknownFeature(FeatureId),
}

impl std::fmt::Display for CatalogIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownAttribute(id) => write!(f, "unknown custom attribute {id}"),
            Self::TypeMismatch {
                attribute,
                declared,
                actual,
            } => write!(f, "attribute {attribute} declared {declared} but holds {actual}"),
            Self::UnknownFeature(id) => write!(f, "unknown feature {id}"),
        }
    }
}

/// Custom attribute definitions and features, indexed for lookup.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    attributes: BTreeMap<AttributeId, CustomAttributeDefinition>,
    features: BTreeMap<FeatureId, Feature>,
}

impl Catalog {
    /// Build a catalog. Later duplicates replace earlier ones.
    pub fn new(
        attributes: impl IntoIterator<Item = CustomAttributeDefinition>,
        features: impl IntoIterator<Item = Feature>,
    ) -> Self {
        Self {
            attributes: attributes.into_iter().map(|d| (d.id.clone(), d)).collect(),
            features: features.into_iter().map(|f| (f.id.clone(), f)).collect(),
        }
    }

    /// Look up a definition by id, falling back to an exact name match.
    ///
    /// When several definitions share a name, the one with the smallest id
    /// wins so the lookup stays deterministic.
    pub fn attribute(&self, reference: &str) -> Option<&CustomAttributeDefinition> {
        self.attributes
            .get(reference)
            .or_else(|| self.attributes.values().find(|d| d.name == reference))
    }

    /// Look up a feature by id.
    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.features.get(id)
    }

    /// All definitions in id order.
    pub fn attributes(&self) -> impl Iterator<Item = &CustomAttributeDefinition> {
        self.attributes.values()
    }

    /// All features in id order.
    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.features.values()
    }

    /// Check a record's custom values and feature ids against the catalog.
    ///
    /// Problems are reported, not raised: a mistyped value is still a
    /// loadable record, it just evaluates as indeterminate.
    pub fn check_record(&self, record: &LicenseRecord) -> Vec<CatalogIssue> {
        let mut issues = Vec::new();
        for (id, value) in &record.custom_attributes {
            match self.attributes.get(id) {
                None => issues.push(CatalogIssue::UnknownAttribute(id.clone())),
                Some(def) if !def.accepts(value) => issues.push(CatalogIssue::TypeMismatch {
                    attribute: id.clone(),
                    declared: def.declared_type,
                    actual: value.kind(),
                }),
                Some(_) => {}
            }
        }
        for feature in &record.features {
            if !self.features.contains_key(feature) {
                issues.push(CatalogIssue::UnknownFeature(feature.clone()));
            }
        }
        issues
    }
}
