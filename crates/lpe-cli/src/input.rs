//! Reading rule, license and catalog documents from disk.
//!
//! `.yaml`/`.yml` files are parsed as YAML, everything else as JSON.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use lpe_core::{CustomAttributeDefinition, Feature, LicenseRecord};
use lpe_rules::{Rule, StoredRule};
use lpe_store::{MemoryCatalog, MemoryLicenseStore};

/// Parse a document, choosing the format by extension.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    if is_yaml {
        serde_yaml::from_str(&raw).with_context(|| format!("invalid YAML in {}", path.display()))
    } else {
        serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
    }
}

/// A rules file: either authored rules or rows exported from a rule table,
/// whose conditions are a JSON string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RulesDocument {
    Authored(Vec<Rule>),
    Stored(Vec<StoredRule>),
}

/// Load rules in file order.
pub fn load_rules(path: &Path) -> Result<Vec<Rule>> {
    match read_document(path)? {
        RulesDocument::Authored(rules) => Ok(rules),
        RulesDocument::Stored(rows) => rows
            .into_iter()
            .map(|row| {
                let id = row.id.clone();
                Rule::try_from(row).with_context(|| format!("rule {id} in {}", path.display()))
            })
            .collect(),
    }
}

/// Load license records into a fresh in-memory store.
pub fn load_licenses(path: &Path) -> Result<MemoryLicenseStore> {
    let records: Vec<LicenseRecord> = read_document(path)?;
    let store = MemoryLicenseStore::new();
    for record in records {
        let key = record.key.clone();
        store
            .insert(record)
            .with_context(|| format!("license {key:?} in {}", path.display()))?;
    }
    Ok(store)
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    attributes: Vec<CustomAttributeDefinition>,
    #[serde(default)]
    features: Vec<Feature>,
}

/// Load a catalog of custom attribute definitions and features.
pub fn load_catalog(path: &Path) -> Result<MemoryCatalog> {
    let doc: CatalogDocument = read_document(path)?;
    Ok(MemoryCatalog::new(doc.attributes, doc.features))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpe_core::LicenseState;
    use lpe_rules::RuleAction;

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn yaml_rules_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "rules.yaml",
            r#"
- id: trial-cutoff
  name: Trial cutoff
  action: deactivate
  conditions:
    - field: type
      operator: equals
      value: trial
    - field: current_uses
      operator: greater than
      value: "9"
      logicalOperator: OR
"#,
        );
        let rules = load_rules(&path).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].action(), RuleAction::Deactivate);
        assert_eq!(rules[0].conditions().len(), 2);
    }

    #[test]
    fn stored_rule_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "rules.json",
            r#"[{"id":"r1","name":"r1","action":"activate",
                "condition":"{\"field\":\"type\",\"operator\":\"equals\",\"value\":\"trial\"}"}]"#,
        );
        let rules = load_rules(&path).unwrap();
        assert_eq!(rules[0].id().as_str(), "r1");
        assert!(rules[0].is_enabled());
    }

    #[test]
    fn licenses_get_ids_and_validation() {
        let dir = tempfile::tempdir().unwrap();
        let ok = write(
            &dir,
            "licenses.json",
            r#"[{"key":"K-1","type":"trial","state":"active"},
                {"key":"K-2","type":"perpetual"}]"#,
        );
        let store = load_licenses(&ok).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.find_by_key("K-1").unwrap().state, LicenseState::Active);
        assert_eq!(store.find_by_key("K-2").unwrap().state, LicenseState::Inactive);

        let dup = write(
            &dir,
            "dup.json",
            r#"[{"key":"K-1","type":"trial"},{"key":"K-1","type":"trial"}]"#,
        );
        let err = load_licenses(&dup).unwrap_err();
        assert!(format!("{err:#}").contains("K-1"));
    }

    #[test]
    fn unreadable_file_names_the_path() {
        let err = load_rules(Path::new("/nonexistent/rules.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rules.json"));
    }
}
