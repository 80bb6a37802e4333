//! Shared fixtures for the service integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lpe_core::{LicenseId, LicenseRecord, LicenseState, Timestamp};
use lpe_rules::{ComparisonOperator, Condition, LogicalOperator, Rule, RuleAction};
use lpe_store::{
    MemoryLicenseStore, MemoryRuleStore, PolicyService, RecordStore, StoreError,
};

pub fn ts(s: &str) -> Timestamp {
    Timestamp::parse_flexible(s).unwrap()
}

/// The fixed clock every test runs at.
pub fn now() -> Timestamp {
    ts("2026-06-01T00:00:00Z")
}

pub fn rule(id: &str, conditions: Vec<Condition>, action: RuleAction) -> Rule {
    Rule::new(id, id, conditions, action).unwrap()
}

pub fn when(field: &str, op: ComparisonOperator, value: &str) -> Condition {
    Condition::new(field, op, value)
}

pub fn and(field: &str, op: ComparisonOperator, value: &str) -> Condition {
    Condition::new(field, op, value).joined(LogicalOperator::And)
}

pub fn trial_license(state: LicenseState) -> LicenseRecord {
    LicenseRecord::new("TRIAL-0001", "trial")
        .with_name("Acme trial")
        .with_state(state)
        .with_uses(10, Some(10))
        .with_features(["sso"])
        .with_expiration(ts("2027-01-01"))
        .with_offline_key("OFF-TRIAL-0001")
}

/// A service over fresh in-memory stores, with `licenses` provisioned.
pub fn service(
    licenses: Vec<LicenseRecord>,
    rules: Vec<Rule>,
) -> (PolicyService, MemoryLicenseStore, Vec<LicenseId>) {
    let store = MemoryLicenseStore::new();
    let ids = licenses
        .into_iter()
        .map(|l| store.insert(l).unwrap().id)
        .collect();
    let svc = PolicyService::new(
        Arc::new(store.clone()),
        Arc::new(MemoryRuleStore::new(rules)),
        Arc::new(store.clone()),
    );
    (svc, store, ids)
}

/// A record store that lets one concurrent writer win just before the
/// first save goes through.
pub struct RacingStore {
    pub inner: MemoryLicenseStore,
    raced: AtomicBool,
}

impl RacingStore {
    pub fn new(inner: MemoryLicenseStore) -> Self {
        Self {
            inner,
            raced: AtomicBool::new(false),
        }
    }
}

impl RecordStore for RacingStore {
    fn load_license(&self, id: &LicenseId) -> Result<LicenseRecord, StoreError> {
        self.inner.load_license(id)
    }

    fn save_license(
        &self,
        record: LicenseRecord,
        expected_version: u64,
    ) -> Result<LicenseRecord, StoreError> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            let current = self.inner.load_license(&record.id)?;
            let version = current.version;
            self.inner
                .save_license(current.with_name("concurrent edit"), version)?;
        }
        self.inner.save_license(record, expected_version)
    }
}
