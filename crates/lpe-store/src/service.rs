//! # Policy Service
//!
//! Orchestrates one evaluation request:
//!
//! ```text
//! load record ─▶ persist expiry if due ─▶ evaluate rules ─▶ select action
//!     ─▶ state machine ─▶ save with expected version
//! ```
//!
//! and the offline flows:
//!
//! ```text
//! offline key ─▶ lookup ─▶ encode ─▶ activation code
//! activation code ─▶ decode ─▶ snapshot ─▶ expiry check + rule selection
//! ```
//!
//! Usage recording and organization transfers go through the same
//! load-then-save-with-version path as transitions.
//!
//! A rejected transition leaves the stored record untouched except for a
//! clock-driven expiry, which is persisted before the rules run. Version
//! conflicts are returned to the caller unchanged; the service never retries.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;

use lpe_codec::{encode, ActivationCode, ActivationSnapshot};
use lpe_core::{LicenseId, LicenseRecord, OrganizationId, RuleId, Timestamp};
use lpe_rules::{AuditEntry, AuditEntryType, AuditTrail, EvaluationReport, RuleEngine, Selection};
use lpe_state::{apply, expire_if_due, LifecycleCommand, Transition, TransitionError, TransitionRecord};

use crate::contracts::{CatalogSource, OfflineLookup, RecordStore, RuleStore};
use crate::error::ServiceError;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// The result of [`PolicyService::evaluate_and_apply`].
#[derive(Debug, Clone)]
pub enum EvaluationOutcome {
    /// A rule matched and its transition was saved.
    Applied {
        /// The record as stored after the transition.
        record: LicenseRecord,
        /// The matching rule.
        rule_id: RuleId,
        /// The state change.
        transition: TransitionRecord,
        /// Per-rule verdicts.
        report: EvaluationReport,
    },
    /// No rule matched; nothing beyond a due expiry was saved.
    NoMatch {
        /// The record as stored.
        record: LicenseRecord,
        /// Per-rule verdicts.
        report: EvaluationReport,
    },
    /// A rule matched but the state machine refused its action.
    Rejected {
        /// The record as stored, unchanged by the refused action.
        record: LicenseRecord,
        /// The matching rule.
        rule_id: RuleId,
        /// Why the action was refused.
        error: TransitionError,
        /// Per-rule verdicts.
        report: EvaluationReport,
    },
}

impl EvaluationOutcome {
    /// The record as it stands in the store after the request.
    pub fn record(&self) -> &LicenseRecord {
        match self {
            Self::Applied { record, .. }
            | Self::NoMatch { record, .. }
            | Self::Rejected { record, .. } => record,
        }
    }

    /// The evaluation report.
    pub fn report(&self) -> &EvaluationReport {
        match self {
            Self::Applied { report, .. }
            | Self::NoMatch { report, .. }
            | Self::Rejected { report, .. } => report,
        }
    }
}

/// What an offline client may conclude from an activation code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfflineVerdict {
    /// The decoded snapshot.
    pub snapshot: ActivationSnapshot,
    /// Whether the snapshot's expiration date has passed.
    pub expired: bool,
    /// Rule selection against the snapshot. Rules on fields the snapshot
    /// does not carry evaluate as indeterminate.
    pub selection: Selection,
}

// ---------------------------------------------------------------------------
// PolicyService
// ---------------------------------------------------------------------------

/// Wires the stores, the rule engine, the state machine and the codec.
pub struct PolicyService {
    records: Arc<dyn RecordStore>,
    rules: Arc<dyn RuleStore>,
    offline: Arc<dyn OfflineLookup>,
    catalog: Option<Arc<dyn CatalogSource>>,
    audit: Mutex<AuditTrail>,
}

impl PolicyService {
    /// A service over the given collaborators, with a default-capacity audit
    /// trail and no catalog.
    pub fn new(
        records: Arc<dyn RecordStore>,
        rules: Arc<dyn RuleStore>,
        offline: Arc<dyn OfflineLookup>,
    ) -> Self {
        Self {
            records,
            rules,
            offline,
            catalog: None,
            audit: Mutex::new(AuditTrail::default()),
        }
    }

    /// Resolve custom attributes through `catalog`.
    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogSource>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Bound the audit trail at `capacity` entries.
    pub fn with_audit_capacity(mut self, capacity: usize) -> Self {
        self.audit = Mutex::new(AuditTrail::new(capacity));
        self
    }

    /// A copy of the audit trail's entries, oldest first.
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.lock().entries().to_vec()
    }

    /// A copy of the audit entries concerning one license, oldest first.
    pub fn audit_for_license(&self, id: &LicenseId) -> Vec<AuditEntry> {
        self.audit
            .lock()
            .entries_for_license(&id.to_string())
            .into_iter()
            .cloned()
            .collect()
    }

    fn record_audit(
        &self,
        entry_type: AuditEntryType,
        now: Timestamp,
        license_id: Option<&LicenseId>,
        metadata: serde_json::Value,
    ) {
        self.audit.lock().append(AuditEntry::new(
            entry_type,
            now,
            license_id.map(ToString::to_string),
            Some(metadata),
        ));
    }

    fn engine(&self) -> RuleEngine {
        let engine = RuleEngine::new(self.rules.load_rules());
        match &self.catalog {
            Some(source) => engine.with_catalog(source.load_catalog()),
            None => engine,
        }
    }

    /// Load a license and persist a due expiry.
    fn load_current(&self, id: &LicenseId, now: Timestamp) -> Result<LicenseRecord, ServiceError> {
        let record = self.records.load_license(id)?;
        let Some((expired, change)) = expire_if_due(&record, now) else {
            return Ok(record);
        };
        let saved = self.records.save_license(expired, record.version)?;
        self.record_audit(
            AuditEntryType::LicenseExpired,
            now,
            Some(id),
            json!({ "from": change.from_state, "reason": change.reason }),
        );
        Ok(saved)
    }

    /// Evaluate the rules against a license without changing anything.
    ///
    /// The report reflects the clock: an overdue license is evaluated as
    /// expired even though nothing is saved.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn evaluate(&self, id: &LicenseId, now: Timestamp) -> Result<EvaluationReport, ServiceError> {
        let record = self.records.load_license(id)?;
        let view = expire_if_due(&record, now).map_or(record, |(expired, _)| expired);
        Ok(self.engine().evaluate_all(&view))
    }

    /// Evaluate the rules against a license and apply the selected action.
    ///
    /// # Errors
    ///
    /// Store errors, including `VersionConflict` when the license changed
    /// concurrently. A refused transition is not an error; it is reported as
    /// [`EvaluationOutcome::Rejected`].
    pub fn evaluate_and_apply(
        &self,
        id: &LicenseId,
        now: Timestamp,
    ) -> Result<EvaluationOutcome, ServiceError> {
        let record = self.load_current(id, now)?;
        let report = self.engine().evaluate_all(&record);
        self.record_audit(
            AuditEntryType::RuleEvaluated,
            now,
            Some(id),
            json!({
                "rules": report.verdicts.len(),
                "indeterminate": report.indeterminate().map(|v| v.rule_id.as_str()).collect::<Vec<_>>(),
            }),
        );

        let Selection::Matched { rule_id, action } = report.selection.clone() else {
            tracing::debug!(license_id = %id, "no rule matched");
            self.record_audit(AuditEntryType::NoMatch, now, Some(id), json!({}));
            return Ok(EvaluationOutcome::NoMatch { record, report });
        };
        self.record_audit(
            AuditEntryType::ActionSelected,
            now,
            Some(id),
            json!({ "rule_id": rule_id, "action": action }),
        );

        match apply(&record, LifecycleCommand::from(action), now) {
            Ok(transition) => {
                let change = transition.change.clone();
                let saved = self.save_transition(&record, transition, now)?;
                Ok(EvaluationOutcome::Applied {
                    record: saved,
                    rule_id,
                    transition: change,
                    report,
                })
            }
            Err(error) => {
                self.record_audit(
                    AuditEntryType::TransitionRejected,
                    now,
                    Some(id),
                    json!({ "rule_id": rule_id, "error": error.to_string() }),
                );
                Ok(EvaluationOutcome::Rejected {
                    record,
                    rule_id,
                    error,
                    report,
                })
            }
        }
    }

    /// Apply a lifecycle command directly, e.g. a system-triggered suspend.
    ///
    /// # Errors
    ///
    /// `Transition` if the state machine refuses the command (a due expiry
    /// is still persisted), or store errors.
    pub fn execute(
        &self,
        id: &LicenseId,
        command: LifecycleCommand,
        now: Timestamp,
    ) -> Result<(LicenseRecord, TransitionRecord), ServiceError> {
        let record = self.load_current(id, now)?;
        let action = command.action();
        let transition = match apply(&record, command, now) {
            Ok(transition) => transition,
            Err(error) => {
                self.record_audit(
                    AuditEntryType::TransitionRejected,
                    now,
                    Some(id),
                    json!({ "action": action, "error": error.to_string() }),
                );
                return Err(error.into());
            }
        };
        let change = transition.change.clone();
        let saved = self.save_transition(&record, transition, now)?;
        Ok((saved, change))
    }

    /// Record one use of a license.
    ///
    /// A due expiry is persisted first, so an overdue license is refused.
    ///
    /// # Errors
    ///
    /// `NotUsable` unless the license is active, `Usage` when the ceiling is
    /// already met, or store errors.
    pub fn record_usage(&self, id: &LicenseId, now: Timestamp) -> Result<LicenseRecord, ServiceError> {
        let record = self.load_current(id, now)?;
        if !record.state.is_usable() {
            tracing::debug!(license_id = %id, state = %record.state, "use refused");
            return Err(ServiceError::NotUsable {
                id: *id,
                state: record.state,
            });
        }
        let next = record.record_use().map_err(ServiceError::Usage)?;
        let saved = self.records.save_license(next, record.version)?;
        self.record_audit(
            AuditEntryType::UsageRecorded,
            now,
            Some(id),
            json!({
                "current_uses": saved.current_uses,
                "max_uses": saved.max_uses,
                "version": saved.version,
            }),
        );
        Ok(saved)
    }

    /// Move a license into another organization pool, or out of any pool
    /// with `None`. The lifecycle state is not touched.
    ///
    /// Transferring to the current organization saves nothing.
    ///
    /// # Errors
    ///
    /// Store errors, including `VersionConflict`.
    pub fn transfer(
        &self,
        id: &LicenseId,
        organization_id: Option<OrganizationId>,
        now: Timestamp,
    ) -> Result<LicenseRecord, ServiceError> {
        let record = self.load_current(id, now)?;
        if record.organization_id == organization_id {
            return Ok(record);
        }
        let mut moved = record.clone();
        moved.organization_id = organization_id;
        let saved = self.records.save_license(moved, record.version)?;
        tracing::info!(license_id = %id, version = saved.version, "license transferred");
        self.record_audit(
            AuditEntryType::LicenseTransferred,
            now,
            Some(id),
            json!({
                "from": record.organization_id,
                "to": saved.organization_id,
                "version": saved.version,
            }),
        );
        Ok(saved)
    }

    fn save_transition(
        &self,
        loaded: &LicenseRecord,
        transition: Transition,
        now: Timestamp,
    ) -> Result<LicenseRecord, ServiceError> {
        let Transition { record, change, .. } = transition;
        let saved = self.records.save_license(record, loaded.version)?;
        self.record_audit(
            AuditEntryType::TransitionApplied,
            now,
            Some(&saved.id),
            json!({
                "action": change.action,
                "from": change.from_state,
                "to": change.to_state,
                "version": saved.version,
            }),
        );
        Ok(saved)
    }

    /// Issue the activation code for the license holding `offline_key`.
    ///
    /// # Errors
    ///
    /// `Store(NotFound)` for an unknown offline key.
    pub fn issue_activation_code(
        &self,
        offline_key: &str,
        now: Timestamp,
    ) -> Result<ActivationCode, ServiceError> {
        let record = self.offline.find_by_offline_key(offline_key)?;
        let code = encode(&record)?;
        self.record_audit(
            AuditEntryType::ActivationIssued,
            now,
            Some(&record.id),
            json!({ "features": record.features.len() }),
        );
        Ok(code)
    }

    /// Decode an activation code and judge it without any store access.
    ///
    /// # Errors
    ///
    /// `Decode` if the code is malformed.
    pub fn verify_offline(&self, code: &str, now: Timestamp) -> Result<OfflineVerdict, ServiceError> {
        let snapshot = match lpe_codec::decode(code) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                self.record_audit(
                    AuditEntryType::ActivationRejected,
                    now,
                    None,
                    json!({ "error": error.to_string() }),
                );
                return Err(error.into());
            }
        };
        let expired = snapshot.is_expired_at(now);
        let selection = self.engine().select_action(&snapshot);
        self.record_audit(
            AuditEntryType::ActivationVerified,
            now,
            Some(&snapshot.id),
            json!({ "expired": expired, "selection": selection }),
        );
        Ok(OfflineVerdict {
            snapshot,
            expired,
            selection,
        })
    }
}

impl std::fmt::Debug for PolicyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyService")
            .field("catalog", &self.catalog.is_some())
            .field("audit", &*self.audit.lock())
            .finish()
    }
}
