//! Offline activation: issuing codes by offline key and verifying them
//! without store access.

mod common;

use common::*;
use lpe_codec::{ActivationSnapshot, DecodeError};
use lpe_core::LicenseState;
use lpe_rules::{AuditEntryType, ComparisonOperator as Op, RuleAction, Selection};
use lpe_store::{ServiceError, StoreError};

#[test]
fn issue_then_verify_round_trip() {
    let license = trial_license(LicenseState::Active).with_features(["sso", "audit"]);
    let expected = ActivationSnapshot::from_record(&license);
    let (svc, _store, _ids) = service(
        vec![license],
        vec![rule(
            "sso-upgrade",
            vec![when("features", Op::Contains, "sso")],
            RuleAction::Upgrade,
        )],
    );

    let code = svc.issue_activation_code("OFF-TRIAL-0001", now()).unwrap();
    assert!(!code.as_str().contains("OFF-TRIAL-0001"));

    let verdict = svc.verify_offline(code.as_str(), now()).unwrap();
    assert_eq!(verdict.snapshot, expected);
    assert!(!verdict.expired);
    assert_eq!(verdict.selection.action(), Some(RuleAction::Upgrade));

    let kinds: Vec<AuditEntryType> = svc.audit_entries().iter().map(|e| e.entry_type).collect();
    assert_eq!(
        kinds,
        [AuditEntryType::ActivationIssued, AuditEntryType::ActivationVerified]
    );
}

#[test]
fn license_key_is_not_an_offline_key() {
    let (svc, _store, _ids) = service(vec![trial_license(LicenseState::Active)], vec![]);
    assert!(matches!(
        svc.issue_activation_code("TRIAL-0001", now()),
        Err(ServiceError::Store(StoreError::NotFound(_)))
    ));
}

#[test]
fn expired_snapshot_is_reported() {
    let lapsed = trial_license(LicenseState::Active).with_expiration(ts("2026-01-01"));
    let (svc, _store, _ids) = service(vec![lapsed], vec![]);
    let code = svc.issue_activation_code("OFF-TRIAL-0001", now()).unwrap();
    let verdict = svc.verify_offline(code.as_str(), now()).unwrap();
    assert!(verdict.expired);
    assert_eq!(verdict.selection, Selection::NoMatch);
}

#[test]
fn rules_on_fields_missing_from_snapshot_do_not_match() {
    let (svc, _store, _ids) = service(
        vec![trial_license(LicenseState::Active)],
        vec![rule(
            "quota",
            vec![when("current_uses", Op::GreaterThan, "9")],
            RuleAction::Deactivate,
        )],
    );
    let code = svc.issue_activation_code("OFF-TRIAL-0001", now()).unwrap();
    let verdict = svc.verify_offline(code.as_str(), now()).unwrap();
    assert_eq!(verdict.selection, Selection::NoMatch);
}

#[test]
fn tampered_code_is_rejected_and_audited() {
    let (svc, _store, _ids) = service(vec![trial_license(LicenseState::Active)], vec![]);
    let code = svc
        .issue_activation_code("OFF-TRIAL-0001", now())
        .unwrap()
        .into_string();
    let truncated = &code[..code.len() - 3];
    assert!(matches!(
        svc.verify_offline(truncated, now()),
        Err(ServiceError::Decode(DecodeError::ChecksumMismatch))
            | Err(ServiceError::Decode(DecodeError::InvalidBase64 { .. }))
    ));
    assert!(svc
        .audit_entries()
        .iter()
        .any(|e| e.entry_type == AuditEntryType::ActivationRejected));
}
