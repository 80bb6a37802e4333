//! # Evaluate Subcommand
//!
//! Runs every license in a license file through the rules in a rule file.
//! Without `--apply` this is a dry run that prints per-rule verdicts; with
//! it, the selected action is pushed through the state machine and the
//! resulting record is printed.
//!
//! With a catalog, each license is also checked against it and any
//! undeclared or mistyped values are reported next to its result.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use lpe_core::{Catalog, LicenseId, LicenseRecord, RuleId, Timestamp};
use lpe_rules::{AuditEntry, EvaluationReport};
use lpe_state::TransitionRecord;
use lpe_store::{CatalogSource, EvaluationOutcome, MemoryRuleStore, PolicyService};

use crate::config::Config;
use crate::input::{load_catalog, load_licenses, load_rules};

/// Arguments for the evaluate subcommand.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Rule file (JSON or YAML), in authored order.
    #[arg(long)]
    pub rules: PathBuf,
    /// License file (JSON or YAML): a list of license records.
    #[arg(long)]
    pub licenses: PathBuf,
    /// Catalog file with custom attribute definitions and features.
    #[arg(long)]
    pub catalog: Option<PathBuf>,
    /// Only evaluate the license with this key.
    #[arg(long)]
    pub key: Option<String>,
    /// Apply the selected action instead of only reporting it.
    #[arg(long)]
    pub apply: bool,
    /// Include the audit trail in the output. With `--key`, only that
    /// license's entries.
    #[arg(long)]
    pub audit: bool,
    /// Evaluation clock (RFC 3339 or YYYY-MM-DD). Overrides `LPE_NOW`.
    #[arg(long, value_parser = crate::parse_timestamp)]
    pub now: Option<Timestamp>,
}

/// One license's result.
#[derive(Debug, Serialize)]
struct LicenseResult {
    key: String,
    license_id: LicenseId,
    #[serde(flatten)]
    outcome: OutcomeView,
    report: EvaluationReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    catalog_issues: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum OutcomeView {
    Evaluated,
    Applied {
        rule_id: RuleId,
        transition: TransitionRecord,
        record: LicenseRecord,
    },
    NoMatch {
        record: LicenseRecord,
    },
    Rejected {
        rule_id: RuleId,
        error: String,
        record: LicenseRecord,
    },
}

fn split(outcome: EvaluationOutcome) -> (OutcomeView, EvaluationReport) {
    match outcome {
        EvaluationOutcome::Applied {
            record,
            rule_id,
            transition,
            report,
        } => (
            OutcomeView::Applied {
                rule_id,
                transition,
                record,
            },
            report,
        ),
        EvaluationOutcome::NoMatch { record, report } => {
            (OutcomeView::NoMatch { record }, report)
        }
        EvaluationOutcome::Rejected {
            record,
            rule_id,
            error,
            report,
        } => (
            OutcomeView::Rejected {
                rule_id,
                error: error.to_string(),
                record,
            },
            report,
        ),
    }
}

/// An audit entry with its content digest, when it has one.
#[derive(Debug, Serialize)]
struct AuditView {
    #[serde(flatten)]
    entry: AuditEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    digest: Option<String>,
}

impl From<AuditEntry> for AuditView {
    fn from(entry: AuditEntry) -> Self {
        let digest = entry.digest().map(|d| d.to_string());
        Self { entry, digest }
    }
}

#[derive(Debug, Serialize)]
struct EvaluateOutput {
    now: Timestamp,
    results: Vec<LicenseResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audit: Option<Vec<AuditView>>,
}

fn catalog_issues(catalog: Option<&Catalog>, license: &LicenseRecord) -> Vec<String> {
    let Some(catalog) = catalog else {
        return Vec::new();
    };
    catalog
        .check_record(license)
        .into_iter()
        .map(|issue| {
            tracing::warn!(key = %license.key, %issue, "license does not match catalog");
            issue.to_string()
        })
        .collect()
}

/// Run the evaluate subcommand, writing pretty JSON to `out`.
pub fn run(args: &EvaluateArgs, config: &Config, out: &mut impl Write) -> Result<()> {
    let now = config.clock(args.now);
    let store = load_licenses(&args.licenses)?;
    let rules = load_rules(&args.rules)?;
    tracing::debug!(rules = rules.len(), licenses = store.len(), %now, "evaluating");

    let mut service = PolicyService::new(
        Arc::new(store.clone()),
        Arc::new(MemoryRuleStore::new(rules)),
        Arc::new(store.clone()),
    )
    .with_audit_capacity(config.audit_capacity);
    let mut catalog = None;
    if let Some(path) = &args.catalog {
        let source = load_catalog(path)?;
        catalog = Some(source.load_catalog());
        service = service.with_catalog(Arc::new(source));
    }

    let targets: Vec<LicenseRecord> = match &args.key {
        Some(key) => vec![store
            .find_by_key(key)
            .ok_or_else(|| anyhow::anyhow!("no license with key {key:?}"))?],
        None => store.list(),
    };

    let mut results = Vec::with_capacity(targets.len());
    for license in targets {
        let issues = catalog_issues(catalog.as_ref(), &license);
        let (outcome, report) = if args.apply {
            split(service.evaluate_and_apply(&license.id, now)?)
        } else {
            (OutcomeView::Evaluated, service.evaluate(&license.id, now)?)
        };
        results.push(LicenseResult {
            key: license.key,
            license_id: license.id,
            outcome,
            report,
            catalog_issues: issues,
        });
    }

    let audit = args.audit.then(|| {
        let entries = match &args.key {
            Some(_) => results
                .first()
                .map(|r| service.audit_for_license(&r.license_id))
                .unwrap_or_default(),
            None => service.audit_entries(),
        };
        entries.into_iter().map(AuditView::from).collect()
    });
    let output = EvaluateOutput {
        now,
        results,
        audit,
    };
    serde_json::to_writer_pretty(&mut *out, &output)?;
    writeln!(out)?;
    Ok(())
}
