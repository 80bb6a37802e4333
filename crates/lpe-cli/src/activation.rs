//! # Activation Subcommands
//!
//! `encode` issues the activation code for a license identified by its
//! offline key. `decode` verifies a code without any license file and,
//! given rules, re-evaluates them against the decoded snapshot. Features
//! named with `--feature` are reported as granted or not; an expired code
//! grants nothing.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use lpe_core::Timestamp;
use lpe_store::{MemoryLicenseStore, MemoryRuleStore, OfflineVerdict, PolicyService};

use crate::config::Config;
use crate::input::{load_licenses, load_rules};

/// Arguments for the encode subcommand.
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// License file (JSON or YAML).
    #[arg(long)]
    pub licenses: PathBuf,
    /// Offline key of the license to encode.
    #[arg(long)]
    pub offline_key: String,
}

/// Arguments for the decode subcommand.
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// The activation code.
    pub code: String,
    /// Rule file to evaluate against the decoded snapshot.
    #[arg(long)]
    pub rules: Option<PathBuf>,
    /// Feature to check against the code. Repeatable.
    #[arg(long = "feature")]
    pub features: Vec<String>,
    /// Evaluation clock (RFC 3339 or YYYY-MM-DD). Overrides `LPE_NOW`.
    #[arg(long, value_parser = crate::parse_timestamp)]
    pub now: Option<Timestamp>,
}

#[derive(Debug, Serialize)]
struct DecodeOutput {
    #[serde(flatten)]
    verdict: OfflineVerdict,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    granted: BTreeMap<String, bool>,
}

/// Print the activation code on its own line.
pub fn encode(args: &EncodeArgs, config: &Config, out: &mut impl Write) -> Result<()> {
    let store = load_licenses(&args.licenses)?;
    let service = PolicyService::new(
        Arc::new(store.clone()),
        Arc::new(MemoryRuleStore::default()),
        Arc::new(store),
    );
    let code = service
        .issue_activation_code(&args.offline_key, config.clock(None))
        .context("cannot issue activation code")?;
    writeln!(out, "{code}")?;
    Ok(())
}

/// Print the offline verdict as pretty JSON.
pub fn decode(args: &DecodeArgs, config: &Config, out: &mut impl Write) -> Result<()> {
    let rules = match &args.rules {
        Some(path) => load_rules(path)?,
        None => Vec::new(),
    };
    let store = MemoryLicenseStore::new();
    let service = PolicyService::new(
        Arc::new(store.clone()),
        Arc::new(MemoryRuleStore::new(rules)),
        Arc::new(store),
    );
    let verdict = service
        .verify_offline(&args.code, config.clock(args.now))
        .context("activation code rejected")?;
    let granted = args
        .features
        .iter()
        .map(|f| (f.clone(), !verdict.expired && verdict.snapshot.grants(f)))
        .collect();
    serde_json::to_writer_pretty(&mut *out, &DecodeOutput { verdict, granted })?;
    writeln!(out)?;
    Ok(())
}
