//! # Use and Transfer Subcommands
//!
//! `use` records one use of an active license. `transfer` moves a license
//! into an organization pool, or out of any pool with `--none`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use lpe_core::{LicenseRecord, OrganizationId, Timestamp};
use lpe_store::{MemoryRuleStore, PolicyService};

use crate::config::Config;
use crate::input::load_licenses;

/// Arguments for the use subcommand.
#[derive(Args, Debug)]
pub struct UseArgs {
    /// License file (JSON or YAML).
    #[arg(long)]
    pub licenses: PathBuf,
    /// Key of the license being used.
    #[arg(long)]
    pub key: String,
    /// Evaluation clock (RFC 3339 or YYYY-MM-DD). Overrides `LPE_NOW`.
    #[arg(long, value_parser = crate::parse_timestamp)]
    pub now: Option<Timestamp>,
}

/// Arguments for the transfer subcommand.
#[derive(Args, Debug)]
pub struct TransferArgs {
    /// License file (JSON or YAML).
    #[arg(long)]
    pub licenses: PathBuf,
    /// Key of the license to move.
    #[arg(long)]
    pub key: String,
    /// Target organization id (UUID).
    #[arg(long, value_parser = parse_organization, required_unless_present = "none")]
    pub organization: Option<OrganizationId>,
    /// Remove the license from its organization pool.
    #[arg(long, conflicts_with = "organization")]
    pub none: bool,
    /// Evaluation clock (RFC 3339 or YYYY-MM-DD). Overrides `LPE_NOW`.
    #[arg(long, value_parser = crate::parse_timestamp)]
    pub now: Option<Timestamp>,
}

fn parse_organization(raw: &str) -> Result<OrganizationId, String> {
    OrganizationId::parse(raw).map_err(|e| e.to_string())
}

fn open(licenses: &Path, key: &str) -> Result<(PolicyService, LicenseRecord)> {
    let store = load_licenses(licenses)?;
    let license = store
        .find_by_key(key)
        .with_context(|| format!("no license with key {key:?}"))?;
    let service = PolicyService::new(
        Arc::new(store.clone()),
        Arc::new(MemoryRuleStore::default()),
        Arc::new(store),
    );
    Ok((service, license))
}

fn print(record: &LicenseRecord, out: &mut impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, record)?;
    writeln!(out)?;
    Ok(())
}

/// Record a use and print the updated record.
pub fn use_license(args: &UseArgs, config: &Config, out: &mut impl Write) -> Result<()> {
    let (service, license) = open(&args.licenses, &args.key)?;
    let record = service
        .record_usage(&license.id, config.clock(args.now))
        .with_context(|| format!("cannot use license {}", args.key))?;
    print(&record, out)
}

/// Move the license and print the updated record.
pub fn transfer(args: &TransferArgs, config: &Config, out: &mut impl Write) -> Result<()> {
    let (service, license) = open(&args.licenses, &args.key)?;
    let target = if args.none { None } else { args.organization };
    let record = service
        .transfer(&license.id, target, config.clock(args.now))
        .with_context(|| format!("cannot transfer license {}", args.key))?;
    print(&record, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const ORG: &str = "6f1c1b1e-8d0a-4c1e-9a53-2f8a3c1d0b77";

    fn licenses(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("licenses.json");
        std::fs::write(
            &path,
            format!(
                r#"[{{"key":"K-1","type":"subscription","state":"active","current_uses":4,"max_uses":5,
                     "organization_id":"{ORG}","expiration_date":"2027-01-01T00:00:00Z"}},
                    {{"key":"K-2","type":"subscription","state":"suspended"}}]"#
            ),
        )
        .unwrap();
        path
    }

    fn now() -> Option<Timestamp> {
        Some(Timestamp::parse("2026-06-01T00:00:00Z").unwrap())
    }

    fn use_json(args: &UseArgs) -> Result<Value> {
        let mut out = Vec::new();
        use_license(args, &Config::default(), &mut out)?;
        Ok(serde_json::from_slice(&out)?)
    }

    fn transfer_json(args: &TransferArgs) -> Result<Value> {
        let mut out = Vec::new();
        transfer(args, &Config::default(), &mut out)?;
        Ok(serde_json::from_slice(&out)?)
    }

    #[test]
    fn use_counts_and_refuses() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = UseArgs {
            licenses: licenses(&dir),
            key: "K-1".into(),
            now: now(),
        };
        let record = use_json(&args).unwrap();
        assert_eq!(record["current_uses"], 5);
        assert_eq!(record["version"], 1);

        args.key = "K-2".into();
        let err = use_json(&args).unwrap_err();
        assert!(format!("{err:#}").contains("is suspended and cannot be used"));
    }

    #[test]
    fn transfer_to_and_out_of_a_pool() {
        let dir = tempfile::tempdir().unwrap();
        let other = OrganizationId::new();
        let mut args = TransferArgs {
            licenses: licenses(&dir),
            key: "K-1".into(),
            organization: Some(other),
            none: false,
            now: now(),
        };
        let record = transfer_json(&args).unwrap();
        assert_eq!(record["organization_id"], other.to_string());
        assert_eq!(record["state"], "active");

        args.organization = None;
        args.none = true;
        let record = transfer_json(&args).unwrap();
        assert!(record["organization_id"].is_null());
    }

    #[test]
    fn organization_ids_are_parsed() {
        assert!(parse_organization(ORG).is_ok());
        assert!(parse_organization("acme").is_err());
    }
}
