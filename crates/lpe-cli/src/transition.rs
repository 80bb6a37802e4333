//! # Transition Subcommand
//!
//! Applies one lifecycle command to a license directly, bypassing the
//! rules. This is how system-triggered actions such as `suspend` are run.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde_json::json;

use lpe_core::{FeatureId, Timestamp};
use lpe_state::LifecycleCommand;
use lpe_store::{MemoryRuleStore, PolicyService};

use crate::config::Config;
use crate::input::load_licenses;

/// Lifecycle actions accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionArg {
    Activate,
    Deactivate,
    Upgrade,
    Downgrade,
    Suspend,
}

/// Arguments for the transition subcommand.
#[derive(Args, Debug)]
pub struct TransitionArgs {
    /// License file (JSON or YAML).
    #[arg(long)]
    pub licenses: PathBuf,
    /// Key of the license to change.
    #[arg(long)]
    pub key: String,
    /// Lifecycle action.
    #[arg(long, value_enum)]
    pub action: ActionArg,
    /// Reason recorded for a suspension.
    #[arg(long, default_value = "suspended by operator")]
    pub reason: String,
    /// New expiration date when reactivating an expired license.
    #[arg(long, value_parser = crate::parse_timestamp)]
    pub renew_until: Option<Timestamp>,
    /// Feature set after an upgrade or downgrade (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub features: Option<Vec<String>>,
    /// Evaluation clock (RFC 3339 or YYYY-MM-DD). Overrides `LPE_NOW`.
    #[arg(long, value_parser = crate::parse_timestamp)]
    pub now: Option<Timestamp>,
}

impl TransitionArgs {
    fn command(&self) -> LifecycleCommand {
        let features = self
            .features
            .as_ref()
            .map(|list| {
                list.iter()
                    .map(|f| f.trim())
                    .filter(|f| !f.is_empty())
                    .map(FeatureId::new)
                    .collect()
            });
        match self.action {
            ActionArg::Activate => LifecycleCommand::Activate {
                renewed_expiration: self.renew_until,
            },
            ActionArg::Deactivate => LifecycleCommand::Deactivate,
            ActionArg::Upgrade => LifecycleCommand::Upgrade { features },
            ActionArg::Downgrade => LifecycleCommand::Downgrade { features },
            ActionArg::Suspend => LifecycleCommand::Suspend {
                reason: self.reason.clone(),
            },
        }
    }
}

/// Apply the command and print the updated record and transition.
pub fn run(args: &TransitionArgs, config: &Config, out: &mut impl Write) -> Result<()> {
    let store = load_licenses(&args.licenses)?;
    let license = store
        .find_by_key(&args.key)
        .with_context(|| format!("no license with key {:?}", args.key))?;
    let service = PolicyService::new(
        Arc::new(store.clone()),
        Arc::new(MemoryRuleStore::default()),
        Arc::new(store),
    );
    let (record, transition) = service
        .execute(&license.id, args.command(), config.clock(args.now))
        .with_context(|| format!("cannot {:?} license {}", args.action, args.key))?;
    serde_json::to_writer_pretty(
        &mut *out,
        &json!({ "record": record, "transition": transition }),
    )?;
    writeln!(out)?;
    Ok(())
}
