//! # lpe-cli — License Policy Engine Command-Line Interface
//!
//! File-driven front end over the in-memory stores and `PolicyService`.
//!
//! ## Subcommands
//!
//! - `evaluate`: run a rule file against a license file, optionally applying
//!   the selected actions
//! - `transition`: apply one lifecycle command directly (e.g. `suspend`)
//! - `use`: record one use of an active license
//! - `transfer`: move a license between organization pools
//! - `encode`: issue the activation code for an offline key
//! - `decode`: verify an activation code offline and re-evaluate rules on it
//!
//! Results are written to stdout as JSON; logs go to stderr.

pub mod account;
pub mod activation;
pub mod config;
pub mod evaluate;
pub mod input;
pub mod transition;

use lpe_core::Timestamp;

/// Clap value parser for timestamp flags.
pub fn parse_timestamp(raw: &str) -> Result<Timestamp, String> {
    Timestamp::parse_flexible(raw).map_err(|e| e.to_string())
}
