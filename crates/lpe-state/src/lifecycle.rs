//! # Lifecycle Transitions
//!
//! The transition table, the clock-driven expiry step, and [`apply()`],
//! which combines them with the feature-set and renewal checks.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lpe_core::{FeatureId, LicenseRecord, LicenseState, Timestamp};

use crate::command::{LifecycleAction, LifecycleCommand};

// ─── Errors ──────────────────────────────────────────────────────────

/// Why a lifecycle command was refused. The input record is unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The action is not legal from the license's effective state.
    #[error("illegal transition: cannot {action} a license that is {state}")]
    IllegalTransition {
        /// Requested action.
        action: LifecycleAction,
        /// Effective state, after expiry.
        state: LicenseState,
    },

    /// An upgrade would drop features.
    #[error("upgrade must not remove features: {}", join(.missing))]
    FeatureSetNotExpanded {
        /// Features present now but absent from the requested set.
        missing: Vec<FeatureId>,
    },

    /// A downgrade would add features.
    #[error("downgrade must not add features: {}", join(.added))]
    FeatureSetNotReduced {
        /// Features absent now but present in the requested set.
        added: Vec<FeatureId>,
    },

    /// The renewed expiration date is not after `now`.
    #[error("renewed expiration {expiration} is not after {now}")]
    RenewalNotInFuture {
        /// Requested expiration date.
        expiration: Timestamp,
        /// Clock at the time of the request.
        now: Timestamp,
    },
}

fn join(ids: &[FeatureId]) -> String {
    ids.iter()
        .map(FeatureId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

// ─── Transition Records ──────────────────────────────────────────────

/// Record of one state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// State before.
    pub from_state: LicenseState,
    /// State after.
    pub to_state: LicenseState,
    /// What caused it.
    pub action: LifecycleAction,
    /// Clock at the time of the change.
    pub timestamp: Timestamp,
    /// Free-form reason, when one was given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A successful [`apply()`].
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// The resulting record. `version` is left for the store to bump.
    pub record: LicenseRecord,
    /// Expiry applied before the action, if the license was due.
    pub expiry: Option<TransitionRecord>,
    /// The requested change.
    pub change: TransitionRecord,
}

impl Transition {
    /// Every state change in order: expiry first, then the action.
    pub fn records(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.expiry.iter().chain(std::iter::once(&self.change))
    }
}

// ─── Table ───────────────────────────────────────────────────────────

/// The state `action` leads to from `state`, or `None` when illegal.
///
/// Reactivating an expired license is listed here but additionally needs a
/// renewed expiration date, which [`apply()`] checks.
pub fn next_state(state: LicenseState, action: LifecycleAction) -> Option<LicenseState> {
    use LicenseState::{Active, Expired, Inactive, Suspended};
    use LifecycleAction as A;

    match (state, action) {
        (Inactive | Suspended | Expired, A::Activate) => Some(Active),
        (Active, A::Deactivate) => Some(Inactive),
        (Active, A::Suspend) => Some(Suspended),
        (Active | Inactive, A::Upgrade) => Some(Active),
        (Active, A::Downgrade) => Some(Active),
        (Inactive | Active | Suspended, A::Expire) => Some(Expired),
        _ => None,
    }
}

/// The state of `record` once the clock is taken into account.
pub fn effective_state(record: &LicenseRecord, now: Timestamp) -> LicenseState {
    if record.is_expired_at(now) {
        LicenseState::Expired
    } else {
        record.state
    }
}

/// Move `record` to `Expired` if its expiration date lies before `now`.
///
/// Returns `None` when nothing changes: no expiration date, not yet due, or
/// already expired.
pub fn expire_if_due(record: &LicenseRecord, now: Timestamp) -> Option<(LicenseRecord, TransitionRecord)> {
    if record.state == LicenseState::Expired || !record.is_expired_at(now) {
        return None;
    }
    let mut next = record.clone();
    next.state = LicenseState::Expired;
    let change = TransitionRecord {
        from_state: record.state,
        to_state: LicenseState::Expired,
        action: LifecycleAction::Expire,
        timestamp: now,
        reason: record
            .expiration_date
            .map(|exp| format!("expiration date {exp} passed")),
    };
    tracing::info!(license_id = %record.id, from = %record.state, "license expired");
    Some((next, change))
}

// ─── Apply ───────────────────────────────────────────────────────────

/// Apply `command` to `record` at `now`.
///
/// Expiry is applied first; the command is then checked against the
/// effective state.
///
/// # Errors
///
/// Returns [`TransitionError`] if the action is illegal from the effective
/// state, if reactivating an expired license lacks a future expiration date,
/// or if a feature set is not a superset (upgrade) or subset (downgrade) of
/// the current one.
pub fn apply(
    record: &LicenseRecord,
    command: LifecycleCommand,
    now: Timestamp,
) -> Result<Transition, TransitionError> {
    match transition(record, command, now) {
        Ok(t) => {
            tracing::info!(
                license_id = %record.id,
                action = %t.change.action,
                from = %t.change.from_state,
                to = %t.change.to_state,
                "lifecycle transition applied"
            );
            Ok(t)
        }
        Err(e) => {
            tracing::warn!(license_id = %record.id, error = %e, "lifecycle transition rejected");
            Err(e)
        }
    }
}

fn transition(
    record: &LicenseRecord,
    command: LifecycleCommand,
    now: Timestamp,
) -> Result<Transition, TransitionError> {
    let (mut working, expiry) = match expire_if_due(record, now) {
        Some((expired, change)) => (expired, Some(change)),
        None => (record.clone(), None),
    };
    let from = working.state;
    let action = command.action();
    let illegal = TransitionError::IllegalTransition {
        action,
        state: from,
    };
    let Some(to) = next_state(from, action) else {
        return Err(illegal);
    };

    let mut reason = None;
    match command {
        LifecycleCommand::Activate { renewed_expiration } => match renewed_expiration {
            Some(expiration) if expiration <= now => {
                return Err(TransitionError::RenewalNotInFuture { expiration, now });
            }
            Some(expiration) => {
                working.expiration_date = Some(expiration);
                reason = Some(format!("renewed until {expiration}"));
            }
            None if from == LicenseState::Expired => return Err(illegal),
            None => {}
        },
        LifecycleCommand::Deactivate => {}
        LifecycleCommand::Upgrade { features } => {
            if let Some(features) = features {
                let missing: Vec<FeatureId> =
                    working.features.difference(&features).cloned().collect();
                if !missing.is_empty() {
                    return Err(TransitionError::FeatureSetNotExpanded { missing });
                }
                working.features = features;
            }
        }
        LifecycleCommand::Downgrade { features } => {
            if let Some(features) = features {
                let added: Vec<FeatureId> =
                    features.difference(&working.features).cloned().collect();
                if !added.is_empty() {
                    return Err(TransitionError::FeatureSetNotReduced { added });
                }
                working.features = features;
            }
        }
        LifecycleCommand::Suspend { reason: why } => reason = Some(why),
    }

    working.state = to;
    Ok(Transition {
        record: working,
        expiry,
        change: TransitionRecord {
            from_state: from,
            to_state: to,
            action,
            timestamp: now,
            reason,
        },
    })
}
