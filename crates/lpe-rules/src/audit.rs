//! # Evaluation Audit Trail
//!
//! Records rule evaluations, action selections, lifecycle transitions and
//! offline activation events so an operator can reconstruct why a license
//! ended up in its current state.
//!
//! Every entry is individually digestable through `CanonicalBytes` and
//! `sha256_digest`. The trail is bounded: once it exceeds its capacity the
//! oldest 10% of entries are dropped.

use serde::{Deserialize, Serialize};

use lpe_core::{sha256_digest, CanonicalBytes, ContentDigest, Timestamp};

// ---------------------------------------------------------------------------
// AuditEntryType
// ---------------------------------------------------------------------------

/// The kind of audited event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntryType {
    /// A rule set was evaluated against a license.
    RuleEvaluated,
    /// A rule matched and its action was selected.
    ActionSelected,
    /// No rule matched.
    NoMatch,
    /// A lifecycle transition was applied.
    TransitionApplied,
    /// A lifecycle transition was refused.
    TransitionRejected,
    /// The clock moved a license to expired.
    LicenseExpired,
    /// One use of a license was recorded.
    UsageRecorded,
    /// A license moved to another organization pool.
    LicenseTransferred,
    /// An offline activation code was issued.
    ActivationIssued,
    /// An offline activation code was decoded successfully.
    ActivationVerified,
    /// An offline activation code failed to decode.
    ActivationRejected,
}

impl AuditEntryType {
    /// Snake-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RuleEvaluated => "rule_evaluated",
            Self::ActionSelected => "action_selected",
            Self::NoMatch => "no_match",
            Self::TransitionApplied => "transition_applied",
            Self::TransitionRejected => "transition_rejected",
            Self::LicenseExpired => "license_expired",
            Self::UsageRecorded => "usage_recorded",
            Self::LicenseTransferred => "license_transferred",
            Self::ActivationIssued => "activation_issued",
            Self::ActivationVerified => "activation_verified",
            Self::ActivationRejected => "activation_rejected",
        }
    }
}

impl std::fmt::Display for AuditEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AuditEntry
// ---------------------------------------------------------------------------

/// One audited event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Event kind.
    pub entry_type: AuditEntryType,
    /// When the event happened, on the caller's clock.
    pub timestamp: Timestamp,
    /// License the event concerns, if any.
    pub license_id: Option<String>,
    /// Structured details. Must not contain floats if a digest is wanted.
    pub metadata: Option<serde_json::Value>,
}

impl AuditEntry {
    /// Create an entry stamped with `timestamp`.
    pub fn new(
        entry_type: AuditEntryType,
        timestamp: Timestamp,
        license_id: Option<String>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            entry_type,
            timestamp,
            license_id,
            metadata,
        }
    }

    /// Content digest of the canonical form of this entry.
    ///
    /// Returns `None` if canonicalization fails (e.g. metadata holds a float).
    pub fn digest(&self) -> Option<ContentDigest> {
        let canonical = match CanonicalBytes::new(self) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(entry_type = %self.entry_type, error = %e, "audit entry canonicalization failed, digest unavailable");
                return None;
            }
        };
        Some(sha256_digest(&canonical))
    }
}

impl PartialEq for AuditEntry {
    fn eq(&self, other: &Self) -> bool {
        self.entry_type == other.entry_type
            && self.license_id == other.license_id
            && self.metadata == other.metadata
    }
}

impl Eq for AuditEntry {}

// ---------------------------------------------------------------------------
// AuditTrail
// ---------------------------------------------------------------------------

/// Bounded, append-only audit trail.
///
/// Not `Sync` on its own; wrap it in a lock to share it.
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
    max_entries: usize,
}

impl AuditTrail {
    /// Default capacity.
    pub const DEFAULT_CAPACITY: usize = 10_000;

    /// A trail holding at most `max_entries` entries (at least one).
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Append an entry, trimming the oldest 10% when over capacity.
    pub fn append(&mut self, entry: AuditEntry) {
        self.entries.push(entry);
        if self.entries.len() > self.max_entries {
            let trim_count = (self.max_entries / 10).max(1);
            self.entries.drain(..trim_count);
        }
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Number of entries held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the trail is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Entries concerning one license.
    pub fn entries_for_license(&self, license_id: &str) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .filter(|e| e.license_id.as_deref() == Some(license_id))
            .collect()
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("entries", &self.entries.len())
            .field("max_entries", &self.max_entries)
            .finish()
    }
}
