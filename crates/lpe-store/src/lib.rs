//! # lpe-store — Stores and Policy Service
//!
//! The evaluation core is pure; this crate is where it meets state.
//!
//! - **Contracts** (`contracts.rs`): the traits the service depends on:
//!   [`RecordStore`], [`RuleStore`], [`CatalogSource`], [`OfflineLookup`].
//! - **In-memory stores** (`memory.rs`): `parking_lot::RwLock`-backed
//!   implementations with optimistic version checks, for tests, the CLI,
//!   and embedding.
//! - **Service** (`service.rs`): [`PolicyService`] runs the data flow
//!   store → record + rules → engine → state machine → store, and the two
//!   offline flows (offline key → code, code → verdict), recording each step
//!   in an audit trail.
//!
//! A persistent backend implements the four traits and plugs into the same
//! service.

pub mod contracts;
pub mod error;
pub mod memory;
pub mod service;

pub use contracts::{CatalogSource, OfflineLookup, RecordStore, RuleStore};
pub use error::{ServiceError, StoreError};
pub use memory::{MemoryCatalog, MemoryLicenseStore, MemoryRuleStore};
pub use service::{EvaluationOutcome, OfflineVerdict, PolicyService};
