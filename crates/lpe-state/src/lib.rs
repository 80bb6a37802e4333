//! # lpe-state — License Lifecycle State Machine
//!
//! Validates that a requested lifecycle action is legal from a license's
//! current state and computes the resulting record.
//!
//! ## States
//!
//! ```text
//!             activate                 suspend
//! Inactive ─────────────▶ Active ─────────────▶ Suspended
//!    ▲    ◀─────────────   │ ▲  ◀───────────────────┘
//!    │      deactivate     │ │       activate
//!    │                     │ │
//!    └──── upgrade ────────┘ └── upgrade / downgrade (self loop)
//!
//! any state ── now > expiration_date ──▶ Expired ── activate + renewal ──▶ Active
//! ```
//!
//! ## Design
//!
//! Every operation takes the record by reference and returns a new record,
//! so a rejected transition leaves the caller's value untouched. The clock
//! is always passed in; nothing here reads the system time.
//!
//! Expiry is applied before the requested action. [`expire_if_due()`] exposes
//! that step on its own so callers can persist an expiry even when the
//! action that followed it is rejected.

pub mod command;
pub mod lifecycle;

pub use command::{LifecycleAction, LifecycleCommand};
pub use lifecycle::{
    apply, effective_state, expire_if_due, next_state, Transition, TransitionError,
    TransitionRecord,
};
