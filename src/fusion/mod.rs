//! Update fusion: merges field notifications and polled snapshots into commits.
//!
//! ## Contents
//! - [`FusionEngine`] the reconciliation state machine
//! - [`Commit`], [`CommitSource`] its output, dispatched to channel supervisors
//! - [`Pending`], [`Polled`], [`StuckCounters`] inspectable engine state

mod engine;
mod pending;

pub use engine::{Commit, CommitSource, FusionEngine};
pub use pending::{Pending, Polled, StuckCounters};
