//! tableserve-state — domain types for the tableserve core.
//!
//! Describes one served table partition from the control plane's point of
//! view: its identity, lifecycle status, per-version deploy state, the
//! current/target metadata snapshots the decision layer compares, the
//! schedule policy flags, and the [`TablePartition`] capability contract
//! the execution layer invokes.
//!
//! This crate is pure data: no I/O, no threads, no clocks. The outer
//! driver observes state, builds the snapshots, and feeds them in once per
//! reconciliation tick.

pub mod config;
pub mod partition;
pub mod types;

pub use config::{Context, ScheduleConfig};
pub use partition::TablePartition;
pub use types::*;
