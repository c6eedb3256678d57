//! tableserve-decision — per-stage decision makers for partition serving.
//!
//! For every served table partition, once per reconciliation tick, the
//! outer driver compares the observed current state against the desired
//! target state and asks this crate which single operation should run
//! next. Everything here is pure: no I/O, no blocking, no shared mutable
//! state.
//!
//! # Architecture
//!
//! ```text
//! DecisionChain
//!   ├── InitDecision     (does the entity exist yet?)
//!   ├── DeployDecision   (is the target version on disk?)
//!   └── LoadDecision     (is the target version/role/config served?)
//! RemoveDecision         (separate intent: tear-down)
//! ```
//!
//! Each stage except init is a [`StateMachine`] instance: a
//! `(state, event) -> action` table with a default, populated by an
//! explicit builder function. The chain returns the first non-`None`
//! stage result.

pub mod chain;
pub mod deploy;
pub mod init;
pub mod load;
pub mod machine;
pub mod remove;

pub use chain::DecisionChain;
pub use deploy::{DeployDecision, DeployEvent};
pub use init::InitDecision;
pub use load::{LoadDecision, LoadEvent};
pub use machine::StateMachine;
pub use remove::RemoveDecision;
