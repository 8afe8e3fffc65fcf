//! # tidy-engine
//!
//! The per-zone pipeline: ignore rules, the analysis cycle that turns a
//! camera snapshot into task-list items, and the orchestrator that runs
//! cycles on schedule or on demand.

#![deny(unsafe_code)]

pub mod cycle;
pub mod error;
pub mod orchestrator;
pub mod rules;
pub mod zone;

pub use cycle::{CyclePhase, CycleReport};
pub use error::CycleError;
pub use orchestrator::{CycleOutcome, Orchestrator, TriggerHandle, TriggerRequest};
pub use rules::{IgnoreRule, IgnoreRulesManager, RuleMatcher, RuleRejection, RuleValidator};
pub use zone::{sender_config, Zone};
