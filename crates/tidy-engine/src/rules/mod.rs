//! Per-zone ignore rules: phrases whose presence in a task description
//! suppresses that task before it reaches the task list.

pub mod manager;
pub mod matcher;
pub mod validator;

use chrono::{DateTime, Utc};
use tidy_core::ids::RuleId;
use tidy_core::text::normalize;
use tidy_store::RuleRecord;

pub use manager::IgnoreRulesManager;
pub use matcher::RuleMatcher;
pub use validator::{RuleRejection, RuleValidator};

/// Longest accepted rule, in characters, after normalization.
pub const MAX_RULE_LEN: usize = 500;

#[derive(Clone, Debug, PartialEq)]
pub struct IgnoreRule {
    pub id: RuleId,
    pub text: String,
    /// Trimmed, lower-cased `text`; the matching key.
    pub normalized: String,
    pub created_at: DateTime<Utc>,
}

impl IgnoreRule {
    pub fn from_record(record: RuleRecord) -> Self {
        let normalized = normalize(&record.text);
        Self {
            id: record.id,
            text: record.text,
            normalized,
            created_at: record.created_at,
        }
    }

    pub fn to_record(&self) -> RuleRecord {
        RuleRecord {
            id: self.id.clone(),
            text: self.text.clone(),
            created_at: self.created_at,
        }
    }
}
