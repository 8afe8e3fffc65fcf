use tidy_core::text::normalize;

use super::{IgnoreRule, MAX_RULE_LEN};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RuleRejection {
    #[error("rule text is empty")]
    Empty,
    #[error("rule text exceeds {max} characters ({len})")]
    TooLong { len: usize, max: usize },
    #[error("duplicate rule: {0}")]
    Duplicate(String),
}

/// Accepts or rejects candidate rule text against the zone's current rules.
#[derive(Clone, Copy, Debug)]
pub struct RuleValidator {
    max_len: usize,
}

impl Default for RuleValidator {
    fn default() -> Self {
        Self {
            max_len: MAX_RULE_LEN,
        }
    }
}

impl RuleValidator {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    /// Returns the normalized form on acceptance.
    pub fn validate(&self, text: &str, existing: &[IgnoreRule]) -> Result<String, RuleRejection> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return Err(RuleRejection::Empty);
        }
        let len = normalized.chars().count();
        if len > self.max_len {
            return Err(RuleRejection::TooLong {
                len,
                max: self.max_len,
            });
        }
        if existing.iter().any(|r| r.normalized == normalized) {
            return Err(RuleRejection::Duplicate(normalized));
        }
        Ok(normalized)
    }
}
