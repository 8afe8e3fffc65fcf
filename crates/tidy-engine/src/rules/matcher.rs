use super::IgnoreRule;

/// Case-insensitive substring matching. Not word-boundary aware: the rule
/// "bed" matches "Clean the bedroom".
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleMatcher;

impl RuleMatcher {
    /// First rule whose normalized text occurs in `description`.
    pub fn find<'a>(&self, description: &str, rules: &'a [IgnoreRule]) -> Option<&'a IgnoreRule> {
        if rules.is_empty() {
            return None;
        }
        let haystack = description.to_lowercase();
        rules
            .iter()
            .find(|r| !r.normalized.is_empty() && haystack.contains(&r.normalized))
    }

    pub fn matches(&self, description: &str, rules: &[IgnoreRule]) -> bool {
        self.find(description, rules).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tidy_core::ids::RuleId;
    use tidy_core::text::normalize;

    fn rules(texts: &[&str]) -> Vec<IgnoreRule> {
        texts
            .iter()
            .map(|t| IgnoreRule {
                id: RuleId::new(),
                text: (*t).into(),
                normalized: normalize(t),
                created_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn empty_rule_set_never_matches() {
        assert!(!RuleMatcher.matches("Clean dirty dishes", &[]));
        assert!(!RuleMatcher.matches("", &[]));
    }

    #[test]
    fn case_insensitive_substring() {
        let set = rules(&["Dirty Dishes"]);
        assert!(RuleMatcher.matches("Clean DIRTY DISHES on counter", &set));
        assert!(!RuleMatcher.matches("Sweep floor", &set));
    }

    #[test]
    fn any_rule_suffices() {
        let set = rules(&["mail", "coffee mug"]);
        let hit = RuleMatcher.find("Put the coffee mug away", &set).unwrap();
        assert_eq!(hit.normalized, "coffee mug");
    }

    #[test]
    fn no_word_boundaries() {
        let set = rules(&["bed"]);
        assert!(RuleMatcher.matches("Vacuum the bedroom rug", &set));
    }
}
