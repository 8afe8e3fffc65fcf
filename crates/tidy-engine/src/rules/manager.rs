use chrono::Utc;
use tidy_core::ids::RuleId;
use tidy_store::RuleStore;
use tracing::{debug, info, warn};

use super::matcher::RuleMatcher;
use super::validator::{RuleRejection, RuleValidator};
use super::IgnoreRule;

/// Owns one zone's ignore rules. Every mutation is written through to the
/// zone's rule file when a store is attached.
#[derive(Debug)]
pub struct IgnoreRulesManager {
    rules: Vec<IgnoreRule>,
    validator: RuleValidator,
    matcher: RuleMatcher,
    store: Option<RuleStore>,
}

impl IgnoreRulesManager {
    /// Loads existing rules from `store`.
    pub fn new(store: RuleStore) -> Self {
        let mut manager = Self {
            rules: Vec::new(),
            validator: RuleValidator::default(),
            matcher: RuleMatcher,
            store: Some(store),
        };
        manager.load_rules();
        manager
    }

    /// Rules that live only as long as the manager.
    pub fn in_memory() -> Self {
        Self {
            rules: Vec::new(),
            validator: RuleValidator::default(),
            matcher: RuleMatcher,
            store: None,
        }
    }

    /// Replaces the in-memory list with the stored one. Records that would
    /// fail validation (blank, oversized, repeated) are dropped.
    pub fn load_rules(&mut self) -> usize {
        let Some(store) = &self.store else {
            return self.rules.len();
        };
        let mut loaded: Vec<IgnoreRule> = Vec::new();
        for record in store.load() {
            match self.validator.validate(&record.text, &loaded) {
                Ok(_) => loaded.push(IgnoreRule::from_record(record)),
                Err(e) => warn!(rule_id = %record.id, error = %e, "skipping stored rule"),
            }
        }
        debug!(path = %store.path().display(), count = loaded.len(), "rules loaded");
        self.rules = loaded;
        self.rules.len()
    }

    /// Writes the full list. False when the write failed; the in-memory
    /// list is kept either way.
    pub fn save_rules(&self) -> bool {
        match &self.store {
            Some(store) => {
                let records: Vec<_> = self.rules.iter().map(IgnoreRule::to_record).collect();
                store.save(&records)
            }
            None => true,
        }
    }

    pub fn try_add_rule(&mut self, text: &str) -> Result<&IgnoreRule, RuleRejection> {
        let normalized = self.validator.validate(text, &self.rules)?;
        self.rules.push(IgnoreRule {
            id: RuleId::new(),
            text: text.trim().to_string(),
            normalized,
            created_at: Utc::now(),
        });
        if !self.save_rules() {
            warn!("rule kept in memory; will persist with the next successful save");
        }
        let added = &self.rules[self.rules.len() - 1];
        info!(rule_id = %added.id, rule = %added.normalized, "ignore rule added");
        Ok(added)
    }

    /// False when the text is blank, too long, or already covered.
    pub fn add_rule(&mut self, text: &str) -> bool {
        match self.try_add_rule(text) {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "ignore rule rejected");
                false
            }
        }
    }

    pub fn remove_rule(&mut self, id: &str) -> bool {
        let Some(pos) = self.rules.iter().position(|r| r.id.as_str() == id) else {
            return false;
        };
        let removed = self.rules.remove(pos);
        if !self.save_rules() {
            warn!("rule removal kept in memory; will persist with the next successful save");
        }
        info!(rule_id = %removed.id, "ignore rule removed");
        true
    }

    pub fn should_ignore_task(&self, description: &str) -> bool {
        self.matcher.matches(description, &self.rules)
    }

    /// Splits candidates into `(kept, ignored)`, preserving order.
    pub fn filter(&self, tasks: Vec<String>) -> (Vec<String>, Vec<String>) {
        tasks
            .into_iter()
            .partition(|t| !self.should_ignore_task(t))
    }

    pub fn rules(&self) -> &[IgnoreRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn store_in(dir: &std::path::Path) -> RuleStore {
        RuleStore::new(dir, "kitchen")
    }

    #[test]
    fn add_then_duplicate_is_rejected() {
        let mut rules = IgnoreRulesManager::in_memory();
        assert!(rules.add_rule("Dirty dishes"));
        assert!(!rules.add_rule("  DIRTY DISHES "));
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn invalid_text_leaves_list_unchanged() {
        let mut rules = IgnoreRulesManager::in_memory();
        assert!(!rules.add_rule("   "));
        assert!(!rules.add_rule(&"a".repeat(501)));
        assert!(rules.is_empty());
    }

    #[test]
    fn remove_unknown_id_is_false() {
        let mut rules = IgnoreRulesManager::in_memory();
        assert!(rules.add_rule("mail"));
        assert!(!rules.remove_rule("rule_missing"));
        assert_eq!(rules.len(), 1);

        let id = rules.rules()[0].id.to_string();
        assert!(rules.remove_rule(&id));
        assert!(rules.is_empty());
    }

    #[test]
    fn filter_partitions_candidates() {
        let mut rules = IgnoreRulesManager::in_memory();
        assert!(rules.add_rule("dirty dishes"));
        let (kept, ignored) = rules.filter(vec![
            "Clean dirty dishes on counter".into(),
            "Sweep floor".into(),
        ]);
        assert_eq!(kept, vec!["Sweep floor"]);
        assert_eq!(ignored, vec!["Clean dirty dishes on counter"]);
    }

    #[test]
    fn mutations_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut rules = IgnoreRulesManager::new(store_in(dir.path()));
            assert!(rules.add_rule("coffee mug"));
            assert!(rules.add_rule("mail"));
        }
        let reloaded = IgnoreRulesManager::new(store_in(dir.path()));
        let texts: Vec<_> = reloaded.rules().iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["coffee mug", "mail"]);
        assert!(reloaded.should_ignore_task("Put away the MAIL"));
    }

    #[test]
    fn corrupt_rule_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        fs::write(store.path(), "{ not json").unwrap();
        let rules = IgnoreRulesManager::new(store);
        assert!(rules.is_empty());
        assert!(!rules.should_ignore_task("anything"));
    }

    #[test]
    fn failed_save_keeps_prior_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut rules = IgnoreRulesManager::new(store_in(dir.path()));
        assert!(rules.add_rule("dirty dishes"));

        // A directory squatting on the temp path makes the write fail even as root.
        fs::create_dir(dir.path().join(".ignore_rules_kitchen.json.tmp")).unwrap();
        assert!(rules.add_rule("mail"));
        assert!(!rules.save_rules());
        assert_eq!(rules.len(), 2);

        let on_disk = store_in(dir.path()).load();
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk[0].text, "dirty dishes");
    }

    #[test]
    fn stored_duplicates_are_dropped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let now = Utc::now();
        let records = vec![
            tidy_store::RuleRecord {
                id: RuleId::new(),
                text: "Mail".into(),
                created_at: now,
            },
            tidy_store::RuleRecord {
                id: RuleId::new(),
                text: "mail ".into(),
                created_at: now,
            },
        ];
        assert!(store.save(&records));
        assert_eq!(IgnoreRulesManager::new(store).len(), 1);
    }
}
