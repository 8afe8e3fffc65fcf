use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tidy_core::ids::RuleId;
use tidy_core::text::slug;

use crate::atomic::AtomicJsonFile;
use crate::error::StoreError;

/// On-disk shape of one ignore rule. The normalized form is derived on load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: RuleId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Ignore rules for a single zone, stored as an ordered JSON array.
#[derive(Debug, Clone)]
pub struct RuleStore {
    file: AtomicJsonFile<Vec<RuleRecord>>,
}

impl RuleStore {
    pub fn new(data_dir: &Path, zone: &str) -> Self {
        Self::at(data_dir.join(format!("ignore_rules_{}.json", slug(zone))))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            file: AtomicJsonFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn load(&self) -> Vec<RuleRecord> {
        self.file.load()
    }

    pub fn try_save(&self, rules: &[RuleRecord]) -> Result<(), StoreError> {
        self.file.try_save(&rules.to_vec())
    }

    pub fn save(&self, rules: &[RuleRecord]) -> bool {
        self.file.save(&rules.to_vec())
    }
}
