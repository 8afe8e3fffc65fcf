use std::path::{Path, PathBuf};

use tidy_core::task::ZoneState;
use tidy_core::text::slug;

use crate::atomic::AtomicJsonFile;
use crate::error::StoreError;

/// Tracked tasks and last score for a single zone.
#[derive(Debug, Clone)]
pub struct ZoneStateStore {
    file: AtomicJsonFile<ZoneState>,
}

impl ZoneStateStore {
    pub fn new(data_dir: &Path, zone: &str) -> Self {
        Self::at(data_dir.join(format!("zone_state_{}.json", slug(zone))))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            file: AtomicJsonFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn load(&self) -> ZoneState {
        self.file.load()
    }

    pub fn try_save(&self, state: &ZoneState) -> Result<(), StoreError> {
        self.file.try_save(state)
    }

    pub fn save(&self, state: &ZoneState) -> bool {
        self.file.save(state)
    }
}
