use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

/// A JSON document on disk, replaced wholesale on every save.
///
/// Writes go to a sibling `.tmp` file which is fsynced and then renamed over
/// the target, so a concurrent reader sees either the old or the new content
/// and never a torn write. One writer per file is assumed.
#[derive(Debug, Clone)]
pub struct AtomicJsonFile<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AtomicJsonFile<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }

    pub fn try_save(&self, value: &T) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let payload = serde_json::to_vec_pretty(value)?;
        let temp = self.temp_path();

        let written = (|| -> Result<(), StoreError> {
            let mut file = File::create(&temp)?;
            file.write_all(&payload)?;
            file.sync_all()?;
            fs::rename(&temp, &self.path)?;
            Ok(())
        })();

        if written.is_err() {
            let _ = fs::remove_file(&temp);
        }
        written
    }

    /// Boolean form of [`try_save`](Self::try_save); failures are logged.
    pub fn save(&self, value: &T) -> bool {
        match self.try_save(value) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "atomic save failed");
                false
            }
        }
    }

    /// `Ok(None)` when the file does not exist.
    pub fn try_load(&self) -> Result<Option<T>, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    /// Never fails: a missing, unreadable or corrupt file yields `T::default()`.
    pub fn load(&self) -> T {
        match self.try_load() {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "unreadable data file, starting empty"
                );
                T::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_in(dir: &tempfile::TempDir, name: &str) -> AtomicJsonFile<Vec<String>> {
        AtomicJsonFile::new(dir.path().join(name))
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = file_in(&dir, "items.json");
        assert!(file.save(&vec!["a".to_string(), "b".to_string()]));
        assert_eq!(file.load(), vec!["a", "b"]);
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let file = file_in(&dir, "absent.json");
        assert!(file.try_load().unwrap().is_none());
        assert!(file.load().is_empty());
    }

    #[test]
    fn corrupt_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let file = file_in(&dir, "broken.json");
        fs::write(file.path(), b"{not json").unwrap();
        assert!(file.try_load().is_err());
        assert!(file.load().is_empty());
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file: AtomicJsonFile<Vec<String>> =
            AtomicJsonFile::new(dir.path().join("nested/deeper/items.json"));
        assert!(file.save(&vec!["x".to_string()]));
        assert_eq!(file.load(), vec!["x"]);
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let file = file_in(&dir, "items.json");
        assert!(file.save(&vec!["a".to_string()]));
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["items.json"]);
    }

    #[test]
    fn failed_save_keeps_prior_content() {
        let dir = tempfile::tempdir().unwrap();
        let file = file_in(&dir, "items.json");
        assert!(file.save(&vec!["old".to_string()]));

        // Occupy the temp slot with a directory so the write cannot start.
        fs::create_dir(dir.path().join(".items.json.tmp")).unwrap();
        assert!(!file.save(&vec!["new".to_string()]));
        assert_eq!(file.load(), vec!["old"]);
    }
}
