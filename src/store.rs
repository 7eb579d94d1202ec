//! Durable status store.
//!
//! The snapshot file is the only contract between the engine and the
//! external dashboard: a single JSON document, rewritten in full after every
//! attempt. The writer is the lone mutator; the dashboard polls read-only.
//! Each rewrite goes to a temp file in the same directory and is renamed
//! into place, so a reader never observes a torn write. A missing or
//! unparsable file reads as "no data yet", never as a hard error.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::StatusSnapshot;
use crate::error::{Result, SendrError};

/// Read/write access to the snapshot file.
pub struct StatusStore {
    path: PathBuf,
}

impl StatusStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current snapshot.
    ///
    /// Returns `None` when the file is absent or does not parse: a reader
    /// racing a rewrite must treat either as "no data yet".
    pub fn load(&self) -> Option<StatusSnapshot> {
        if !self.path.exists() {
            return None;
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("status file unreadable ({}): {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                log::warn!("status file malformed ({}): {}", self.path.display(), e);
                None
            }
        }
    }

    /// Rewrite the snapshot atomically: temp file in the same directory,
    /// then rename over the target.
    pub fn save(&self, snapshot: &StatusSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            SendrError::Storage(format!(
                "failed to publish snapshot at {}: {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "status".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Batch, DeliveryStatus, Recipient};
    use tempfile::TempDir;

    fn sample_batch() -> Batch {
        Batch::new(
            vec![Recipient::new("alpha"), Recipient::new("beta")],
            "hello",
        )
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let temp = TempDir::new().unwrap();
        let store = StatusStore::new(temp.path().join("send_status.json"));
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = StatusStore::new(temp.path().join("send_status.json"));

        let snapshot = StatusSnapshot::from_batch(&sample_batch());
        store.save(&snapshot).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_malformed_file_loads_as_none() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("send_status.json");
        fs::write(&path, "{\"items\": [tru").unwrap();

        let store = StatusStore::new(&path);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_rewrite_replaces_previous_content() {
        let temp = TempDir::new().unwrap();
        let store = StatusStore::new(temp.path().join("send_status.json"));

        let mut snapshot = StatusSnapshot::from_batch(&sample_batch());
        store.save(&snapshot).unwrap();

        snapshot.mark(0, DeliveryStatus::Success);
        store.save(&snapshot).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.items[0].status, DeliveryStatus::Success);
        assert_eq!(loaded.items[1].status, DeliveryStatus::Pending);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let temp = TempDir::new().unwrap();
        let store = StatusStore::new(temp.path().join("send_status.json"));
        store
            .save(&StatusSnapshot::from_batch(&sample_batch()))
            .unwrap();

        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_persistence_across_instances() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("send_status.json");

        {
            let store = StatusStore::new(&path);
            store
                .save(&StatusSnapshot::from_batch(&sample_batch()))
                .unwrap();
        }

        {
            let store = StatusStore::new(&path);
            let loaded = store.load().unwrap();
            assert_eq!(loaded.items.len(), 2);
        }
    }

    #[test]
    fn test_creates_parent_directory() {
        let temp = TempDir::new().unwrap();
        let store = StatusStore::new(temp.path().join("nested").join("status.json"));
        store
            .save(&StatusSnapshot::from_batch(&sample_batch()))
            .unwrap();
        assert!(store.load().is_some());
    }
}
