//! One JSON file per slot in a directory.

use crate::{
    check_slot_id, decode, encode, sort_summaries, SaveEnvelope, SaveStore, SlotSummary,
    StoreError,
};
use league_core::{Career, CareerId};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory below the platform data directory used when nothing else is configured.
pub const DEFAULT_SAVE_DIR: &str = "touchline/saves";

/// File-backed store. Writes go to a temporary file that is synced and renamed over the slot.
#[derive(Clone, Debug)]
pub struct FsStore {
    root: PathBuf,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn write_synced(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let mut file = File::create(path).map_err(io_err(path))?;
    file.write_all(data).map_err(io_err(path))?;
    file.flush().map_err(io_err(path))?;
    file.sync_all().map_err(io_err(path))
}

impl FsStore {
    /// Store rooted at `root`; the directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default location under the user's data directory.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_SAVE_DIR)
    }

    /// Directory holding the slots.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn slot_path(&self, id: &CareerId) -> Result<PathBuf, StoreError> {
        check_slot_id(id)?;
        Ok(self.root.join(format!("{}.json", id.as_str())))
    }

    fn read_envelope(&self, id: &CareerId) -> Result<SaveEnvelope, StoreError> {
        let path = self.slot_path(id)?;
        if !path.exists() {
            return Err(StoreError::NotFound(id.clone()));
        }
        let text = fs::read_to_string(&path).map_err(io_err(&path))?;
        decode(id, &text)
    }
}

impl SaveStore for FsStore {
    fn list(&self) -> Result<Vec<SlotSummary>, StoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(io_err(&self.root))? {
            let entry = entry.map_err(io_err(&self.root))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.read_envelope(&CareerId::from(stem)) {
                Ok(env) => out.push(env.summary()),
                Err(err) => warn!(path = %path.display(), %err, "skipping unreadable save"),
            }
        }
        sort_summaries(&mut out);
        Ok(out)
    }

    fn read(&self, id: &CareerId) -> Result<Career, StoreError> {
        let env = self.read_envelope(id)?;
        debug!(career = %id, revision = env.career.meta.revision, "career loaded");
        Ok(env.career)
    }

    fn write(&self, career: &Career) -> Result<SlotSummary, StoreError> {
        let path = self.slot_path(&career.meta.id)?;
        fs::create_dir_all(&self.root).map_err(io_err(&self.root))?;
        let envelope = SaveEnvelope::new(career.clone());
        let data = encode(&envelope)?;

        let temp = path.with_extension("json.tmp");
        let written = write_synced(&temp, data.as_bytes())
            .and_then(|()| fs::rename(&temp, &path).map_err(io_err(&path)));
        if let Err(err) = written {
            if let Err(cleanup) = fs::remove_file(&temp) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %temp.display(), error = %cleanup, "temporary file left behind");
                }
            }
            return Err(err);
        }

        debug!(career = %career.meta.id, bytes = data.len(), "slot written");
        Ok(envelope.summary())
    }

    fn delete(&self, id: &CareerId) -> Result<(), StoreError> {
        let path = self.slot_path(id)?;
        if !path.exists() {
            return Err(StoreError::NotFound(id.clone()));
        }
        fs::remove_file(&path).map_err(io_err(&path))?;
        info!(career = %id, "slot deleted");
        Ok(())
    }

    fn exists(&self, id: &CareerId) -> bool {
        self.slot_path(id).map(|p| p.exists()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::career;
    use tempfile::tempdir;

    #[test]
    fn round_trip_is_deep_equal() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path().join("saves"));
        let c = career("c-0001", "First");
        let summary = store.write(&c).unwrap();
        assert_eq!(summary.name, "First");
        assert!(store.exists(&c.meta.id));
        assert_eq!(store.read(&c.meta.id).unwrap(), c);
        assert!(!dir.path().join("saves/c-0001.json.tmp").exists());
    }

    #[test]
    fn list_skips_garbage_and_orders_by_save_time() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path());
        store.write(&career("c-a", "A")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.write(&career("c-b", "B")).unwrap();
        fs::write(dir.path().join("c-broken.json"), "{").unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        let list = store.list().unwrap();
        let ids: Vec<&str> = list.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["c-b", "c-a"]);
    }

    #[test]
    fn missing_and_deleted_slots() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let id = CareerId::from("c-gone");
        assert!(matches!(store.read(&id), Err(StoreError::NotFound(_))));
        assert!(store.list().unwrap().is_empty());
        store.write(&career("c-gone", "Gone")).unwrap();
        store.delete(&id).unwrap();
        assert!(!store.exists(&id));
        assert!(matches!(store.delete(&id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn overwrite_replaces_the_slot() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let mut c = career("c-1", "One");
        store.write(&c).unwrap();
        c.meta.revision = 5;
        store.write(&c).unwrap();
        assert_eq!(store.read(&c.meta.id).unwrap().meta.revision, 5);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn failed_rename_removes_the_temporary_file() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let blocker = dir.path().join("c-blocked.json");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), "x").unwrap();

        let err = store.write(&career("c-blocked", "Blocked")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(!dir.path().join("c-blocked.json.tmp").exists());
        assert!(blocker.join("keep").exists());
    }
}
