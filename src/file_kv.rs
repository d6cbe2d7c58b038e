// File-backed key/value store: one JSON file per key

use crate::kv::{KeyValueStore, validate_key};
use eyre::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

const CURRENT_VERSION: u32 = 1;

/// Key/value store keeping each key in `<dir>/<key>.json`
pub struct FileKv {
    base_path: PathBuf,
}

impl FileKv {
    /// Open or create a store rooted at `dir`
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let base_path = dir.as_ref().to_path_buf();

        fs::create_dir_all(&base_path).context("Failed to create data directory")?;

        let kv = Self { base_path };
        kv.write_version()?;
        Ok(kv)
    }

    /// Get the base path of this store
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }

    fn lock_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.lock", key))
    }

    fn write_version(&self) -> Result<()> {
        let version_path = self.base_path.join(".version");
        if !version_path.exists() {
            fs::write(version_path, CURRENT_VERSION.to_string())?;
        }
        Ok(())
    }

    fn open_lock(&self, key: &str) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path(key))
            .context("Failed to open lock file")
    }
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let path = self.value_path(key);

        if !path.exists() {
            return Ok(None);
        }

        let lock = self.open_lock(key)?;
        lock.lock_shared().context("Failed to acquire shared lock")?;

        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(content))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.value_path(key);
        let tmp_path = self.base_path.join(format!("{}.json.tmp", key));

        // Lock is released when `lock` is dropped
        let lock = self.open_lock(key)?;
        lock.lock_exclusive().context("Failed to acquire file lock")?;

        let mut tmp = File::create(&tmp_path).context("Failed to create temp file")?;
        tmp.write_all(value.as_bytes())?;
        tmp.sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, &path).with_context(|| format!("Failed to replace {}", path.display()))?;

        debug!(key, bytes = value.len(), "Wrote value to file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("data");

        let kv = FileKv::open(&dir).unwrap();
        assert!(dir.exists());
        assert!(dir.join(".version").exists());
        assert_eq!(kv.base_path(), dir.as_path());
    }

    #[test]
    fn test_get_missing_key() {
        let temp = TempDir::new().unwrap();
        let kv = FileKv::open(temp.path()).unwrap();
        assert_eq!(kv.get("todo-bloom-items").unwrap(), None);
    }

    #[test]
    fn test_set_and_get() {
        let temp = TempDir::new().unwrap();
        let mut kv = FileKv::open(temp.path()).unwrap();

        kv.set("todo-bloom-items", r#"[{"id":"a"}]"#).unwrap();
        assert_eq!(kv.get("todo-bloom-items").unwrap().as_deref(), Some(r#"[{"id":"a"}]"#));

        let on_disk = fs::read_to_string(temp.path().join("todo-bloom-items.json")).unwrap();
        assert_eq!(on_disk, r#"[{"id":"a"}]"#);
        assert!(!temp.path().join("todo-bloom-items.json.tmp").exists());
    }

    #[test]
    fn test_set_overwrites() {
        let temp = TempDir::new().unwrap();
        let mut kv = FileKv::open(temp.path()).unwrap();

        kv.set("k", "first value that is longer").unwrap();
        kv.set("k", "second").unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_value_survives_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let mut kv = FileKv::open(temp.path()).unwrap();
            kv.set("k", "persisted").unwrap();
        }

        let kv = FileKv::open(temp.path()).unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("persisted"));
    }

    #[test]
    fn test_keys_are_independent() {
        let temp = TempDir::new().unwrap();
        let mut kv = FileKv::open(temp.path()).unwrap();

        kv.set("a", "1").unwrap();
        kv.set("b", "2").unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(kv.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let temp = TempDir::new().unwrap();
        let mut kv = FileKv::open(temp.path()).unwrap();
        assert!(kv.set("../outside", "x").is_err());
        assert!(kv.get("a/b").is_err());
    }
}
