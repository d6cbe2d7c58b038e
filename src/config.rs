// YAML configuration for the todostore CLI

use crate::snapshot::ImportPolicy;
use crate::store::DEFAULT_STORAGE_KEY;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which key/value backend holds the task list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    File,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the data files
    pub data_dir: PathBuf,
    pub backend: Backend,
    pub storage_key: String,
    /// Policy used by `import` when `--replace` is not given
    pub import_policy: ImportPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: Backend::File,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            import_policy: ImportPolicy::Merge,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or the default location when `None`
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            debug!(path = ?path, "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config =
            serde_yaml::from_str(&content).with_context(|| format!("Failed to parse config {}", path.display()))?;

        debug!(path = ?path, ?config, "Loaded config");
        Ok(config.expand_home())
    }

    /// Database path used by the SQLite backend
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("todostore.db")
    }

    fn expand_home(mut self) -> Self {
        if let Ok(rest) = self.data_dir.strip_prefix("~") {
            if let Some(home) = dirs::home_dir() {
                self.data_dir = home.join(rest);
            }
        }
        self
    }
}

/// `<config dir>/todostore/todostore.yml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("todostore").join("todostore.yml"))
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("todostore"))
        .unwrap_or_else(|| PathBuf::from(".todostore"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(Some(temp.path().join("absent.yml").as_path())).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.storage_key, "todo-bloom-items");
        assert_eq!(config.backend, Backend::File);
        assert_eq!(config.import_policy, ImportPolicy::Merge);
    }

    #[test]
    fn test_load_full_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("todostore.yml");
        fs::write(
            &path,
            "data_dir: /tmp/todos\nbackend: sqlite\nstorage_key: my-list\nimport_policy: replace\n",
        )
        .unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/todos"));
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.storage_key, "my-list");
        assert_eq!(config.import_policy, ImportPolicy::Replace);
        assert_eq!(config.sqlite_path(), PathBuf::from("/tmp/todos/todostore.db"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("todostore.yml");
        fs::write(&path, "backend: sqlite\n").unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("todostore.yml");
        fs::write(&path, "backend: [unclosed\n").unwrap();
        assert!(Config::load(Some(path.as_path())).is_err());
    }

    #[test]
    fn test_unknown_backend_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("todostore.yml");
        fs::write(&path, "backend: postgres\n").unwrap();
        assert!(Config::load(Some(path.as_path())).is_err());
    }
}
