//! Persisted list of helper libraries to load at startup

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::error::HelperHostError;

/// Key-value store of helper libraries, keyed by persistence key
/// (the library's short name without extension), valued by library path
pub trait ReferenceStore {
    /// Every persisted (key, path) pair
    fn enumerate(&self) -> Result<Vec<(String, PathBuf)>, HelperHostError>;

    fn set(&mut self, name: &str, path: &Path) -> Result<(), HelperHostError>;

    /// Remove a reference; removing a missing key is not an error
    fn delete(&mut self, name: &str) -> Result<(), HelperHostError>;
}

/// On-disk form of the helper list
///
/// ```toml
/// [helpers]
/// ifmon = "/usr/lib/netsh/ifmon.so"
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HelperReferences {
    #[serde(default)]
    pub helpers: BTreeMap<String, PathBuf>,
}

impl HelperReferences {
    /// Load from a TOML file, empty if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self, HelperHostError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| HelperHostError::Store(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), HelperHostError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| HelperHostError::Store(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty() && !p.exists()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Store backed by a TOML file, re-read on every operation
#[derive(Debug, Clone)]
pub struct TomlReferenceStore {
    path: PathBuf,
}

impl TomlReferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReferenceStore for TomlReferenceStore {
    fn enumerate(&self) -> Result<Vec<(String, PathBuf)>, HelperHostError> {
        let references = HelperReferences::load(&self.path)?;
        Ok(references.helpers.into_iter().collect())
    }

    fn set(&mut self, name: &str, path: &Path) -> Result<(), HelperHostError> {
        let mut references = HelperReferences::load(&self.path)?;
        references
            .helpers
            .insert(name.to_string(), path.to_path_buf());
        references.save(&self.path)
    }

    fn delete(&mut self, name: &str) -> Result<(), HelperHostError> {
        let mut references = HelperReferences::load(&self.path)?;
        if references.helpers.remove(name).is_some() {
            references.save(&self.path)?;
        }
        Ok(())
    }
}

/// In-memory store, for embedding without persistence
#[derive(Debug, Default, Clone)]
pub struct MemoryReferenceStore {
    references: BTreeMap<String, PathBuf>,
}

impl MemoryReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_references<I, K, P>(references: I) -> Self
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: Into<PathBuf>,
    {
        Self {
            references: references
                .into_iter()
                .map(|(k, p)| (k.into(), p.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.references.get(name).map(PathBuf::as_path)
    }
}

impl ReferenceStore for MemoryReferenceStore {
    fn enumerate(&self) -> Result<Vec<(String, PathBuf)>, HelperHostError> {
        Ok(self
            .references
            .iter()
            .map(|(k, p)| (k.clone(), p.clone()))
            .collect())
    }

    fn set(&mut self, name: &str, path: &Path) -> Result<(), HelperHostError> {
        self.references
            .insert(name.to_string(), path.to_path_buf());
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<(), HelperHostError> {
        self.references.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_is_empty() {
        let references =
            HelperReferences::load(Path::new("/nonexistent/path/helpers.toml")).unwrap();
        assert!(references.helpers.is_empty());
    }

    #[test]
    fn test_toml_store_set_enumerate_delete() {
        let dir = TempDir::new().unwrap();
        let mut store = TomlReferenceStore::new(dir.path().join("helpers.toml"));

        store.set("ifmon", Path::new("/usr/lib/netsh/ifmon.so")).unwrap();
        store.set("ipmon", Path::new("/usr/lib/netsh/ipmon.so")).unwrap();

        let listed = store.enumerate().unwrap();
        assert_eq!(
            listed,
            vec![
                ("ifmon".to_string(), PathBuf::from("/usr/lib/netsh/ifmon.so")),
                ("ipmon".to_string(), PathBuf::from("/usr/lib/netsh/ipmon.so")),
            ]
        );

        store.delete("ifmon").unwrap();
        store.delete("never-added").unwrap();
        let listed = store.enumerate().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, "ipmon");
    }

    #[test]
    fn test_toml_store_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/dir/helpers.toml");
        let mut store = TomlReferenceStore::new(&path);

        store.set("dhcpmon", Path::new("dhcpmon.so")).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_toml_format() {
        let mut references = HelperReferences::default();
        references
            .helpers
            .insert("ifmon".to_string(), PathBuf::from("/usr/lib/netsh/ifmon.so"));

        let toml_str = toml::to_string_pretty(&references).unwrap();
        assert!(toml_str.contains("[helpers]"));
        assert!(toml_str.contains("ifmon = \"/usr/lib/netsh/ifmon.so\""));
    }

    #[test]
    fn test_malformed_file_is_store_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("helpers.toml");
        std::fs::write(&path, "helpers = 3").unwrap();

        let store = TomlReferenceStore::new(&path);
        assert!(matches!(store.enumerate(), Err(HelperHostError::Store(_))));
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryReferenceStore::with_references([("a", "/path/a")]);
        store.set("b", Path::new("/path/b")).unwrap();
        assert_eq!(store.get("a"), Some(Path::new("/path/a")));
        assert_eq!(store.enumerate().unwrap().len(), 2);

        store.delete("a").unwrap();
        assert!(store.get("a").is_none());
    }
}
