use crate::config::WorkspaceConfig;
use crate::error::{BalanceSheetError, Result};
use crate::export::ExportedSheet;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// String key/value storage, in the manner of browser local storage.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Storage rooted at the configured `storage_dir`.
    pub fn from_config(config: &WorkspaceConfig) -> Result<Self> {
        let dir = config.storage_dir.clone().ok_or_else(|| {
            BalanceSheetError::Config("storage_dir is not set".to_string())
        })?;
        Self::new(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Everything saved for one user: the flattened sheets plus UI flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub sheets: Vec<ExportedSheet>,
    #[serde(default)]
    pub flags: BTreeMap<String, serde_json::Value>,
}

pub fn state_key(user: &str) -> String {
    format!("{}:balanceSheets", user)
}

pub fn save_state<S: Storage + ?Sized>(
    storage: &mut S,
    user: &str,
    state: &PersistedState,
) -> Result<()> {
    let json = serde_json::to_string(state)?;
    storage.set(&state_key(user), &json)?;
    debug!("Saved {} sheets for user '{}'", state.sheets.len(), user);
    Ok(())
}

pub fn load_state<S: Storage + ?Sized>(storage: &S, user: &str) -> Result<Option<PersistedState>> {
    match storage.get(&state_key(user))? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

pub fn clear_state<S: Storage + ?Sized>(storage: &mut S, user: &str) -> Result<()> {
    storage.remove(&state_key(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::company::Company;
    use crate::export::flatten_companies;

    fn sample_state() -> PersistedState {
        let companies = vec![Company::new(1, "Company A", 2023)];
        let mut flags = BTreeMap::new();
        flags.insert("tutorialSeen".to_string(), serde_json::Value::Bool(true));
        PersistedState {
            sheets: flatten_companies(&companies),
            flags,
        }
    }

    #[test]
    fn test_memory_storage_round_trip_per_user() {
        let mut storage = MemoryStorage::new();
        save_state(&mut storage, "alice", &sample_state()).unwrap();

        assert_eq!(load_state(&storage, "alice").unwrap(), Some(sample_state()));
        assert_eq!(load_state(&storage, "bob").unwrap(), None);

        clear_state(&mut storage, "alice").unwrap();
        assert_eq!(load_state(&storage, "alice").unwrap(), None);
    }

    #[test]
    fn test_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path()).unwrap();

        save_state(&mut storage, "auth0|user 1", &sample_state()).unwrap();
        let loaded = load_state(&storage, "auth0|user 1").unwrap().unwrap();

        assert_eq!(loaded.sheets[0].company_name, "Company A");
        assert!(storage.get("missing").unwrap().is_none());
        storage.remove("missing").unwrap();
    }

    #[test]
    fn test_file_storage_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorkspaceConfig {
            storage_dir: Some(dir.path().join("nested")),
            ..WorkspaceConfig::default()
        };

        let storage = FileStorage::from_config(&config).unwrap();
        assert!(storage.dir().is_dir());

        let result = FileStorage::from_config(&WorkspaceConfig::default());
        assert!(matches!(result, Err(BalanceSheetError::Config(_))));
    }
}
