//! Local persistence of employee details between sessions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{KabalaError, Result};
use crate::models::EmployeeDetails;

/// Key under which the current employee's details are stored.
pub const DEFAULT_KEY: &str = "employeeDetails";

/// JSON file mapping keys to employee details.
///
/// A missing file reads as empty; every `set` rewrites the file.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
    entries: BTreeMap<String, EmployeeDetails>,
}

impl ProfileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content).map_err(|e| {
                KabalaError::Config(format!("invalid profile file {}: {}", path.display(), e))
            })?
        } else {
            BTreeMap::new()
        };

        debug!("Opened profile store {} ({} keys)", path.display(), entries.len());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&EmployeeDetails> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: &str, details: EmployeeDetails) -> Result<()> {
        self.entries.insert(key.to_string(), details);
        self.save()
    }

    /// Details stored under [`DEFAULT_KEY`].
    pub fn employee(&self) -> Option<&EmployeeDetails> {
        self.get(DEFAULT_KEY)
    }

    pub fn set_employee(&mut self, details: EmployeeDetails) -> Result<()> {
        self.set(DEFAULT_KEY, details)
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| KabalaError::Config(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}
