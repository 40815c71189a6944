//! Subcommands and the state they share between invocations.

pub mod config;
pub mod edit;
pub mod employee;
pub mod export;
pub mod list;
pub mod scan;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use kabala_core::models::config::KabalaConfig;
use kabala_core::{EmployeeDetails, ExpenseSession, ExpenseStore, ProfileStore};

const PROFILE_FILE: &str = "profile.json";
const DRAFT_FILE: &str = "draft.json";

/// Entries collected so far, kept on disk between commands.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Draft {
    pub store: ExpenseStore,
}

/// Configuration and data locations resolved from global flags.
pub struct Context {
    pub config: KabalaConfig,
    pub data_dir: PathBuf,
}

impl Context {
    pub fn load(config_path: Option<&str>, data_dir: Option<&str>) -> anyhow::Result<Self> {
        let config = match config_path {
            Some(path) => KabalaConfig::from_file(Path::new(path))
                .with_context(|| format!("cannot read config {}", path))?,
            None => {
                let default = config::default_config_path();
                if default.exists() {
                    KabalaConfig::from_file(&default)?
                } else {
                    KabalaConfig::default()
                }
            }
        };

        let data_dir = data_dir.map(PathBuf::from).unwrap_or_else(default_data_dir);
        debug!("Using data directory {}", data_dir.display());

        Ok(Self { config, data_dir })
    }

    pub fn profile(&self) -> anyhow::Result<ProfileStore> {
        Ok(ProfileStore::open(self.data_dir.join(PROFILE_FILE))?)
    }

    /// Stored employee details, required by every report command.
    pub fn employee(&self) -> anyhow::Result<EmployeeDetails> {
        self.profile()?.employee().cloned().ok_or_else(|| {
            anyhow::anyhow!("No employee details. Run 'kabala employee --name <NAME> --id <ID>' first.")
        })
    }

    pub fn draft_path(&self) -> PathBuf {
        self.data_dir.join(DRAFT_FILE)
    }

    pub fn load_draft(&self) -> anyhow::Result<Draft> {
        let path = self.draft_path();
        if !path.exists() {
            return Ok(Draft {
                store: ExpenseStore::new()
                    .with_max_description_len(self.config.extraction.max_description_len),
            });
        }
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content)
            .with_context(|| format!("corrupt draft file {}", path.display()))
    }

    pub fn save_draft(&self, draft: &Draft) -> anyhow::Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        fs::write(self.draft_path(), serde_json::to_string_pretty(draft)?)?;
        Ok(())
    }

    pub fn clear_draft(&self) -> anyhow::Result<()> {
        let path = self.draft_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// A session over the draft entries for the stored employee.
    pub fn session(&self) -> anyhow::Result<ExpenseSession> {
        let draft = self.load_draft()?;
        Ok(ExpenseSession::with_store(
            self.employee()?,
            draft.store,
            self.config.clone(),
        ))
    }

    pub fn save_session(&self, session: ExpenseSession) -> anyhow::Result<()> {
        self.save_draft(&Draft {
            store: session.into_store(),
        })
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kabala")
}
