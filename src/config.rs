//! Project configuration read from `.handover/handover.toml`.
//!
//! Settings are layered: file, then environment (`HANDOVER_PORT`,
//! `HANDOVER_DB`, optionally from a `.env` file), then CLI flags.
//!
//! ```toml
//! [server]
//! port = 3141
//! host = "127.0.0.1"
//! dev = false
//!
//! [store]
//! path = ".handover/handover.db"
//! ephemeral = false
//!
//! [plan]
//! collection = "transitionPlans"
//! document_id = "main_transition_plan"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::dashboard::ServerConfig;
use crate::plan::PlanLocation;

pub const HANDOVER_DIR: &str = ".handover";
pub const CONFIG_FILE: &str = "handover.toml";

pub const PORT_ENV: &str = "HANDOVER_PORT";
pub const DB_ENV: &str = "HANDOVER_DB";

pub fn handover_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(HANDOVER_DIR)
}

pub fn config_path(project_dir: &Path) -> PathBuf {
    handover_dir(project_dir).join(CONFIG_FILE)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Ignored in dev mode, which always binds every interface.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub dev: bool,
}

fn default_port() -> u16 {
    3141
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            dev: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSection {
    /// Relative paths resolve against the project directory.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Keep documents in memory only.
    #[serde(default)]
    pub ephemeral: bool,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(HANDOVER_DIR).join("handover.db")
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            ephemeral: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSection {
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_document_id")]
    pub document_id: String,
}

fn default_collection() -> String {
    PlanLocation::default().collection
}

fn default_document_id() -> String {
    PlanLocation::default().document_id
}

impl Default for PlanSection {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            document_id: default_document_id(),
        }
    }
}

impl PlanSection {
    pub fn location(&self) -> PlanLocation {
        PlanLocation {
            collection: self.collection.clone(),
            document_id: self.document_id.clone(),
        }
    }
}

/// The complete handover.toml structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HandoverToml {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub plan: PlanSection,
}

impl HandoverToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse handover.toml")
    }

    /// Load `.handover/handover.toml` under `project_dir`, or defaults when
    /// the file does not exist.
    pub fn load_or_default(project_dir: &Path) -> Result<Self> {
        let path = config_path(project_dir);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize handover.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply environment overrides. Unparseable values are reported as
    /// errors rather than silently ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid {PORT_ENV} value '{port}'"))?;
        }
        if let Some(db) = lookup(DB_ENV).filter(|v| !v.trim().is_empty()) {
            self.store.path = PathBuf::from(db.trim());
        }
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0: the OS will pick a random port".to_string());
        }
        if self.server.host.trim().is_empty() {
            warnings.push("server.host is empty".to_string());
        }
        if !self.store.ephemeral && self.store.path.as_os_str().is_empty() {
            warnings.push("store.path is empty and store.ephemeral is false".to_string());
        }
        if self.plan.collection.trim().is_empty() {
            warnings.push("plan.collection is empty".to_string());
        }
        if self.plan.document_id.trim().is_empty() {
            warnings.push("plan.document_id is empty".to_string());
        }
        if self.plan.collection.contains('/') || self.plan.document_id.contains('/') {
            warnings.push("plan.collection and plan.document_id must not contain '/'".to_string());
        }

        warnings
    }
}

/// Effective settings for one invocation: file → environment → CLI.
#[derive(Debug, Clone)]
pub struct HandoverConfig {
    pub project_dir: PathBuf,
    pub toml: HandoverToml,
}

impl HandoverConfig {
    /// Load the project file and apply environment overrides. A `.env` in
    /// the project directory is read first when present.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let env_file = project_dir.join(".env");
        if env_file.exists() {
            dotenvy::from_path(&env_file)
                .with_context(|| format!("Failed to load {}", env_file.display()))?;
        }

        let mut toml = HandoverToml::load_or_default(project_dir)?;
        toml.apply_env(|key| std::env::var(key).ok())?;

        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            toml,
        })
    }

    /// Store path resolved against the project directory, or `None` for an
    /// in-memory store.
    pub fn db_path(&self) -> Option<PathBuf> {
        if self.toml.store.ephemeral {
            return None;
        }
        Some(self.resolve(&self.toml.store.path))
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }

    pub fn plan_location(&self) -> PlanLocation {
        self.toml.plan.location()
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            port: self.toml.server.port,
            host: self.toml.server.host.clone(),
            db_path: self.db_path(),
            plan: self.plan_location(),
            dev_mode: self.toml.server.dev,
            open_browser: false,
        }
    }
}
