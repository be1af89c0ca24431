use anyhow::{Context, Result};
use schemaplan::{MitigationPlacement, RiskHints};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-project directory holding config and baseline
pub const PROJECT_DIR: &str = ".schemaplan";

/// Project context for schemaplan operations
pub struct ProjectContext {
    /// Directory the config was found in, or the working directory
    pub project_root: PathBuf,
    /// Path to config file, if one was loaded
    pub config_path: Option<PathBuf>,
    /// Loaded (or default) configuration
    pub config: SchemaplanConfig,
}

/// Configuration stored in .schemaplan/config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaplanConfig {
    #[serde(default)]
    pub planner: PlannerSettings,
    #[serde(default)]
    pub baseline: BaselineSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannerSettings {
    /// Treat destructive plans as blocking unless overridden per run
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub mitigation_placement: MitigationPlacement,
    /// Targets known to hold no data
    #[serde(default)]
    pub known_empty: Vec<String>,
}

impl PlannerSettings {
    pub fn hints(&self) -> RiskHints {
        RiskHints::known_empty(self.known_empty.iter().cloned())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineSettings {
    #[serde(default = "default_baseline_path")]
    pub path: String,
}

impl Default for BaselineSettings {
    fn default() -> Self {
        Self {
            path: default_baseline_path(),
        }
    }
}

fn default_baseline_path() -> String {
    format!("{PROJECT_DIR}/baseline.json")
}

impl ProjectContext {
    /// Load an explicit config file, or discover one from the current directory
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_config_file(path),
            None => {
                let current_dir =
                    std::env::current_dir().context("Failed to get current directory")?;
                Self::find_from(&current_dir)
            }
        }
    }

    /// Find project context starting from the given directory.
    ///
    /// Falls back to defaults rooted at `start` when no config exists.
    pub fn find_from(start: &Path) -> Result<Self> {
        let mut current = start.to_path_buf();

        loop {
            let candidate = current.join(PROJECT_DIR).join("config.toml");
            if candidate.exists() {
                return Self::from_config_file(&candidate);
            }

            if !current.pop() {
                log::debug!(
                    "no {PROJECT_DIR}/config.toml above {}, using defaults",
                    start.display()
                );
                return Ok(Self {
                    project_root: start.to_path_buf(),
                    config_path: None,
                    config: SchemaplanConfig::default(),
                });
            }
        }
    }

    /// Create context from a known config file
    pub fn from_config_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: SchemaplanConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        // The config lives in <root>/.schemaplan/config.toml
        let project_root = path
            .parent()
            .filter(|dir| dir.file_name().is_some_and(|name| name == PROJECT_DIR))
            .and_then(Path::parent)
            .or_else(|| path.parent())
            .map(Path::to_path_buf)
            .unwrap_or_default();

        log::debug!("loaded config {}", path.display());
        Ok(Self {
            project_root,
            config_path: Some(path.to_path_buf()),
            config,
        })
    }

    /// Resolved path of the baseline file
    pub fn baseline_path(&self) -> PathBuf {
        let configured = Path::new(&self.config.baseline.path);
        if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            self.project_root.join(configured)
        }
    }
}
